//! Sliding recency windows: distinct-identity counts over a trailing
//! interval, recomputed independently at each query.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use shoppulse_core::error::AnalyticsResult;
use shoppulse_core::store::EventStore;
use shoppulse_core::types::{ActivePoint, EventFilter, TrackedEvent};

/// Lookback of each history point. Every point recomputes its own
/// trailing window ending at that instant.
pub const HISTORY_WINDOW_MINUTES: i64 = 5;

/// Counts distinct active identities within sliding windows.
pub struct ActiveVisitorAnalyzer {
    store: Arc<dyn EventStore>,
}

impl ActiveVisitorAnalyzer {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Distinct identities among events in `[now - window_minutes, now]`.
    pub async fn count(&self, window_minutes: i64, now: DateTime<Utc>) -> AnalyticsResult<u64> {
        let events = self
            .store
            .query(&EventFilter {
                since: Some(now - Duration::minutes(window_minutes)),
                until: Some(now),
                ..Default::default()
            })
            .await?;
        Ok(distinct_identities(&events))
    }

    /// `points` evenly spaced instants ending at `now`, oldest first, each
    /// carrying its own trailing five-minute count. A failed point
    /// degrades to zero instead of aborting the series.
    pub async fn history(
        &self,
        points: u32,
        interval_minutes: i64,
        now: DateTime<Utc>,
    ) -> Vec<ActivePoint> {
        let mut series = Vec::with_capacity(points as usize);
        for offset in (0..points).rev() {
            let instant = now - Duration::minutes(interval_minutes * i64::from(offset));
            let count = match self.count(HISTORY_WINDOW_MINUTES, instant).await {
                Ok(count) => count,
                Err(e) => {
                    warn!(error = %e, "active history point degraded to zero");
                    0
                }
            };
            series.push(ActivePoint {
                label: instant.format("%H:%M").to_string(),
                count,
            });
        }
        series
    }
}

/// Distinct identities in a snapshot: the user id when present, otherwise
/// the session id; events with neither are excluded.
pub fn distinct_identities(events: &[TrackedEvent]) -> u64 {
    let mut seen: HashSet<&str> = HashSet::new();
    for event in events {
        let identity = event
            .user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or_else(|| Some(event.session_id.as_str()).filter(|id| !id.is_empty()));
        if let Some(identity) = identity {
            seen.insert(identity);
        }
    }
    seen.len() as u64
}
