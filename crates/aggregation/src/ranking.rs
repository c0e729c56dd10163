//! Top-N product ranking over a trailing lookback window.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use shoppulse_core::error::AnalyticsResult;
use shoppulse_core::store::{EventStore, ProductCatalog};
use shoppulse_core::types::{EventFilter, EventKind, Product, RankedProduct, TrackedEvent, Trend};

pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;
pub const DEFAULT_RECENT_DAYS: i64 = 7;

/// Ranks active catalog products by views within a lookback window.
pub struct RankingEngine {
    store: Arc<dyn EventStore>,
    catalog: Arc<dyn ProductCatalog>,
}

impl RankingEngine {
    pub fn new(store: Arc<dyn EventStore>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Top `limit` products over the default 30-day window with a 7-day
    /// recency sub-window.
    pub async fn top_products(
        &self,
        limit: usize,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<Vec<RankedProduct>> {
        self.top_products_in(limit, DEFAULT_LOOKBACK_DAYS, DEFAULT_RECENT_DAYS, now)
            .await
    }

    pub async fn top_products_in(
        &self,
        limit: usize,
        lookback_days: i64,
        recent_days: i64,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<Vec<RankedProduct>> {
        let products = self.catalog.active_products().await?;
        if products.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let events = self
            .store
            .query(&EventFilter {
                kind: Some(EventKind::ProductView),
                since: Some(now - Duration::days(lookback_days)),
                until: Some(now),
                ..Default::default()
            })
            .await?;
        Ok(rank_products(
            products,
            &events,
            now - Duration::days(recent_days),
            limit,
        ))
    }
}

/// Pure ranking core: group views by product, order by views descending
/// (ties by ascending product id), truncate, and normalize.
///
/// Only products present in the supplied catalog snapshot qualify, so
/// views of inactive products fall out here.
pub fn rank_products(
    products: Vec<Product>,
    events: &[TrackedEvent],
    recent_cutoff: DateTime<Utc>,
    limit: usize,
) -> Vec<RankedProduct> {
    let mut catalog: HashMap<String, Product> = products
        .into_iter()
        .map(|product| (product.id.clone(), product))
        .collect();

    let mut counts: HashMap<&str, (u64, u64)> = HashMap::new();
    for event in events {
        if !catalog.contains_key(event.subject.as_str()) {
            continue;
        }
        let entry = counts.entry(event.subject.as_str()).or_insert((0, 0));
        entry.0 += 1;
        if event.occurred_at >= recent_cutoff {
            entry.1 += 1;
        }
    }

    let mut entries: Vec<(String, u64, u64)> = counts
        .into_iter()
        .map(|(id, (views, recent))| (id.to_string(), views, recent))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(limit);

    let max_views = entries.first().map(|(_, views, _)| *views).unwrap_or(0);
    if max_views == 0 {
        return Vec::new();
    }

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, (id, views, recent_views))| {
            let product = catalog.remove(&id)?;
            Some(RankedProduct {
                product,
                views,
                recent_views,
                rank: index as u32 + 1,
                popularity_score: ((views as f64 / max_views as f64) * 100.0).round() as u32,
                trend: if recent_views > 0 {
                    Trend::Up
                } else {
                    Trend::Stable
                },
            })
        })
        .collect()
}
