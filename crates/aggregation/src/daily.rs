//! Fixed daily buckets over the trailing N calendar days.
//!
//! Day boundaries are UTC midnight for the whole computation. The grouping
//! pass and the zero-fill pass are separate stages, so a requested range
//! always comes back complete and ordered regardless of event sparsity.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use shoppulse_core::error::AnalyticsResult;
use shoppulse_core::store::EventStore;
use shoppulse_core::types::{DailyBucket, EventFilter, EventKind, TrackedEvent};

/// Computes per-day event counts from event-store snapshots.
pub struct DailyAggregator {
    store: Arc<dyn EventStore>,
}

impl DailyAggregator {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Buckets for the trailing `days` calendar days ending at `now`
    /// (inclusive), oldest first, zero-filled.
    pub async fn stats(&self, days: u32, now: DateTime<Utc>) -> AnalyticsResult<Vec<DailyBucket>> {
        if days == 0 {
            return Ok(Vec::new());
        }
        let start = now.date_naive() - Duration::days(i64::from(days) - 1);
        let since = start.and_time(NaiveTime::MIN).and_utc();
        let events = self
            .store
            .query(&EventFilter {
                since: Some(since),
                until: Some(now),
                ..Default::default()
            })
            .await?;
        Ok(bucket_by_day(&events, start, days))
    }
}

/// Group events by UTC calendar day, then emit one bucket per requested
/// day, defaulting to zero counts where no events fell.
pub fn bucket_by_day(events: &[TrackedEvent], start: NaiveDate, days: u32) -> Vec<DailyBucket> {
    let mut by_day: BTreeMap<NaiveDate, DailyBucket> = BTreeMap::new();
    for event in events {
        let day = event.occurred_at.date_naive();
        let bucket = by_day.entry(day).or_insert_with(|| DailyBucket::empty(day));
        match event.kind {
            EventKind::PageVisit => bucket.page_visits += 1,
            EventKind::ProductView => bucket.product_views += 1,
        }
    }

    (0..days)
        .map(|offset| {
            let date = start + Duration::days(i64::from(offset));
            by_day
                .remove(&date)
                .unwrap_or_else(|| DailyBucket::empty(date))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use shoppulse_core::store::MemoryEventStore;
    use shoppulse_core::types::UNKNOWN;
    use uuid::Uuid;

    fn event_at(kind: EventKind, occurred_at: DateTime<Utc>) -> TrackedEvent {
        TrackedEvent {
            event_id: Uuid::new_v4(),
            kind,
            subject: "/".into(),
            session_id: "sess-1".into(),
            user_id: None,
            occurred_at,
            network_origin: UNKNOWN.into(),
            location: UNKNOWN.into(),
            agent_string: "test".into(),
            referrer: None,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
        date.and_hms_opt(hour, 0, 0).unwrap().and_utc()
    }

    #[tokio::test]
    async fn test_stats_fills_sparse_days() {
        let store = Arc::new(MemoryEventStore::new());
        let now = Utc::now();
        let yesterday = now - Duration::days(1);
        for _ in 0..10 {
            store.insert(event_at(EventKind::PageVisit, yesterday)).await.unwrap();
        }
        for _ in 0..3 {
            store.insert(event_at(EventKind::ProductView, yesterday)).await.unwrap();
        }

        let buckets = DailyAggregator::new(store).stats(2, now).await.unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].date, yesterday.date_naive());
        assert_eq!(buckets[0].page_visits, 10);
        assert_eq!(buckets[0].product_views, 3);
        assert_eq!(buckets[1].date, now.date_naive());
        assert_eq!(buckets[1].page_visits, 0);
        assert_eq!(buckets[1].product_views, 0);
    }

    #[tokio::test]
    async fn test_stats_window_excludes_older_events() {
        let store = Arc::new(MemoryEventStore::new());
        let now = Utc::now();
        store
            .insert(event_at(EventKind::PageVisit, now - Duration::days(10)))
            .await
            .unwrap();
        store.insert(event_at(EventKind::PageVisit, now)).await.unwrap();

        let buckets = DailyAggregator::new(store).stats(3, now).await.unwrap();
        let total: u64 = buckets.iter().map(DailyBucket::total).sum();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_zero_days_is_empty() {
        let store = Arc::new(MemoryEventStore::new());
        let buckets = DailyAggregator::new(store).stats(0, Utc::now()).await.unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_buckets_are_contiguous_and_ordered() {
        let start = day(2024, 2, 26);
        let events = vec![
            event_at(EventKind::PageVisit, at(day(2024, 2, 27), 9)),
            event_at(EventKind::ProductView, at(day(2024, 3, 2), 15)),
        ];

        // Spans the February/March boundary of a leap year.
        let buckets = bucket_by_day(&events, start, 7);
        assert_eq!(buckets.len(), 7);
        for (i, bucket) in buckets.iter().enumerate() {
            assert_eq!(bucket.date, start + Duration::days(i as i64));
        }
        assert_eq!(buckets[1].page_visits, 1);
        assert_eq!(buckets[5].product_views, 1);
        assert_eq!(buckets.iter().map(DailyBucket::total).sum::<u64>(), 2);
    }

    #[test]
    fn test_bucket_sum_matches_event_count_by_kind() {
        let start = day(2024, 1, 1);
        let mut events = Vec::new();
        for hour in 0..5 {
            events.push(event_at(EventKind::PageVisit, at(day(2024, 1, 1), hour)));
        }
        for hour in 0..2 {
            events.push(event_at(EventKind::ProductView, at(day(2024, 1, 2), hour)));
        }

        let buckets = bucket_by_day(&events, start, 2);
        assert_eq!(buckets.iter().map(|b| b.page_visits).sum::<u64>(), 5);
        assert_eq!(buckets.iter().map(|b| b.product_views).sum::<u64>(), 2);
    }
}
