//! Dashboard reporting façade: named read-only queries over the event
//! store, product catalog, and commerce snapshots.
//!
//! Consumers receive aggregate data structures only, never raw events. A
//! failed fetch degrades that query to an empty/zero answer so one broken
//! widget never takes down the rest of the dashboard.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use shoppulse_aggregation::active::HISTORY_WINDOW_MINUTES;
use shoppulse_aggregation::metrics::{
    avg_order_value, bounce_rate, conversion_rate, customer_lifetime_value, month_over_month,
    repeat_customer_count, retention_rate, session_bounce_counts,
};
use shoppulse_aggregation::{ActiveVisitorAnalyzer, DailyAggregator, RankingEngine};
use shoppulse_core::store::{CommerceSource, EventStore, ProductCatalog};
use shoppulse_core::types::{
    ActivePoint, DailyBucket, EventFilter, EventKind, RankedProduct, StoreOverview, TrackedEvent,
};

pub struct DashboardReporter {
    store: Arc<dyn EventStore>,
    commerce: Arc<dyn CommerceSource>,
    daily: DailyAggregator,
    active: ActiveVisitorAnalyzer,
    ranking: RankingEngine,
}

impl DashboardReporter {
    pub fn new(
        store: Arc<dyn EventStore>,
        catalog: Arc<dyn ProductCatalog>,
        commerce: Arc<dyn CommerceSource>,
    ) -> Self {
        Self {
            daily: DailyAggregator::new(store.clone()),
            active: ActiveVisitorAnalyzer::new(store.clone()),
            ranking: RankingEngine::new(store.clone(), catalog),
            store,
            commerce,
        }
    }

    /// Total recorded page visits.
    pub async fn total_visits(&self) -> u64 {
        self.events_of(EventKind::PageVisit).await.len() as u64
    }

    /// Total recorded product views.
    pub async fn total_views(&self) -> u64 {
        self.events_of(EventKind::ProductView).await.len() as u64
    }

    /// Zero-filled daily buckets for the trailing `days` days.
    pub async fn daily_stats(&self, days: u32) -> Vec<DailyBucket> {
        self.daily.stats(days, Utc::now()).await.unwrap_or_else(|e| {
            warn!(error = %e, "daily stats degraded to empty");
            Vec::new()
        })
    }

    /// Top viewed active products over the default lookback window.
    pub async fn top_viewed_products(&self, limit: usize) -> Vec<RankedProduct> {
        self.ranking
            .top_products(limit, Utc::now())
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "product ranking degraded to empty");
                Vec::new()
            })
    }

    /// Distinct identities active in the trailing five minutes.
    pub async fn active_visitors(&self) -> u64 {
        self.active_visitors_in(HISTORY_WINDOW_MINUTES).await
    }

    /// Distinct identities active in the trailing `window_minutes`.
    pub async fn active_visitors_in(&self, window_minutes: i64) -> u64 {
        self.active
            .count(window_minutes, Utc::now())
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "active visitor count degraded to zero");
                0
            })
    }

    /// Active-visitor series; each point already degrades independently.
    pub async fn active_visitor_history(
        &self,
        points: u32,
        interval_minutes: i64,
    ) -> Vec<ActivePoint> {
        self.active.history(points, interval_minutes, Utc::now()).await
    }

    /// Composed overview: totals plus derived metrics. Each underlying
    /// fetch is failure-isolated, so a broken source zeroes only the
    /// metrics depending on it.
    pub async fn overview(&self) -> StoreOverview {
        let now = Utc::now();

        let page_visits = self.events_of(EventKind::PageVisit).await;
        let total_product_views = self.total_views().await;
        let active_visitors = self.active_visitors().await;

        let orders = self.commerce.orders().await.unwrap_or_else(|e| {
            warn!(error = %e, "order snapshot degraded to empty");
            Vec::new()
        });
        let customers = self.commerce.customer_count().await.unwrap_or_else(|e| {
            warn!(error = %e, "customer count degraded to zero");
            0
        });

        let total_page_visits = page_visits.len() as u64;
        let order_count = orders.len() as u64;
        let total_revenue: f64 = orders.iter().map(|order| order.total).sum();
        let (bounced, sessions) = session_bounce_counts(&page_visits);
        let monthly = month_over_month(&orders, now);

        StoreOverview {
            total_page_visits,
            total_product_views,
            active_visitors,
            conversion_rate: conversion_rate(order_count, total_page_visits),
            avg_order_value: avg_order_value(total_revenue, order_count),
            customer_lifetime_value: customer_lifetime_value(total_revenue, customers),
            retention_rate: retention_rate(repeat_customer_count(&orders), customers),
            bounce_rate: bounce_rate(bounced, sessions),
            revenue_growth_pct: monthly.revenue_growth_pct,
            order_growth_pct: monthly.order_growth_pct,
            generated_at: now,
        }
    }

    async fn events_of(&self, kind: EventKind) -> Vec<TrackedEvent> {
        self.store
            .query(&EventFilter {
                kind: Some(kind),
                ..Default::default()
            })
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, kind = kind.as_str(), "event fetch degraded to empty");
                Vec::new()
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration};
    use shoppulse_core::store::{
        FailingEventStore, MemoryCommerceSource, MemoryEventStore, MemoryProductCatalog,
    };
    use shoppulse_core::types::{OrderRecord, Product, UNKNOWN};
    use uuid::Uuid;

    fn event(kind: EventKind, subject: &str, session_id: &str, minutes_ago: i64) -> TrackedEvent {
        TrackedEvent {
            event_id: Uuid::new_v4(),
            kind,
            subject: subject.into(),
            session_id: session_id.into(),
            user_id: None,
            occurred_at: Utc::now() - Duration::minutes(minutes_ago),
            network_origin: UNKNOWN.into(),
            location: UNKNOWN.into(),
            agent_string: "test".into(),
            referrer: None,
        }
    }

    fn order(user_id: &str, total: f64, days_ago: i64) -> OrderRecord {
        OrderRecord {
            order_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            total,
            created_at: Utc::now() - Duration::days(days_ago),
        }
    }

    fn product(id: &str) -> Product {
        Product {
            id: id.into(),
            name: format!("Product {id}"),
            price: 20.0,
            image_url: None,
            active: true,
        }
    }

    async fn seeded_reporter() -> DashboardReporter {
        let store = Arc::new(MemoryEventStore::new());
        // Four visits across three sessions; two product views.
        store.insert(event(EventKind::PageVisit, "/", "sess-a", 2)).await.unwrap();
        store.insert(event(EventKind::PageVisit, "/cart", "sess-a", 1)).await.unwrap();
        store.insert(event(EventKind::PageVisit, "/", "sess-b", 400)).await.unwrap();
        store.insert(event(EventKind::PageVisit, "/", "sess-c", 3)).await.unwrap();
        store.insert(event(EventKind::ProductView, "p-1", "sess-a", 2)).await.unwrap();
        store.insert(event(EventKind::ProductView, "p-1", "sess-c", 60)).await.unwrap();

        let catalog = Arc::new(MemoryProductCatalog::new());
        catalog.sync(vec![product("p-1"), product("p-2")]);

        let commerce = Arc::new(MemoryCommerceSource::new());
        commerce.sync_orders(vec![order("u-1", 30.0, 1), order("u-1", 10.0, 2)]);
        commerce.set_customer_count(4);

        DashboardReporter::new(store, catalog, commerce)
    }

    #[tokio::test]
    async fn test_totals() {
        let reporter = seeded_reporter().await;
        assert_eq!(reporter.total_visits().await, 4);
        assert_eq!(reporter.total_views().await, 2);
    }

    #[tokio::test]
    async fn test_active_visitors_deduplicates_sessions() {
        let reporter = seeded_reporter().await;
        // Within five minutes: sess-a (twice), sess-c.
        assert_eq!(reporter.active_visitors().await, 2);
    }

    #[tokio::test]
    async fn test_top_products() {
        let reporter = seeded_reporter().await;
        let ranked = reporter.top_viewed_products(5).await;
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].product.id, "p-1");
        assert_eq!(ranked[0].views, 2);
        assert_eq!(ranked[0].popularity_score, 100);
    }

    #[tokio::test]
    async fn test_overview_metrics() {
        let reporter = seeded_reporter().await;
        let overview = reporter.overview().await;

        assert_eq!(overview.total_page_visits, 4);
        assert_eq!(overview.total_product_views, 2);
        // 2 orders / 4 visits.
        assert_eq!(overview.conversion_rate, 50.0);
        assert_eq!(overview.avg_order_value, 20.0);
        assert_eq!(overview.customer_lifetime_value, 10.0);
        // u-1 ordered twice out of 4 customers.
        assert_eq!(overview.retention_rate, 25.0);
        // sess-b and sess-c bounced; sess-a did not.
        assert_eq!(overview.bounce_rate, 2.0 / 3.0 * 100.0);
    }

    #[tokio::test]
    async fn test_overview_growth_uses_recent_orders() {
        let reporter = seeded_reporter().await;
        let overview = reporter.overview().await;
        let now = Utc::now();
        // Both orders are 1-2 days old; unless the month just rolled over,
        // the baseline month is empty and growth pins to 100.
        if now.day() > 2 {
            assert_eq!(overview.revenue_growth_pct, 100.0);
            assert_eq!(overview.order_growth_pct, 100.0);
        }
    }

    #[tokio::test]
    async fn test_queries_degrade_on_store_failure() {
        let commerce = Arc::new(MemoryCommerceSource::new());
        commerce.sync_orders(vec![order("u-1", 30.0, 1)]);
        commerce.set_customer_count(2);

        let reporter = DashboardReporter::new(
            Arc::new(FailingEventStore),
            Arc::new(MemoryProductCatalog::new()),
            commerce,
        );

        assert_eq!(reporter.total_visits().await, 0);
        assert!(reporter.daily_stats(7).await.is_empty());
        assert!(reporter.top_viewed_products(5).await.is_empty());
        assert_eq!(reporter.active_visitors().await, 0);

        // Commerce-backed metrics still compute; event-backed ones zero out.
        let overview = reporter.overview().await;
        assert_eq!(overview.total_page_visits, 0);
        assert_eq!(overview.conversion_rate, 0.0);
        assert_eq!(overview.avg_order_value, 30.0);
        assert_eq!(overview.customer_lifetime_value, 15.0);
    }
}
