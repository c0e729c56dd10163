//! Integration test for the full track-then-report flow over the
//! in-memory event store. No external services required.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use shoppulse_core::store::{
        EventStore, MemoryCommerceSource, MemoryEventStore, MemoryProductCatalog,
    };
    use shoppulse_core::types::Product;
    use shoppulse_ingest::{
        Actor, ClientContext, EnvironmentContext, EventTracker, GeoLookup, MemorySessionStorage,
        NetworkOriginLookup, SessionManager,
    };
    use shoppulse_reporting::DashboardReporter;

    struct FixedOrigin;

    #[async_trait]
    impl NetworkOriginLookup for FixedOrigin {
        async fn resolve(&self) -> String {
            "203.0.113.1".to_string()
        }
    }

    struct FixedGeo;

    #[async_trait]
    impl GeoLookup for FixedGeo {
        async fn city(&self, _ip: &str) -> String {
            "Lisbon".to_string()
        }
    }

    fn tracker(store: Arc<dyn EventStore>) -> EventTracker {
        EventTracker::new(
            store,
            SessionManager::new(Arc::new(MemorySessionStorage::new())),
            Arc::new(FixedOrigin),
            Arc::new(FixedGeo),
            EnvironmentContext::new(true, "shop.example.com", vec![]),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn test_track_then_report() {
        let store = Arc::new(MemoryEventStore::new());
        let tracker = tracker(store.clone());
        let client = ClientContext {
            agent_string: "Mozilla/5.0".into(),
            referrer: None,
        };

        for _ in 0..3 {
            tracker
                .record_page_visit(&Actor::anonymous(), &client, "/", None)
                .await
                .unwrap();
        }
        tracker
            .record_product_view(&Actor::anonymous(), &client, "p-1")
            .await
            .unwrap();
        tracker
            .record_product_view(&Actor::anonymous(), &client, "p-2")
            .await
            .unwrap();
        tracker
            .record_product_view(&Actor::anonymous(), &client, "p-1")
            .await
            .unwrap();

        let catalog = Arc::new(MemoryProductCatalog::new());
        catalog.sync(vec![
            Product {
                id: "p-1".into(),
                name: "Mug".into(),
                price: 12.0,
                image_url: None,
                active: true,
            },
            Product {
                id: "p-2".into(),
                name: "Shirt".into(),
                price: 25.0,
                image_url: None,
                active: true,
            },
        ]);

        let reporter =
            DashboardReporter::new(store, catalog, Arc::new(MemoryCommerceSource::new()));

        assert_eq!(reporter.total_visits().await, 3);
        assert_eq!(reporter.total_views().await, 3);

        let daily = reporter.daily_stats(2).await;
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[1].page_visits, 3);
        assert_eq!(daily[1].product_views, 3);

        let top = reporter.top_viewed_products(5).await;
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product.id, "p-1");
        assert_eq!(top[0].views, 2);
        assert_eq!(top[0].popularity_score, 100);
        assert_eq!(top[1].product.id, "p-2");
        assert_eq!(top[1].rank, 2);

        // All events share one session, so one active identity.
        assert_eq!(reporter.active_visitors().await, 1);
    }
}
