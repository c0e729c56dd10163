//! Storage abstractions: the append-only event store plus the read-only
//! catalog and commerce collaborators the aggregators query.
//!
//! Aggregation components accept `Arc<dyn EventStore>` and friends so the
//! backing implementation (ClickHouse in production, in-memory in tests and
//! embedded deployments) stays swappable.

use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::types::{EventFilter, EventKind, OrderRecord, Product, TrackedEvent};

/// Append-only event store. `insert` is the single write path; queries are
/// read-only snapshots with inclusive range bounds.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert(&self, event: TrackedEvent) -> AnalyticsResult<()>;
    async fn query(&self, filter: &EventFilter) -> AnalyticsResult<Vec<TrackedEvent>>;
}

/// Read-only product catalog. Implementations return active products only;
/// soft-deleted entries never appear.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn active_products(&self) -> AnalyticsResult<Vec<Product>>;
}

/// Read-only commerce snapshots (orders, customer population) used by the
/// derived-metrics queries.
#[async_trait]
pub trait CommerceSource: Send + Sync {
    async fn orders(&self) -> AnalyticsResult<Vec<OrderRecord>>;
    async fn customer_count(&self) -> AnalyticsResult<u64>;
}

fn matches(event: &TrackedEvent, filter: &EventFilter) -> bool {
    if let Some(kind) = filter.kind {
        if event.kind != kind {
            return false;
        }
    }
    if let Some(since) = filter.since {
        if event.occurred_at < since {
            return false;
        }
    }
    if let Some(until) = filter.until {
        if event.occurred_at > until {
            return false;
        }
    }
    if let Some(subject) = &filter.subject {
        if &event.subject != subject {
            return false;
        }
    }
    true
}

/// In-memory event store for tests and embedded use.
#[derive(Default)]
pub struct MemoryEventStore {
    events: Mutex<Vec<TrackedEvent>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.events.lock().expect("event store mutex poisoned").len()
    }

    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .expect("event store mutex poisoned")
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().expect("event store mutex poisoned").clear();
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert(&self, event: TrackedEvent) -> AnalyticsResult<()> {
        self.events
            .lock()
            .expect("event store mutex poisoned")
            .push(event);
        Ok(())
    }

    async fn query(&self, filter: &EventFilter) -> AnalyticsResult<Vec<TrackedEvent>> {
        Ok(self
            .events
            .lock()
            .expect("event store mutex poisoned")
            .iter()
            .filter(|e| matches(e, filter))
            .cloned()
            .collect())
    }
}

/// Event store that fails every call. Exercises the degraded paths in tests.
pub struct FailingEventStore;

#[async_trait]
impl EventStore for FailingEventStore {
    async fn insert(&self, _event: TrackedEvent) -> AnalyticsResult<()> {
        Err(AnalyticsError::Store("write refused".into()))
    }

    async fn query(&self, _filter: &EventFilter) -> AnalyticsResult<Vec<TrackedEvent>> {
        Err(AnalyticsError::Store("read refused".into()))
    }
}

/// In-memory product catalog, kept current by snapshot sync from the
/// storefront backend.
#[derive(Default)]
pub struct MemoryProductCatalog {
    products: DashMap<String, Product>,
}

impl MemoryProductCatalog {
    pub fn new() -> Self {
        Self {
            products: DashMap::new(),
        }
    }

    /// Replace the full catalog snapshot.
    pub fn sync(&self, products: Vec<Product>) {
        self.products.clear();
        for product in products {
            self.products.insert(product.id.clone(), product);
        }
    }

    pub fn upsert(&self, product: Product) {
        self.products.insert(product.id.clone(), product);
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[async_trait]
impl ProductCatalog for MemoryProductCatalog {
    async fn active_products(&self) -> AnalyticsResult<Vec<Product>> {
        let mut products: Vec<Product> = self
            .products
            .iter()
            .filter(|entry| entry.value().active)
            .map(|entry| entry.value().clone())
            .collect();
        products.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(products)
    }
}

/// In-memory commerce snapshot, kept current by sync from the storefront
/// backend.
#[derive(Default)]
pub struct MemoryCommerceSource {
    orders: Mutex<Vec<OrderRecord>>,
    customers: Mutex<u64>,
}

impl MemoryCommerceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the order snapshot.
    pub fn sync_orders(&self, orders: Vec<OrderRecord>) {
        *self.orders.lock().expect("commerce mutex poisoned") = orders;
    }

    pub fn set_customer_count(&self, count: u64) {
        *self.customers.lock().expect("commerce mutex poisoned") = count;
    }
}

#[async_trait]
impl CommerceSource for MemoryCommerceSource {
    async fn orders(&self) -> AnalyticsResult<Vec<OrderRecord>> {
        Ok(self.orders.lock().expect("commerce mutex poisoned").clone())
    }

    async fn customer_count(&self) -> AnalyticsResult<u64> {
        Ok(*self.customers.lock().expect("commerce mutex poisoned"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::UNKNOWN;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn event(kind: EventKind, subject: &str, minutes_ago: i64) -> TrackedEvent {
        TrackedEvent {
            event_id: Uuid::new_v4(),
            kind,
            subject: subject.into(),
            session_id: "sess-1".into(),
            user_id: None,
            occurred_at: Utc::now() - Duration::minutes(minutes_ago),
            network_origin: UNKNOWN.into(),
            location: UNKNOWN.into(),
            agent_string: "test".into(),
            referrer: None,
        }
    }

    #[tokio::test]
    async fn test_memory_store_filters() {
        let store = MemoryEventStore::new();
        store.insert(event(EventKind::PageVisit, "/", 90)).await.unwrap();
        store.insert(event(EventKind::PageVisit, "/cart", 10)).await.unwrap();
        store.insert(event(EventKind::ProductView, "prod-1", 5)).await.unwrap();

        let all = store.query(&EventFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let visits = store
            .query(&EventFilter {
                kind: Some(EventKind::PageVisit),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(visits.len(), 2);

        let recent = store
            .query(&EventFilter {
                since: Some(Utc::now() - Duration::minutes(30)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);

        let by_subject = store
            .query(&EventFilter {
                subject: Some("prod-1".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_subject.len(), 1);
        assert_eq!(store.count_kind(EventKind::ProductView), 1);
    }

    #[tokio::test]
    async fn test_failing_store() {
        let store = FailingEventStore;
        assert!(store.insert(event(EventKind::PageVisit, "/", 0)).await.is_err());
        assert!(store.query(&EventFilter::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_catalog_excludes_inactive() {
        let catalog = MemoryProductCatalog::new();
        catalog.sync(vec![
            Product {
                id: "b".into(),
                name: "Mug".into(),
                price: 12.0,
                image_url: None,
                active: true,
            },
            Product {
                id: "a".into(),
                name: "Shirt".into(),
                price: 25.0,
                image_url: None,
                active: false,
            },
        ]);

        let active = catalog.active_products().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "b");
    }

    #[tokio::test]
    async fn test_commerce_snapshots() {
        let commerce = MemoryCommerceSource::new();
        commerce.sync_orders(vec![OrderRecord {
            order_id: "o-1".into(),
            user_id: "u-1".into(),
            total: 49.99,
            created_at: Utc::now(),
        }]);
        commerce.set_customer_count(7);

        assert_eq!(commerce.orders().await.unwrap().len(), 1);
        assert_eq!(commerce.customer_count().await.unwrap(), 7);
    }
}
