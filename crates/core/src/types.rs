use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Sentinel for enrichment fields that could not be resolved.
pub const UNKNOWN: &str = "unknown";

/// Kind of tracked storefront event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PageVisit,
    ProductView,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PageVisit => "page_visit",
            EventKind::ProductView => "product_view",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "page_visit" => Some(EventKind::PageVisit),
            "product_view" => Some(EventKind::ProductView),
            _ => None,
        }
    }
}

/// A single recorded page-visit or product-view occurrence.
///
/// `subject` and `session_id` are always present; every other field may
/// degrade to a sentinel or `None` without failing ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedEvent {
    pub event_id: Uuid,
    pub kind: EventKind,
    /// Page path for visits, product id for views.
    pub subject: String,
    pub session_id: String,
    pub user_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub network_origin: String,
    pub location: String,
    pub agent_string: String,
    pub referrer: Option<String>,
}

/// Filter for event-store queries. Range bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub kind: Option<EventKind>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub subject: Option<String>,
}

/// A catalog product as seen by the ranking engine.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub image_url: Option<String>,
    /// Inactive products are excluded from rankings even with historical events.
    pub active: bool,
}

/// A completed order, as reported by the commerce database.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderRecord {
    pub order_id: String,
    pub user_id: String,
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

/// Per-day event counts. A requested range always yields one bucket per
/// day, zero-filled, with no gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub page_visits: u64,
    pub product_views: u64,
}

impl DailyBucket {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            page_visits: 0,
            product_views: 0,
        }
    }

    pub fn total(&self) -> u64 {
        self.page_visits + self.product_views
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Stable,
}

/// A product ranked by views within the analysis window.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RankedProduct {
    pub product: Product,
    /// Total views in the lookback window.
    pub views: u64,
    /// Views within the trailing recent sub-window.
    pub recent_views: u64,
    /// 1-based position after sorting by views descending.
    pub rank: u32,
    /// Views normalized to [0,100] relative to the top-ranked product.
    pub popularity_score: u32,
    pub trend: Trend,
}

/// One point of the active-visitor history series.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivePoint {
    /// `HH:MM` UTC label of the instant the window ends at.
    pub label: String,
    pub count: u64,
}

/// Composed dashboard overview: counts plus derived metrics.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoreOverview {
    pub total_page_visits: u64,
    pub total_product_views: u64,
    pub active_visitors: u64,
    pub conversion_rate: f64,
    pub avg_order_value: f64,
    pub customer_lifetime_value: f64,
    pub retention_rate: f64,
    pub bounce_rate: f64,
    pub revenue_growth_pct: f64,
    pub order_growth_pct: f64,
    pub generated_at: DateTime<Utc>,
}
