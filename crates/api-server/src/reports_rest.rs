//! Reporting and snapshot-sync REST API endpoints.
//!
//! Report queries are read-only and already degraded inside the façade,
//! so handlers always answer 200 with whatever data survived.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use shoppulse_core::types::{
    ActivePoint, DailyBucket, OrderRecord, Product, RankedProduct, StoreOverview,
};

use crate::rest::AppState;

/// Caps on client-supplied query sizes.
const MAX_DAYS: u32 = 365;
const MAX_LIMIT: usize = 100;
const MAX_POINTS: u32 = 288;

#[derive(Deserialize, IntoParams)]
pub struct DailyParams {
    /// Trailing days to bucket, ending today. Defaults to 7.
    pub days: Option<u32>,
}

#[derive(Deserialize, IntoParams)]
pub struct TopProductsParams {
    /// Maximum products to return. Defaults to 5.
    pub limit: Option<usize>,
}

#[derive(Deserialize, IntoParams)]
pub struct ActiveHistoryParams {
    /// Points in the series. Defaults to 10.
    pub points: Option<u32>,
    /// Minutes between points. Defaults to 5.
    pub interval_minutes: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct ActiveResponse {
    pub active_visitors: u64,
}

#[derive(Serialize, ToSchema)]
pub struct TotalsResponse {
    pub page_visits: u64,
    pub product_views: u64,
}

#[derive(Deserialize, ToSchema)]
pub struct CatalogSyncRequest {
    pub products: Vec<Product>,
}

#[derive(Deserialize, ToSchema)]
pub struct CommerceSyncRequest {
    pub orders: Vec<OrderRecord>,
    pub customer_count: u64,
}

#[derive(Serialize, ToSchema)]
pub struct SyncResponse {
    pub synced: usize,
}

/// GET /v1/reports/overview: composed dashboard overview.
#[utoipa::path(
    get,
    path = "/v1/reports/overview",
    tag = "Reports",
    responses((status = 200, description = "Store overview", body = StoreOverview))
)]
pub async fn handle_overview(State(state): State<AppState>) -> Json<StoreOverview> {
    Json(state.reporter.overview().await)
}

/// GET /v1/reports/daily: zero-filled daily event buckets.
#[utoipa::path(
    get,
    path = "/v1/reports/daily",
    tag = "Reports",
    params(DailyParams),
    responses((status = 200, description = "Daily buckets, oldest first", body = Vec<DailyBucket>))
)]
pub async fn handle_daily(
    State(state): State<AppState>,
    Query(params): Query<DailyParams>,
) -> Json<Vec<DailyBucket>> {
    let days = params.days.unwrap_or(7).min(MAX_DAYS);
    Json(state.reporter.daily_stats(days).await)
}

/// GET /v1/reports/top-products: most viewed active products.
#[utoipa::path(
    get,
    path = "/v1/reports/top-products",
    tag = "Reports",
    params(TopProductsParams),
    responses((status = 200, description = "Ranked products", body = Vec<RankedProduct>))
)]
pub async fn handle_top_products(
    State(state): State<AppState>,
    Query(params): Query<TopProductsParams>,
) -> Json<Vec<RankedProduct>> {
    let limit = params.limit.unwrap_or(5).min(MAX_LIMIT);
    Json(state.reporter.top_viewed_products(limit).await)
}

/// GET /v1/reports/active: visitors active in the last five minutes.
#[utoipa::path(
    get,
    path = "/v1/reports/active",
    tag = "Reports",
    responses((status = 200, description = "Active visitor count", body = ActiveResponse))
)]
pub async fn handle_active(State(state): State<AppState>) -> Json<ActiveResponse> {
    Json(ActiveResponse {
        active_visitors: state.reporter.active_visitors().await,
    })
}

/// GET /v1/reports/active-history: active-visitor series, oldest first.
#[utoipa::path(
    get,
    path = "/v1/reports/active-history",
    tag = "Reports",
    params(ActiveHistoryParams),
    responses((status = 200, description = "Active visitor series", body = Vec<ActivePoint>))
)]
pub async fn handle_active_history(
    State(state): State<AppState>,
    Query(params): Query<ActiveHistoryParams>,
) -> Json<Vec<ActivePoint>> {
    let points = params.points.unwrap_or(10).min(MAX_POINTS);
    let interval = params.interval_minutes.unwrap_or(5).max(1);
    Json(state.reporter.active_visitor_history(points, interval).await)
}

/// GET /v1/reports/totals: lifetime event totals.
#[utoipa::path(
    get,
    path = "/v1/reports/totals",
    tag = "Reports",
    responses((status = 200, description = "Lifetime totals", body = TotalsResponse))
)]
pub async fn handle_totals(State(state): State<AppState>) -> Json<TotalsResponse> {
    Json(TotalsResponse {
        page_visits: state.reporter.total_visits().await,
        product_views: state.reporter.total_views().await,
    })
}

/// POST /v1/snapshots/catalog: replace the product catalog snapshot.
#[utoipa::path(
    post,
    path = "/v1/snapshots/catalog",
    tag = "Snapshots",
    request_body = CatalogSyncRequest,
    responses((status = 200, description = "Catalog synced", body = SyncResponse))
)]
pub async fn handle_catalog_sync(
    State(state): State<AppState>,
    Json(request): Json<CatalogSyncRequest>,
) -> Json<SyncResponse> {
    let synced = request.products.len();
    state.catalog.sync(request.products);
    metrics::counter!("snapshots.catalog_synced").increment(1);
    Json(SyncResponse { synced })
}

/// POST /v1/snapshots/commerce: replace order and customer snapshots.
#[utoipa::path(
    post,
    path = "/v1/snapshots/commerce",
    tag = "Snapshots",
    request_body = CommerceSyncRequest,
    responses((status = 200, description = "Commerce data synced", body = SyncResponse))
)]
pub async fn handle_commerce_sync(
    State(state): State<AppState>,
    Json(request): Json<CommerceSyncRequest>,
) -> Json<SyncResponse> {
    let synced = request.orders.len();
    state.commerce.sync_orders(request.orders);
    state.commerce.set_customer_count(request.customer_count);
    metrics::counter!("snapshots.commerce_synced").increment(1);
    Json(SyncResponse { synced })
}
