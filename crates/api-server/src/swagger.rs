//! OpenAPI specification and Swagger UI configuration.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ShopPulse API",
        version = "0.1.0",
        description = "Storefront analytics aggregation service.\n\nRecords page visits and product views, and serves time-windowed aggregates, product rankings, and derived business metrics to the dashboard.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Tracking", description = "Fire-and-forget page visit and product view recording"),
        (name = "Reports", description = "Read-only aggregate queries for the dashboard"),
        (name = "Snapshots", description = "Catalog and commerce snapshot sync from the storefront backend"),
        (name = "Operations", description = "Health, readiness, and liveness probes"),
    ),
    paths(
        // Tracking
        crate::rest::handle_track_page,
        crate::rest::handle_track_product,
        // Reports
        crate::reports_rest::handle_overview,
        crate::reports_rest::handle_daily,
        crate::reports_rest::handle_top_products,
        crate::reports_rest::handle_active,
        crate::reports_rest::handle_active_history,
        crate::reports_rest::handle_totals,
        // Snapshots
        crate::reports_rest::handle_catalog_sync,
        crate::reports_rest::handle_commerce_sync,
        // Operations
        crate::rest::health_check,
        crate::rest::readiness,
        crate::rest::liveness,
    ),
    components(schemas(
        // Core report types
        shoppulse_core::types::Product,
        shoppulse_core::types::OrderRecord,
        shoppulse_core::types::DailyBucket,
        shoppulse_core::types::RankedProduct,
        shoppulse_core::types::Trend,
        shoppulse_core::types::ActivePoint,
        shoppulse_core::types::StoreOverview,
        // REST request/response types
        crate::rest::TrackPageRequest,
        crate::rest::TrackProductRequest,
        crate::rest::TrackResponse,
        crate::rest::ErrorResponse,
        crate::rest::HealthResponse,
        crate::reports_rest::ActiveResponse,
        crate::reports_rest::TotalsResponse,
        crate::reports_rest::CatalogSyncRequest,
        crate::reports_rest::CommerceSyncRequest,
        crate::reports_rest::SyncResponse,
    ))
)]
pub struct ApiDoc;
