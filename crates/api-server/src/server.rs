//! API server: HTTP REST surface plus the Prometheus metrics exporter.

use crate::rest::AppState;
use crate::swagger::ApiDoc;
use crate::{reports_rest, rest};
use axum::routing::{get, post};
use axum::Router;
use shoppulse_core::config::AppConfig;
use std::net::SocketAddr;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// HTTP server exposing tracking, reporting, and operational endpoints.
pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = Router::new()
            // Tracking endpoints
            .route("/v1/track/page", post(rest::handle_track_page))
            .route("/v1/track/product", post(rest::handle_track_product))
            // Reporting endpoints
            .route("/v1/reports/overview", get(reports_rest::handle_overview))
            .route("/v1/reports/daily", get(reports_rest::handle_daily))
            .route("/v1/reports/top-products", get(reports_rest::handle_top_products))
            .route("/v1/reports/active", get(reports_rest::handle_active))
            .route(
                "/v1/reports/active-history",
                get(reports_rest::handle_active_history),
            )
            .route("/v1/reports/totals", get(reports_rest::handle_totals))
            // Snapshot sync from the storefront backend
            .route("/v1/snapshots/catalog", post(reports_rest::handle_catalog_sync))
            .route("/v1/snapshots/commerce", post(reports_rest::handle_commerce_sync))
            // Operational endpoints
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            // API docs
            .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
            // Middleware
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }
}
