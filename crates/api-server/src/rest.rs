//! REST API handlers for event tracking and operational endpoints.
//!
//! Tracking endpoints acknowledge with 202 and hand the actual recording
//! to a background task; a slow enrichment lookup or store write never
//! delays the storefront's navigation.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;
use utoipa::ToSchema;

use shoppulse_core::store::{MemoryCommerceSource, MemoryProductCatalog};
use shoppulse_core::types::UNKNOWN;
use shoppulse_ingest::{ActorResolver, ClientContext, EventTracker};
use shoppulse_reporting::DashboardReporter;

/// Maximum string field length (page path, product id, user id).
pub(crate) const MAX_FIELD_LEN: usize = 256;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<EventTracker>,
    pub reporter: Arc<DashboardReporter>,
    pub resolver: ActorResolver,
    pub catalog: Arc<MemoryProductCatalog>,
    pub commerce: Arc<MemoryCommerceSource>,
    pub node_id: String,
    pub start_time: Instant,
}

#[derive(Deserialize, ToSchema)]
pub struct TrackPageRequest {
    pub path: String,
    /// Wins over the ambient `Referer` header when present.
    pub referrer: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct TrackProductRequest {
    pub product_id: String,
    pub user_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct TrackResponse {
    pub accepted: bool,
}

pub(crate) fn validate_subject(subject: &str, field: &'static str) -> Result<(), &'static str> {
    if subject.trim().is_empty() {
        return Err(match field {
            "path" => "'path' must not be empty",
            _ => "'product_id' must not be empty",
        });
    }
    if subject.len() > MAX_FIELD_LEN {
        return Err(match field {
            "path" => "'path' exceeds maximum length",
            _ => "'product_id' exceeds maximum length",
        });
    }
    Ok(())
}

/// Ambient client metadata from request headers.
pub(crate) fn client_context(headers: &HeaderMap) -> ClientContext {
    let agent_string = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(UNKNOWN)
        .to_string();
    let referrer = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    ClientContext {
        agent_string,
        referrer,
    }
}

/// POST /v1/track/page: record a page visit (fire-and-forget).
#[utoipa::path(
    post,
    path = "/v1/track/page",
    tag = "Tracking",
    request_body = TrackPageRequest,
    responses(
        (status = 202, description = "Event accepted for recording", body = TrackResponse),
        (status = 400, description = "Invalid tracking request", body = ErrorResponse),
    )
)]
pub async fn handle_track_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TrackPageRequest>,
) -> Result<(StatusCode, Json<TrackResponse>), (StatusCode, Json<ErrorResponse>)> {
    if let Err(msg) = validate_subject(&request.path, "path") {
        warn!(error = msg, "Track page validation failed");
        metrics::counter!("api.validation_errors").increment(1);
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "invalid_track_request".to_string(),
                message: msg.to_string(),
            }),
        ));
    }

    let TrackPageRequest {
        path,
        referrer,
        user_id,
    } = request;
    let tracker = state.tracker.clone();
    let actor = state.resolver.resolve(user_id);
    let client = client_context(&headers);
    tokio::spawn(async move {
        // Fire and forget: a failed recording is logged inside the tracker.
        let _ = tracker
            .record_page_visit(&actor, &client, &path, referrer.as_deref())
            .await;
    });

    Ok((StatusCode::ACCEPTED, Json(TrackResponse { accepted: true })))
}

/// POST /v1/track/product: record a product view (fire-and-forget).
#[utoipa::path(
    post,
    path = "/v1/track/product",
    tag = "Tracking",
    request_body = TrackProductRequest,
    responses(
        (status = 202, description = "Event accepted for recording", body = TrackResponse),
        (status = 400, description = "Invalid tracking request", body = ErrorResponse),
    )
)]
pub async fn handle_track_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TrackProductRequest>,
) -> Result<(StatusCode, Json<TrackResponse>), (StatusCode, Json<ErrorResponse>)> {
    if let Err(msg) = validate_subject(&request.product_id, "product_id") {
        warn!(error = msg, "Track product validation failed");
        metrics::counter!("api.validation_errors").increment(1);
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "invalid_track_request".to_string(),
                message: msg.to_string(),
            }),
        ));
    }

    let TrackProductRequest {
        product_id,
        user_id,
    } = request;
    let tracker = state.tracker.clone();
    let actor = state.resolver.resolve(user_id);
    let client = client_context(&headers);
    tokio::spawn(async move {
        let _ = tracker
            .record_product_view(&actor, &client, &product_id)
            .await;
    });

    Ok((StatusCode::ACCEPTED, Json(TrackResponse { accepted: true })))
}

/// GET /health: Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Operations",
    responses((status = 200, description = "Service health", body = HealthResponse))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready: Readiness probe for Kubernetes.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Operations",
    responses(
        (status = 200, description = "Ready for traffic"),
        (status = 503, description = "Not ready"),
    )
)]
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.start_time.elapsed().as_secs() > 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /live: Liveness probe for Kubernetes.
#[utoipa::path(
    get,
    path = "/live",
    tag = "Operations",
    responses((status = 200, description = "Alive"))
)]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}
