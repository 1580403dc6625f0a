//! System handlers: health, status, OpenAPI.

use crate::api::AppState;
use crate::types::{HealthStatus, StatusSnapshot};
use axum::{Json, extract::State, response::IntoResponse};

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy", body = HealthStatus)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus::now(state.config.server.service_name.clone()))
}

/// GET /status - Active downloads
#[utoipa::path(
    get,
    path = "/status",
    tag = "system",
    responses(
        (status = 200, description = "Fetches currently in progress, oldest first", body = StatusSnapshot)
    )
)]
pub async fn status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.coordinator.status_reporter().snapshot())
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
