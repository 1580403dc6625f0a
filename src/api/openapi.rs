//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the media-fetch REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-fetch REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-fetch REST API",
        version = "0.1.0",
        description = "Fetches videos from a whitelisted platform and streams them back, one fetch per URL at a time",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        crate::api::routes::download,
        crate::api::routes::health_check,
        crate::api::routes::status,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::types::HealthStatus,
        crate::types::StatusSnapshot,
        crate::error::ApiError,
    )),
    tags(
        (name = "downloads", description = "Fetch and stream media"),
        (name = "system", description = "Health, status, and API documentation")
    )
)]
pub struct ApiDoc;
