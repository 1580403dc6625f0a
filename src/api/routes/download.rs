//! Download handler: admit, fetch, stream.

use super::DownloadQuery;
use crate::api::{AppState, delivery};
use crate::error::{Error, Result};
use crate::types::{FetchOptions, FetchRequest};
use axum::{
    extract::{Query, State, rejection::QueryRejection},
    response::Response,
};

/// GET /download - Fetch a video and stream it back as an attachment
///
/// The file is removed and the URL released once the response body finishes
/// or the client disconnects.
#[utoipa::path(
    get,
    path = "/download",
    tag = "downloads",
    params(DownloadQuery),
    responses(
        (status = 200, description = "Video stream", content_type = "video/mp4"),
        (status = 400, description = "Missing or unsupported URL", body = crate::error::ApiError),
        (status = 409, description = "A download for this URL is already in progress", body = crate::error::ApiError),
        (status = 500, description = "Download failed", body = crate::error::ApiError)
    )
)]
pub async fn download(
    State(state): State<AppState>,
    query: std::result::Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response> {
    let Query(query) = query.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Rejected malformed download query");
        Error::Validation(rejection.body_text())
    })?;
    let key = state
        .coordinator
        .parse_key(query.url.as_deref().unwrap_or_default())?;
    let options = FetchOptions {
        use_auth_context: query.wants_cookies(),
    };

    tracing::info!(
        url = %key,
        use_cookies = options.use_auth_context,
        "Download requested"
    );

    let delivery = state
        .coordinator
        .fetch(FetchRequest::new(key, options))
        .await?;

    delivery::stream_response(delivery, &state.config.fetch).await
}
