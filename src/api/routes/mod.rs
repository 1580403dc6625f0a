//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`download`] - Fetch and stream a video
//! - [`system`] - Health, status, OpenAPI

use serde::{Deserialize, Serialize};

mod download;
mod system;

pub use download::*;
pub use system::*;

/// Query parameters for GET /download
#[derive(Debug, Default, Deserialize, Serialize, utoipa::IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    /// Video URL on a supported platform
    pub url: Option<String>,
    /// Send stored authentication cookies ("true", case-insensitive)
    pub use_cookies: Option<String>,
}

impl DownloadQuery {
    /// Whether cookies were requested; anything other than "true" means no
    pub fn wants_cookies(&self) -> bool {
        self.use_cookies
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}
