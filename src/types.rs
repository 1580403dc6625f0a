//! Core types shared across the fetch pipeline

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use utoipa::ToSchema;

/// Identifier used to deduplicate concurrent fetches
///
/// The key is the requested URL exactly as received. Two URLs that reference
/// the same media with different query parameters are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Validate `raw` against the platform whitelist and wrap it as a key
    ///
    /// The URL must parse, use `http` or `https`, and have a host equal to one of
    /// `allowed_domains` or a subdomain of one.
    pub fn parse(raw: &str, allowed_domains: &[String]) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(Error::Validation("URL parameter is required".into()));
        }

        let unsupported = || {
            Error::Validation(format!(
                "Only URLs from {} are supported",
                allowed_domains.join(", ")
            ))
        };

        let parsed = url::Url::parse(raw).map_err(|_| unsupported())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(unsupported());
        }

        let host = parsed
            .host_str()
            .ok_or_else(unsupported)?
            .trim_end_matches('.')
            .to_ascii_lowercase();

        let allowed = allowed_domains.iter().any(|domain| {
            let domain = domain.to_ascii_lowercase();
            host == domain || host.ends_with(&format!(".{domain}"))
        });

        if !allowed {
            return Err(unsupported());
        }

        Ok(Self(raw.to_string()))
    }

    /// The key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pass-through options for one fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FetchOptions {
    /// Supply stored authentication cookies to the collaborator
    #[serde(default)]
    pub use_auth_context: bool,
}

/// An admitted fetch request (immutable once created)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    key: ResourceKey,
    options: FetchOptions,
}

impl FetchRequest {
    /// Create a new request
    pub fn new(key: ResourceKey, options: FetchOptions) -> Self {
        Self { key, options }
    }

    /// Resource key being fetched
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Options for the collaborator
    pub fn options(&self) -> FetchOptions {
        self.options
    }
}

/// A fetch admitted into the in-flight registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InFlightEntry {
    /// Resource being fetched
    pub key: ResourceKey,
    /// When the reservation was made
    pub started_at: DateTime<Utc>,
}

/// Classification of a produced file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// A media container with one of the accepted extensions
    Video,
    /// Anything else (webpage snapshots, unknown containers)
    Invalid,
}

/// Why a single attempt did not produce a usable artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The collaborator returned but no media file of sufficient size exists
    NoMediaFile,
    /// The collaborator produced a webpage snapshot instead of media
    Placeholder {
        /// The snapshot file
        path: PathBuf,
    },
    /// Collaborator error whose text matched a transient marker
    TransientExtractor(String),
    /// Any other collaborator error
    Extractor(String),
    /// Scratch storage could not be prepared for the attempt
    Storage(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoMediaFile => f.write_str("no valid file found"),
            FailureReason::Placeholder { .. } => {
                f.write_str("got webpage snapshot instead of video")
            }
            FailureReason::TransientExtractor(msg) | FailureReason::Extractor(msg) => {
                f.write_str(msg)
            }
            FailureReason::Storage(msg) => write!(f, "scratch storage failed: {msg}"),
        }
    }
}

/// Read-only view of the in-flight registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusSnapshot {
    /// Number of fetches currently holding a reservation
    pub active_downloads: usize,
    /// Keys of those fetches, oldest first
    pub active_urls: Vec<String>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    /// Always "healthy" while the server answers
    pub status: String,
    /// Configured service name
    pub service: String,
    /// Unix time in seconds
    pub timestamp: f64,
}

impl HealthStatus {
    /// Health report stamped with the current time
    pub fn now(service: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            status: "healthy".into(),
            service: service.into(),
            timestamp: now.timestamp_millis() as f64 / 1000.0,
        }
    }
}
