//! # media-fetch
//!
//! HTTP service that fetches a video from a whitelisted platform and streams it
//! back to the caller.
//!
//! ## Design
//!
//! - **Single-flight** - at most one fetch per URL; duplicates are rejected, not queued
//! - **Bounded retries** - transient extraction failures are retried with jittered backoff
//! - **No leftovers** - scratch files are removed on success, failure, and client abort
//! - **Pluggable collaborator** - extraction runs behind the [`Extractor`] trait;
//!   [`YtDlpExtractor`] drives the `yt-dlp` CLI
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_fetch::{Config, FetchCoordinator, YtDlpExtractor};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::default());
//!     config.validate()?;
//!
//!     let extractor = Arc::new(YtDlpExtractor::from_profile(&config.extractor)?);
//!     let coordinator = FetchCoordinator::new(&config, extractor);
//!
//!     media_fetch::api::start_api_server(coordinator, config, media_fetch::shutdown_signal())
//!         .await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Scratch files and fetched artifacts
pub mod artifact;
/// Configuration types
pub mod config;
/// Single-flight fetch coordination
pub mod coordinator;
/// Error types
pub mod error;
/// Extraction collaborator seam
pub mod extractor;
/// Single extraction attempt
pub mod fetcher;
/// Retry policy
pub mod retry;
/// In-flight status reporting
pub mod status;
/// Core types
pub mod types;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod test_helpers;

// Re-export commonly used types
pub use artifact::{Artifact, ArtifactStore};
pub use config::{Config, ExtractorProfile, ProfilePreset};
pub use coordinator::{Delivery, FetchCoordinator, InFlightRegistry, Reservation};
pub use error::{ApiError, Error, ExtractorError, FetchError, Result, ToHttpStatus};
pub use extractor::{ExtractionInfo, ExtractionRequest, Extractor, YtDlpExtractor};
pub use fetcher::{AttemptOutcome, Fetcher};
pub use retry::{JitteredRetryPolicy, NextAction, RetryPolicy};
pub use status::StatusReporter;
pub use types::{FetchOptions, FetchRequest, HealthStatus, ResourceKey, StatusSnapshot};

/// Resolves on Ctrl+C, or on SIGTERM where the platform has it
///
/// Pass it to [`api::start_api_server`] for graceful shutdown. A signal source
/// that cannot be registered is logged and never fires.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
