//! One extraction attempt, classified

use crate::artifact::{Artifact, ArtifactStore, LocateError, ScratchPath};
use crate::config::ExtractorProfile;
use crate::extractor::{ExtractionRequest, Extractor};
use crate::types::{FailureReason, FetchRequest};
use std::path::PathBuf;
use std::sync::Arc;

/// Result of a single attempt
#[derive(Debug)]
pub enum AttemptOutcome {
    /// A usable media file was produced
    Success(Artifact),
    /// The attempt failed in a way another attempt may fix
    RetryableFailure(FailureReason),
    /// The attempt failed in a way retrying will not fix
    FatalFailure(FailureReason),
}

impl AttemptOutcome {
    /// Failure reason, if the attempt failed
    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            AttemptOutcome::Success(_) => None,
            AttemptOutcome::RetryableFailure(reason) | AttemptOutcome::FatalFailure(reason) => {
                Some(reason)
            }
        }
    }
}

/// Runs the extraction collaborator once and classifies what it left behind
pub struct Fetcher {
    extractor: Arc<dyn Extractor>,
    store: ArtifactStore,
    profile: ExtractorProfile,
    cookies_file: Option<PathBuf>,
}

impl Fetcher {
    /// Create a fetcher
    ///
    /// `cookies_file` is only passed to the collaborator for requests that ask
    /// for authentication.
    pub fn new(
        extractor: Arc<dyn Extractor>,
        store: ArtifactStore,
        profile: ExtractorProfile,
        cookies_file: Option<PathBuf>,
    ) -> Self {
        Self {
            extractor,
            store,
            profile,
            cookies_file,
        }
    }

    /// Scratch storage used by this fetcher
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Run one attempt into `scratch`
    ///
    /// On success the scratch guard moves into the returned [`Artifact`]. On any
    /// failure it is released here, which removes whatever the collaborator wrote.
    pub async fn attempt(&self, request: &FetchRequest, scratch: ScratchPath) -> AttemptOutcome {
        let url = request.key().as_str();
        let cookies = if request.options().use_auth_context {
            self.usable_cookies_file().await
        } else {
            None
        };

        let extraction = ExtractionRequest::from_profile(&self.profile, url, scratch.base(), cookies);

        let info = match self.extractor.extract(&extraction).await {
            Ok(info) => info,
            Err(e) => {
                self.store.release(scratch);
                let message = e.to_string();
                return if e.matches_marker(&self.profile.transient_markers) {
                    tracing::warn!(url, extractor = self.extractor.name(), error = %message, "Transient extractor error");
                    AttemptOutcome::RetryableFailure(FailureReason::TransientExtractor(message))
                } else {
                    tracing::error!(url, extractor = self.extractor.name(), error = %message, "Extractor failed");
                    AttemptOutcome::FatalFailure(FailureReason::Extractor(message))
                };
            }
        };

        match self.store.locate(&scratch).await {
            Ok(located) => {
                tracing::info!(
                    url,
                    path = %located.path.display(),
                    size = located.size_bytes,
                    title = %info.title,
                    "Downloaded media file"
                );
                AttemptOutcome::Success(Artifact::new(scratch, located, info.title))
            }
            Err(LocateError::Placeholder(path)) => {
                self.store.release(scratch);
                tracing::warn!(url, path = %path.display(), "Got webpage snapshot instead of video");
                AttemptOutcome::RetryableFailure(FailureReason::Placeholder { path })
            }
            Err(LocateError::NotFound) => {
                self.store.release(scratch);
                tracing::warn!(url, "No valid media file produced");
                AttemptOutcome::RetryableFailure(FailureReason::NoMediaFile)
            }
        }
    }

    async fn usable_cookies_file(&self) -> Option<PathBuf> {
        let path = self.cookies_file.as_ref()?;
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            Some(path.clone())
        } else {
            tracing::warn!(path = %path.display(), "Cookies file not found, continuing without authentication");
            None
        }
    }
}
