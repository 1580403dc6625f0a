//! Single-flight fetch coordination
//!
//! [`FetchCoordinator`] owns the in-flight registry and the retry loop. It is
//! cheap to clone; clones share the registry, so one instance per server is
//! injected into the API state.
//!
//! Lifecycle of one fetch:
//! 1. [`FetchCoordinator::reserve`] admits the key or fails with `AlreadyInProgress`
//! 2. [`FetchCoordinator::run_fetch`] runs attempts one after another until the
//!    policy stops
//! 3. the caller streams the [`Artifact`]; dropping the [`Delivery`] removes the
//!    file and releases the key

mod registry;


pub use registry::{InFlightRegistry, Reservation};

use crate::artifact::{Artifact, ArtifactStore};
use crate::config::Config;
use crate::error::{Error, FetchError, Result};
use crate::extractor::Extractor;
use crate::fetcher::{AttemptOutcome, Fetcher};
use crate::retry::{JitteredRetryPolicy, NextAction, RetryPolicy};
use crate::status::StatusReporter;
use crate::types::{FetchRequest, ResourceKey};
use std::sync::Arc;

struct Inner {
    registry: InFlightRegistry,
    fetcher: Fetcher,
    policy: Arc<dyn RetryPolicy>,
    allowed_domains: Vec<String>,
}

/// Deduplicates concurrent fetches and drives the retry loop
#[derive(Clone)]
pub struct FetchCoordinator {
    inner: Arc<Inner>,
}

impl FetchCoordinator {
    /// Create a coordinator with the default jittered retry policy
    pub fn new(config: &Config, extractor: Arc<dyn Extractor>) -> Self {
        let policy = Arc::new(JitteredRetryPolicy::new(config.retry.clone()));
        Self::with_policy(config, extractor, policy)
    }

    /// Create a coordinator with a custom retry policy
    pub fn with_policy(
        config: &Config,
        extractor: Arc<dyn Extractor>,
        policy: Arc<dyn RetryPolicy>,
    ) -> Self {
        let store = ArtifactStore::new(&config.fetch);
        let fetcher = Fetcher::new(
            extractor,
            store,
            config.extractor.clone(),
            config.fetch.cookies_file.clone(),
        );

        Self {
            inner: Arc::new(Inner {
                registry: InFlightRegistry::new(),
                fetcher,
                policy,
                allowed_domains: config.fetch.allowed_domains.clone(),
            }),
        }
    }

    /// The in-flight registry
    pub fn registry(&self) -> &InFlightRegistry {
        &self.inner.registry
    }

    /// Read-only view of the registry
    pub fn status_reporter(&self) -> StatusReporter {
        StatusReporter::new(self.inner.registry.clone())
    }

    /// Validate a raw URL against the configured platform whitelist
    pub fn parse_key(&self, raw: &str) -> Result<ResourceKey> {
        ResourceKey::parse(raw, &self.inner.allowed_domains)
    }

    /// Reserve `key` if no fetch for it is running
    pub fn try_reserve(&self, key: &ResourceKey) -> Option<Reservation> {
        self.inner.registry.try_reserve(key)
    }

    /// Reserve `key` or fail with [`Error::AlreadyInProgress`]
    pub fn reserve(&self, key: &ResourceKey) -> Result<Reservation> {
        self.try_reserve(key).ok_or_else(|| {
            tracing::warn!(url = %key, "Download already in progress");
            Error::AlreadyInProgress(key.to_string())
        })
    }

    /// Remove `key` from the registry; no-op if absent
    pub fn release(&self, key: &ResourceKey) {
        self.inner.registry.release(key);
    }

    /// Run attempts for `request` until one succeeds or the policy stops
    ///
    /// The caller must already hold a reservation for the request's key and
    /// releases it afterwards. Attempts run strictly one after another; every
    /// failed attempt's scratch files are removed before the next one starts.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Fatal`] when an attempt fails in a non-retryable way
    /// - [`FetchError::ExhaustedRetries`] when the policy stops after a retryable failure
    /// - [`Error::Storage`] when a scratch path cannot be allocated
    pub async fn run_fetch(&self, request: &FetchRequest) -> Result<Artifact> {
        let Inner {
            fetcher, policy, ..
        } = &*self.inner;
        let key = request.key();
        let max_attempts = policy.max_attempts().max(1);
        let mut attempt_index: u32 = 0;

        loop {
            let pre_delay = policy.pre_attempt_delay(attempt_index);
            if !pre_delay.is_zero() {
                tracing::debug!(url = %key, delay_ms = pre_delay.as_millis() as u64, "Waiting before attempt");
                tokio::time::sleep(pre_delay).await;
            }

            let scratch = fetcher.store().allocate().await.inspect_err(|e| {
                tracing::error!(url = %key, error = %e, "Failed to allocate scratch path");
            })?;

            tracing::info!(
                url = %key,
                attempt = attempt_index + 1,
                max_attempts,
                "Starting download attempt"
            );

            let outcome = match fetcher.attempt(request, scratch).await {
                AttemptOutcome::Success(artifact) => {
                    if attempt_index > 0 {
                        tracing::info!(url = %key, attempts = attempt_index + 1, "Download succeeded after retry");
                    }
                    return Ok(artifact);
                }
                failure => failure,
            };

            let action = if matches!(outcome, AttemptOutcome::FatalFailure(_))
                || attempt_index + 1 >= max_attempts
            {
                NextAction::Stop
            } else {
                policy.next_action(attempt_index, &outcome)
            };

            match action {
                NextAction::RetryAfter(delay) => {
                    if let Some(reason) = outcome.failure_reason() {
                        tracing::warn!(
                            url = %key,
                            attempt = attempt_index + 1,
                            max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            reason = %reason,
                            "Attempt failed, retrying"
                        );
                    }
                    tokio::time::sleep(delay).await;
                    attempt_index += 1;
                }
                NextAction::Stop => {
                    return Err(terminal_error(outcome, attempt_index + 1, key));
                }
            }
        }
    }

    /// Reserve the key, fetch in a detached task, and hand back the result
    ///
    /// The fetch task owns the reservation. If the returned future is dropped
    /// (client went away), the task still runs to completion and then releases
    /// the key and removes its files.
    pub async fn fetch(&self, request: FetchRequest) -> Result<Delivery> {
        let reservation = self.reserve(request.key())?;
        let coordinator = self.clone();

        let task = tokio::spawn(async move {
            let artifact = coordinator.run_fetch(&request).await?;
            Ok::<_, Error>(Delivery {
                artifact,
                reservation,
            })
        });

        task.await
            .map_err(|e| Error::Other(format!("fetch task failed: {e}")))?
    }
}

fn terminal_error(outcome: AttemptOutcome, attempts: u32, key: &ResourceKey) -> Error {
    let error = match outcome {
        AttemptOutcome::FatalFailure(reason) => FetchError::Fatal {
            reason: reason.to_string(),
        },
        AttemptOutcome::RetryableFailure(reason) => FetchError::ExhaustedRetries {
            attempts,
            last_reason: reason.to_string(),
        },
        AttemptOutcome::Success(_) => FetchError::Fatal {
            reason: "retry policy stopped after a successful attempt".into(),
        },
    };
    tracing::error!(url = %key, attempts, error = %error, "Download failed");
    Error::Fetch(error)
}

/// A fetched artifact together with the reservation that produced it
///
/// Dropping it, after streaming or on abort, removes the artifact's files and
/// then releases the key.
#[derive(Debug)]
pub struct Delivery {
    artifact: Artifact,
    reservation: Reservation,
}

impl Delivery {
    /// The fetched artifact
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    /// Key the artifact was fetched for
    pub fn key(&self) -> &ResourceKey {
        self.reservation.key()
    }
}
