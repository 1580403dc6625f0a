//! Retry policy for extraction attempts
//!
//! The policy only decides. It never sleeps and never calls the extractor, so the
//! retry loop in [`crate::coordinator`] stays a plain iterative loop and tests can
//! swap in a fake policy.
//!
//! # Example
//!
//! ```
//! use media_fetch::config::RetryConfig;
//! use media_fetch::fetcher::AttemptOutcome;
//! use media_fetch::retry::{JitteredRetryPolicy, NextAction, RetryPolicy};
//! use media_fetch::types::FailureReason;
//!
//! let policy = JitteredRetryPolicy::new(RetryConfig::default());
//! let outcome = AttemptOutcome::FatalFailure(FailureReason::Extractor("Video unavailable".into()));
//! assert_eq!(policy.next_action(0, &outcome), NextAction::Stop);
//! ```

use crate::config::RetryConfig;
use crate::fetcher::AttemptOutcome;
use std::time::Duration;

/// What the retry loop should do after an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    /// Return the current outcome to the caller
    Stop,
    /// Wait for the given delay, then run another attempt
    RetryAfter(Duration),
}

/// Decides whether a failed attempt is retried and how long to wait first
pub trait RetryPolicy: Send + Sync {
    /// Decide the next step after attempt `attempt_index` (0-based) produced `outcome`
    fn next_action(&self, attempt_index: u32, outcome: &AttemptOutcome) -> NextAction;

    /// Delay before starting attempt `attempt_index`
    fn pre_attempt_delay(&self, _attempt_index: u32) -> Duration {
        Duration::ZERO
    }

    /// Total attempts the policy allows for one request
    fn max_attempts(&self) -> u32;
}

/// Default policy: bounded attempts with randomized, increasing backoff
///
/// Backoff after the first failure is drawn from `first_backoff`; after any later
/// failure from `later_backoff`. Randomizing keeps concurrent fetches from
/// retrying against the platform in lockstep.
#[derive(Debug, Clone)]
pub struct JitteredRetryPolicy {
    config: RetryConfig,
}

impl JitteredRetryPolicy {
    /// Create a policy from retry settings
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    fn backoff(&self, attempt_index: u32) -> Duration {
        if attempt_index == 0 {
            self.config.first_backoff.sample()
        } else {
            self.config.later_backoff.sample()
        }
    }
}

impl RetryPolicy for JitteredRetryPolicy {
    fn next_action(&self, attempt_index: u32, outcome: &AttemptOutcome) -> NextAction {
        if attempt_index.saturating_add(1) >= self.config.max_attempts {
            return NextAction::Stop;
        }

        match outcome {
            AttemptOutcome::RetryableFailure(_) => NextAction::RetryAfter(self.backoff(attempt_index)),
            AttemptOutcome::Success(_) | AttemptOutcome::FatalFailure(_) => NextAction::Stop,
        }
    }

    fn pre_attempt_delay(&self, _attempt_index: u32) -> Duration {
        self.config.pre_attempt_delay.sample()
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }
}
