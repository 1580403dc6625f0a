//! Extraction collaborator seam
//!
//! The fetch pipeline never talks to a media platform itself. It hands an
//! [`ExtractionRequest`] to an [`Extractor`], which writes `<output_base>.<ext>`
//! and reports the media title. The shipped implementation drives the `yt-dlp`
//! CLI; tests plug in scripted fakes.

mod ytdlp;

pub use ytdlp::YtDlpExtractor;

use crate::config::ExtractorProfile;
use crate::error::ExtractorError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Title used when the collaborator does not report one
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Everything one extraction attempt needs
///
/// Built fresh for every attempt so randomized profile fields (user agent, sleep
/// intervals) are re-drawn each time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// Source URL
    pub url: String,
    /// Scratch base path; the collaborator appends `.<ext>`
    pub output_base: PathBuf,
    /// Format selector
    pub format: String,
    /// Format sort keys
    pub format_sort: Vec<String>,
    /// Force the sort order
    pub format_sort_force: bool,
    /// User agent for this attempt
    pub user_agent: String,
    /// Extra HTTP headers
    pub headers: BTreeMap<String, String>,
    /// Collaborator-specific extractor arguments
    pub extractor_args: Vec<String>,
    /// Minimum sleep between the collaborator's requests, in seconds
    pub sleep_interval: u32,
    /// Maximum sleep between the collaborator's requests, in seconds
    pub max_sleep_interval: u32,
    /// Collaborator-internal retries
    pub retries: u32,
    /// Collaborator-internal fragment retries
    pub fragment_retries: u32,
    /// Skip TLS certificate verification
    pub no_check_certificate: bool,
    /// Cookie jar to authenticate with
    pub cookies_file: Option<PathBuf>,
}

impl ExtractionRequest {
    /// Draw a request from a profile
    pub fn from_profile(
        profile: &ExtractorProfile,
        url: impl Into<String>,
        output_base: impl Into<PathBuf>,
        cookies_file: Option<PathBuf>,
    ) -> Self {
        use rand::seq::SliceRandom;

        let user_agent = profile
            .user_agents
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default();

        let sleep_interval = profile.sleep_interval.sample();
        // the collaborator rejects a maximum below the minimum
        let max_sleep_interval = profile.max_sleep_interval.sample().max(sleep_interval);

        Self {
            url: url.into(),
            output_base: output_base.into(),
            format: profile.format.clone(),
            format_sort: profile.format_sort.clone(),
            format_sort_force: profile.format_sort_force,
            user_agent,
            headers: profile.headers.clone(),
            extractor_args: profile.extractor_args.clone(),
            sleep_interval,
            max_sleep_interval,
            retries: profile.retries,
            fragment_retries: profile.fragment_retries,
            no_check_certificate: profile.no_check_certificate,
            cookies_file,
        }
    }
}

/// Metadata reported by a successful extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionInfo {
    /// Media title
    pub title: String,
}

impl Default for ExtractionInfo {
    fn default() -> Self {
        Self {
            title: UNKNOWN_TITLE.to_string(),
        }
    }
}

/// Trait for the media extraction collaborator
///
/// Implementations download the media for `request.url` to
/// `request.output_base` plus an extension of their choosing. Returning `Ok`
/// does not promise a usable file; the caller inspects the scratch directory
/// afterwards.
///
/// # Examples
///
/// ```no_run
/// use media_fetch::config::ExtractorProfile;
/// use media_fetch::extractor::{ExtractionRequest, Extractor, YtDlpExtractor};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let profile = ExtractorProfile::default();
/// let extractor = YtDlpExtractor::from_profile(&profile)?;
///
/// let request = ExtractionRequest::from_profile(
///     &profile,
///     "https://youtu.be/abc123",
///     "/tmp/media-fetch-example",
///     None,
/// );
/// let info = extractor.extract(&request).await?;
/// println!("downloaded {}", info.title);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Run one extraction
    ///
    /// # Errors
    ///
    /// Returns an error if the collaborator cannot be started or reports a
    /// failure. The error text is matched against the profile's transient
    /// markers to decide whether the attempt is retried.
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionInfo, ExtractorError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
