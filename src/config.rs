//! Configuration types for media-fetch

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Main configuration for the fetch service
///
/// Every field has a serde default, so `{}` is a complete configuration.
/// Sub-configs:
/// - [`server`](ApiConfig) - HTTP surface
/// - [`fetch`](FetchConfig) - scratch storage, URL whitelist, delivery
/// - [`retry`](RetryConfig) - attempt budget and backoff
/// - [`extractor`](ExtractorProfile) - pass-through collaborator profile
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// REST API configuration
    #[serde(default)]
    pub server: ApiConfig,

    /// Fetch and artifact settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Retry policy settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Extraction collaborator profile
    #[serde(default)]
    pub extractor: ExtractorProfile,
}

impl Config {
    /// Check cross-field invariants that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(config_error(
                "max_attempts must be at least 1",
                "retry.max_attempts",
            ));
        }

        for (key, range) in [
            ("retry.pre_attempt_delay", &self.retry.pre_attempt_delay),
            ("retry.first_backoff", &self.retry.first_backoff),
            ("retry.later_backoff", &self.retry.later_backoff),
        ] {
            if range.min_ms > range.max_ms {
                return Err(config_error(
                    format!(
                        "delay range minimum {}ms exceeds maximum {}ms",
                        range.min_ms, range.max_ms
                    ),
                    key,
                ));
            }
        }

        for (key, range) in [
            ("extractor.sleep_interval", &self.extractor.sleep_interval),
            (
                "extractor.max_sleep_interval",
                &self.extractor.max_sleep_interval,
            ),
        ] {
            if range.min_secs > range.max_secs {
                return Err(config_error(
                    format!(
                        "interval minimum {}s exceeds maximum {}s",
                        range.min_secs, range.max_secs
                    ),
                    key,
                ));
            }
        }

        if self.fetch.allowed_domains.is_empty() {
            return Err(config_error(
                "at least one allowed domain is required",
                "fetch.allowed_domains",
            ));
        }

        if self.fetch.media_extensions.is_empty() {
            return Err(config_error(
                "at least one media extension is required",
                "fetch.media_extensions",
            ));
        }

        if self.extractor.user_agents.is_empty() {
            return Err(config_error(
                "at least one user agent is required",
                "extractor.user_agents",
            ));
        }

        Ok(())
    }
}

fn config_error(message: impl Into<String>, key: &str) -> Error {
    Error::Config {
        message: message.into(),
        key: Some(key.to_string()),
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:8000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Service name reported by `/health` (default: "media-fetch")
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            service_name: default_service_name(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Fetch, scratch storage and delivery configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FetchConfig {
    /// Directory for scratch files (default: `media-fetch` under the system temp dir)
    #[serde(default = "default_scratch_dir")]
    #[schema(value_type = String)]
    pub scratch_dir: PathBuf,

    /// Source platform domains accepted by `/download` (subdomains included)
    #[serde(default = "default_allowed_domains")]
    pub allowed_domains: Vec<String>,

    /// Accepted media container extensions, in probe order
    #[serde(default = "default_media_extensions")]
    pub media_extensions: Vec<String>,

    /// Extensions that indicate a webpage snapshot instead of media
    #[serde(default = "default_placeholder_extensions")]
    pub placeholder_extensions: Vec<String>,

    /// Files at or below this many bytes are treated as failed downloads (default: 1000)
    #[serde(default = "default_min_valid_size")]
    pub min_valid_size: u64,

    /// Stored authentication cookies, used when a request sets `use_cookies=true`
    #[serde(default = "default_cookies_file")]
    #[schema(value_type = Option<String>)]
    pub cookies_file: Option<PathBuf>,

    /// Maximum number of title characters used in the attachment filename (default: 50)
    #[serde(default = "default_filename_max_chars")]
    pub filename_max_chars: usize,

    /// Content type of streamed artifacts (default: "video/mp4")
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            allowed_domains: default_allowed_domains(),
            media_extensions: default_media_extensions(),
            placeholder_extensions: default_placeholder_extensions(),
            min_valid_size: default_min_valid_size(),
            cookies_file: default_cookies_file(),
            filename_max_chars: default_filename_max_chars(),
            content_type: default_content_type(),
        }
    }
}

/// Inclusive range of delays, in milliseconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DelayRange {
    /// Lower bound in milliseconds
    pub min_ms: u64,
    /// Upper bound in milliseconds
    pub max_ms: u64,
}

impl DelayRange {
    /// Range from whole seconds
    pub const fn from_secs(min: u64, max: u64) -> Self {
        Self {
            min_ms: min * 1000,
            max_ms: max * 1000,
        }
    }

    /// A range that never waits
    pub const fn zero() -> Self {
        Self {
            min_ms: 0,
            max_ms: 0,
        }
    }

    /// Draw a uniformly random delay from the range
    pub fn sample(&self) -> Duration {
        use rand::Rng;

        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::thread_rng().gen_range(self.min_ms..=self.max_ms))
    }
}

/// Retry configuration for transient extraction failures
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Total attempts including the first one (default: 4)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Random delay before every attempt (default: 1-2 seconds)
    #[serde(default = "default_pre_attempt_delay")]
    pub pre_attempt_delay: DelayRange,

    /// Backoff after the first failed attempt (default: 1-3 seconds)
    #[serde(default = "default_first_backoff")]
    pub first_backoff: DelayRange,

    /// Backoff after any later failed attempt (default: 3-10 seconds)
    #[serde(default = "default_later_backoff")]
    pub later_backoff: DelayRange,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            pre_attempt_delay: default_pre_attempt_delay(),
            first_backoff: default_first_backoff(),
            later_backoff: default_later_backoff(),
        }
    }
}

impl RetryConfig {
    /// Retry settings that never sleep, for tests and local tooling
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            pre_attempt_delay: DelayRange::zero(),
            first_backoff: DelayRange::zero(),
            later_backoff: DelayRange::zero(),
        }
    }
}

/// Inclusive range of whole seconds passed to the collaborator's own throttling
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SecondsRange {
    /// Lower bound in seconds
    pub min_secs: u32,
    /// Upper bound in seconds
    pub max_secs: u32,
}

impl SecondsRange {
    /// Build a range
    pub const fn new(min_secs: u32, max_secs: u32) -> Self {
        Self { min_secs, max_secs }
    }

    /// Draw a uniformly random value from the range
    pub fn sample(&self) -> u32 {
        use rand::Rng;

        if self.max_secs <= self.min_secs {
            return self.min_secs;
        }
        rand::thread_rng().gen_range(self.min_secs..=self.max_secs)
    }
}

/// Named collaborator profiles
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProfilePreset {
    /// Android client, fixed modern headers, no retry markers
    Basic,
    /// Several player clients, full browser header set
    Enhanced,
    /// Web client only with legacy headers (default)
    #[default]
    LegacyClient,
}

impl std::str::FromStr for ProfilePreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "basic" => Ok(Self::Basic),
            "enhanced" => Ok(Self::Enhanced),
            "legacy_client" | "legacy" | "final" => Ok(Self::LegacyClient),
            other => Err(config_error(
                format!("unknown profile preset '{other}'"),
                "extractor",
            )),
        }
    }
}

/// Pass-through configuration for the extraction collaborator
///
/// This is data, not architecture: the same coordinator runs any profile.
/// Randomized fields (user agent, sleep intervals) are drawn per attempt.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ExtractorProfile {
    /// Explicit extractor binary path (discovered on PATH when unset)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub binary: Option<PathBuf>,

    /// Format selector, including the quality ceiling
    #[serde(default = "default_format")]
    pub format: String,

    /// Format sort keys
    #[serde(default)]
    pub format_sort: Vec<String>,

    /// Force the format sort order over the collaborator's defaults
    #[serde(default)]
    pub format_sort_force: bool,

    /// User agents; one is picked at random per attempt
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Additional HTTP headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Collaborator-specific extractor arguments (client spoofing parameters)
    #[serde(default)]
    pub extractor_args: Vec<String>,

    /// Range for the collaborator's minimum sleep between requests
    #[serde(default = "default_sleep_interval")]
    pub sleep_interval: SecondsRange,

    /// Range for the collaborator's maximum sleep between requests
    #[serde(default = "default_max_sleep_interval")]
    pub max_sleep_interval: SecondsRange,

    /// Collaborator-internal retries for the whole download
    #[serde(default = "default_collaborator_retries")]
    pub retries: u32,

    /// Collaborator-internal retries per fragment
    #[serde(default = "default_collaborator_retries")]
    pub fragment_retries: u32,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub no_check_certificate: bool,

    /// Case-insensitive keywords that mark an extractor error as transient
    #[serde(default)]
    pub transient_markers: Vec<String>,
}

impl Default for ExtractorProfile {
    fn default() -> Self {
        Self::preset(ProfilePreset::default())
    }
}

impl ExtractorProfile {
    /// Build one of the named profiles
    pub fn preset(preset: ProfilePreset) -> Self {
        match preset {
            ProfilePreset::Basic => Self {
                binary: None,
                format: default_format(),
                format_sort: Vec::new(),
                format_sort_force: false,
                user_agents: vec![CHROME_120_WINDOWS.to_string()],
                headers: headers(&[
                    (
                        "Accept",
                        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                    ),
                    ("Accept-Language", "en-us,en;q=0.5"),
                    ("Accept-Encoding", "gzip,deflate"),
                    ("Accept-Charset", "ISO-8859-1,utf-8;q=0.7,*;q=0.7"),
                    ("DNT", "1"),
                    ("Connection", "keep-alive"),
                    ("Upgrade-Insecure-Requests", "1"),
                ]),
                extractor_args: vec![
                    "youtube:player_client=android;player_skip=webpage,configs".to_string(),
                ],
                sleep_interval: SecondsRange::new(1, 1),
                max_sleep_interval: SecondsRange::new(5, 5),
                retries: 3,
                fragment_retries: 10,
                no_check_certificate: false,
                transient_markers: Vec::new(),
            },
            ProfilePreset::Enhanced => Self {
                binary: None,
                format: default_format(),
                format_sort: vec![
                    "res:720".to_string(),
                    "ext:mp4:m4a".to_string(),
                    "hasvid".to_string(),
                    "hasaud".to_string(),
                ],
                format_sort_force: true,
                user_agents: vec![
                    CHROME_120_WINDOWS.to_string(),
                    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/121.0".to_string(),
                    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15".to_string(),
                ],
                headers: headers(&[
                    (
                        "Accept",
                        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
                    ),
                    ("Accept-Language", "en-US,en;q=0.9"),
                    ("Accept-Encoding", "gzip, deflate, br"),
                    ("DNT", "1"),
                    ("Connection", "keep-alive"),
                    ("Upgrade-Insecure-Requests", "1"),
                    ("Sec-Fetch-Dest", "document"),
                    ("Sec-Fetch-Mode", "navigate"),
                    ("Sec-Fetch-Site", "none"),
                    ("Sec-Fetch-User", "?1"),
                    ("Cache-Control", "max-age=0"),
                    (
                        "sec-ch-ua",
                        "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\"",
                    ),
                    ("sec-ch-ua-mobile", "?0"),
                    ("sec-ch-ua-platform", "\"Windows\""),
                ]),
                extractor_args: vec![
                    "youtube:player_client=android,web,mweb;player_skip=webpage,configs"
                        .to_string(),
                ],
                sleep_interval: SecondsRange::new(2, 5),
                max_sleep_interval: SecondsRange::new(5, 10),
                retries: 5,
                fragment_retries: 5,
                no_check_certificate: true,
                transient_markers: markers(&["precondition", "signature", "extraction"]),
            },
            ProfilePreset::LegacyClient => Self {
                binary: None,
                format: default_format(),
                format_sort: vec![
                    "res:720".to_string(),
                    "ext:mp4:m4a".to_string(),
                    "hasvid".to_string(),
                    "hasaud".to_string(),
                ],
                format_sort_force: true,
                user_agents: default_user_agents(),
                headers: headers(&[
                    (
                        "Accept",
                        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                    ),
                    ("Accept-Language", "en-US,en;q=0.5"),
                    ("Accept-Encoding", "gzip, deflate"),
                    ("DNT", "1"),
                    ("Connection", "keep-alive"),
                    ("Upgrade-Insecure-Requests", "1"),
                ]),
                extractor_args: vec![
                    "youtube:player_client=web;player_skip=webpage,configs".to_string(),
                ],
                sleep_interval: default_sleep_interval(),
                max_sleep_interval: default_max_sleep_interval(),
                retries: default_collaborator_retries(),
                fragment_retries: default_collaborator_retries(),
                no_check_certificate: true,
                transient_markers: markers(&[
                    "precondition",
                    "signature",
                    "extraction",
                    "gvs",
                    "po_token",
                ]),
            },
        }
    }
}

const CHROME_120_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn markers(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

// Default value functions
fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_service_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("media-fetch")
}

fn default_allowed_domains() -> Vec<String> {
    vec!["youtube.com".into(), "youtu.be".into()]
}

fn default_media_extensions() -> Vec<String> {
    vec![
        "mp4".into(),
        "webm".into(),
        "mkv".into(),
        "avi".into(),
        "mov".into(),
        "flv".into(),
    ]
}

fn default_placeholder_extensions() -> Vec<String> {
    vec!["mhtml".into()]
}

fn default_min_valid_size() -> u64 {
    1000
}

fn default_cookies_file() -> Option<PathBuf> {
    Some(PathBuf::from("/opt/ytapp/youtube_cookies.txt"))
}

fn default_filename_max_chars() -> usize {
    50
}

fn default_content_type() -> String {
    "video/mp4".into()
}

fn default_max_attempts() -> u32 {
    4
}

fn default_pre_attempt_delay() -> DelayRange {
    DelayRange::from_secs(1, 2)
}

fn default_first_backoff() -> DelayRange {
    DelayRange::from_secs(1, 3)
}

fn default_later_backoff() -> DelayRange {
    DelayRange::from_secs(3, 10)
}

fn default_format() -> String {
    "best[height<=720]/best".into()
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".into(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/90.0.4430.212 Safari/537.36".into(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".into(),
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".into(),
    ]
}

fn default_sleep_interval() -> SecondsRange {
    SecondsRange::new(1, 3)
}

fn default_max_sleep_interval() -> SecondsRange {
    SecondsRange::new(3, 6)
}

fn default_collaborator_retries() -> u32 {
    3
}
