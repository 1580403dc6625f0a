//! CLI-based extractor using the external yt-dlp binary

use super::{ExtractionInfo, ExtractionRequest, Extractor, UNKNOWN_TITLE};
use crate::config::ExtractorProfile;
use crate::error::ExtractorError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

const BINARY_NAME: &str = "yt-dlp";

/// CLI-based extractor using the external yt-dlp binary
///
/// The binary downloads the media and prints the info dict as a single JSON
/// document, which is where the title comes from.
///
/// # Examples
///
/// ```no_run
/// use media_fetch::extractor::YtDlpExtractor;
/// use std::path::PathBuf;
///
/// // Create with explicit path
/// let extractor = YtDlpExtractor::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let extractor = YtDlpExtractor::from_path().expect("yt-dlp not found in PATH");
/// ```
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    binary_path: PathBuf,
}

impl YtDlpExtractor {
    /// Create a new extractor with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which(BINARY_NAME).ok().map(Self::new)
    }

    /// Use the profile's binary if set, otherwise search PATH
    pub fn from_profile(profile: &ExtractorProfile) -> Result<Self, ExtractorError> {
        match &profile.binary {
            Some(path) => Ok(Self::new(path.clone())),
            None => Self::from_path().ok_or_else(|| ExtractorError::NotInstalled(BINARY_NAME.into())),
        }
    }

    /// Binary this extractor runs
    pub fn binary_path(&self) -> &PathBuf {
        &self.binary_path
    }
}

/// Command-line arguments for one extraction
fn build_args(request: &ExtractionRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    let mut push = |flag: &str, value: OsString| {
        args.push(flag.into());
        args.push(value);
    };

    push("-f", request.format.clone().into());

    let mut template = OsString::from(request.output_base.as_os_str());
    template.push(".%(ext)s");
    push("-o", template);

    if !request.user_agent.is_empty() {
        push("--user-agent", request.user_agent.clone().into());
    }
    for (name, value) in &request.headers {
        push("--add-header", format!("{name}:{value}").into());
    }
    for extractor_arg in &request.extractor_args {
        push("--extractor-args", extractor_arg.clone().into());
    }

    push("--sleep-interval", request.sleep_interval.to_string().into());
    push(
        "--max-sleep-interval",
        request.max_sleep_interval.to_string().into(),
    );
    push("--retries", request.retries.to_string().into());
    push(
        "--fragment-retries",
        request.fragment_retries.to_string().into(),
    );

    if !request.format_sort.is_empty() {
        push("-S", request.format_sort.join(",").into());
    }
    if let Some(cookies) = &request.cookies_file {
        push("--cookies", cookies.clone().into_os_string());
    }

    if request.format_sort_force && !request.format_sort.is_empty() {
        args.push("--format-sort-force".into());
    }
    if request.no_check_certificate {
        args.push("--no-check-certificates".into());
    }

    for flag in [
        "--no-playlist",
        "--no-color",
        "--no-progress",
        "--dump-single-json",
        "--no-simulate",
    ] {
        args.push(flag.into());
    }

    args.push("--".into());
    args.push(request.url.clone().into());
    args
}

/// Pick the most useful line out of the collaborator's stderr
fn failure_message(stderr: &str, exit_code: Option<i32>) -> String {
    let lines: Vec<&str> = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    if let Some(line) = lines.iter().rev().find(|l| l.starts_with("ERROR:")) {
        return line.to_string();
    }
    if let Some(line) = lines.last() {
        return line.to_string();
    }
    match exit_code {
        Some(code) => format!("{BINARY_NAME} exited with status {code}"),
        None => format!("{BINARY_NAME} was terminated by a signal"),
    }
}

/// Read the title out of the JSON info dict
fn parse_info(stdout: &[u8]) -> Result<ExtractionInfo, ExtractorError> {
    // the info dict is the last non-empty line; anything before it is noise
    let text = String::from_utf8_lossy(stdout);
    let Some(document) = text.lines().rev().find(|l| !l.trim().is_empty()) else {
        return Err(ExtractorError::InvalidOutput("no metadata printed".into()));
    };

    let value: serde_json::Value = serde_json::from_str(document)
        .map_err(|e| ExtractorError::InvalidOutput(e.to_string()))?;

    let title = value
        .get("title")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .unwrap_or(UNKNOWN_TITLE);

    Ok(ExtractionInfo {
        title: title.to_string(),
    })
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionInfo, ExtractorError> {
        tracing::debug!(
            binary = %self.binary_path.display(),
            url = %request.url,
            output = %request.output_base.display(),
            "Running extractor"
        );

        let output = Command::new(&self.binary_path)
            .args(build_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ExtractorError::Spawn {
                binary: self.binary_path.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code();
            return Err(ExtractorError::Failed {
                message: failure_message(&stderr, exit_code),
                exit_code,
            });
        }

        match parse_info(&output.stdout) {
            Ok(info) => Ok(info),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "Extractor metadata unreadable, using default title");
                Ok(ExtractionInfo::default())
            }
        }
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
