//! Shared test helpers: a scripted extractor and coordinator builders.

use crate::config::{Config, RetryConfig};
use crate::coordinator::FetchCoordinator;
use crate::error::ExtractorError;
use crate::extractor::{ExtractionInfo, ExtractionRequest, Extractor};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use tokio::sync::Notify;

/// What the fake extractor does on one call
#[derive(Clone, Debug)]
pub(crate) enum Step {
    /// Write a valid `.mp4` and report the title
    Media(String),
    /// Write an `.mp4` at the validity threshold
    TinyMedia,
    /// Write an `.mhtml` snapshot
    Placeholder,
    /// Return successfully without writing anything
    Nothing,
    /// Return an error with this message
    Fail(String),
    /// Wait for the gate, then perform the inner step
    Gated(Arc<Notify>, Box<Step>),
}

impl Step {
    pub(crate) fn media(title: &str) -> Self {
        Step::Media(title.to_string())
    }

    pub(crate) fn fail(message: &str) -> Self {
        Step::Fail(message.to_string())
    }

    pub(crate) fn gated(gate: &Arc<Notify>, then: Step) -> Self {
        Step::Gated(gate.clone(), Box::new(then))
    }
}

/// Extractor that follows a script; the last step repeats once the script runs out
pub(crate) struct FakeExtractor {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    cookies: Mutex<Vec<Option<PathBuf>>>,
}

impl FakeExtractor {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
            cookies: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn cookies_seen(&self) -> Vec<Option<PathBuf>> {
        self.cookies.lock().unwrap().clone()
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.pop_front().unwrap()
        } else {
            steps.front().cloned().unwrap_or(Step::Nothing)
        }
    }
}

fn write(base: &Path, ext: &str, len: usize) {
    let mut name = base.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    std::fs::write(PathBuf::from(name), vec![7u8; len]).unwrap();
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionInfo, ExtractorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cookies
            .lock()
            .unwrap()
            .push(request.cookies_file.clone());

        let mut step = self.next_step();
        let step = loop {
            match step {
                Step::Gated(gate, then) => {
                    gate.notified().await;
                    step = *then;
                }
                other => break other,
            }
        };

        match step {
            Step::Media(title) => {
                write(&request.output_base, "mp4", 4096);
                Ok(ExtractionInfo { title })
            }
            Step::TinyMedia => {
                write(&request.output_base, "mp4", 1000);
                Ok(ExtractionInfo::default())
            }
            Step::Placeholder => {
                write(&request.output_base, "mhtml", 2048);
                Ok(ExtractionInfo::default())
            }
            Step::Nothing => Ok(ExtractionInfo::default()),
            Step::Fail(message) => Err(ExtractorError::Failed {
                message,
                exit_code: Some(1),
            }),
            Step::Gated(..) => unreachable!("gates are unwrapped above"),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Config rooted in a fresh temp dir with no retry delays
pub(crate) fn test_config(max_attempts: u32) -> (Config, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = Config::default();
    config.fetch.scratch_dir = temp_dir.path().join("scratch");
    config.fetch.cookies_file = None;
    config.retry = RetryConfig::immediate(max_attempts);
    (config, temp_dir)
}

/// Coordinator over a scripted extractor; the tempdir must be kept alive
pub(crate) fn create_test_coordinator(
    steps: Vec<Step>,
    max_attempts: u32,
) -> (FetchCoordinator, Arc<FakeExtractor>, Config, tempfile::TempDir) {
    let (config, temp_dir) = test_config(max_attempts);
    let fake = Arc::new(FakeExtractor::new(steps));
    let coordinator = FetchCoordinator::new(&config, fake.clone());
    (coordinator, fake, config, temp_dir)
}

/// Number of entries left in the scratch directory
pub(crate) fn scratch_entries(config: &Config) -> usize {
    match std::fs::read_dir(&config.fetch.scratch_dir) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

/// Wait until `dir` holds exactly `expected` entries
///
/// Scratch removal runs on the blocking pool, so it lands shortly after the drop.
pub(crate) async fn wait_for_entries(dir: &Path, expected: usize) {
    let count = || std::fs::read_dir(dir).map(|e| e.count()).unwrap_or(0);
    let waited = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while count() != expected {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(
        waited.is_ok(),
        "{} holds {} entries, expected {expected}",
        dir.display(),
        count()
    );
}

/// Wait until every scratch directory has been removed
pub(crate) async fn wait_for_scratch_cleanup(config: &Config) {
    wait_for_entries(&config.fetch.scratch_dir, 0).await;
}
