//! Scripted extractor and coordinator setup for integration tests

use async_trait::async_trait;
use media_fetch::config::RetryConfig;
use media_fetch::{
    Config, ExtractionInfo, ExtractionRequest, Extractor, ExtractorError, FetchCoordinator,
};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Semaphore;

/// Size of the media files the scripted extractor writes
pub const MEDIA_SIZE: usize = 64 * 1024;

/// One scripted extractor call
#[derive(Clone, Debug)]
pub enum Script {
    /// Write `<base>.mp4` of `len` bytes and report `title`
    Media { title: String, len: usize },
    /// Write a webpage snapshot
    Snapshot,
    /// Fail with this message
    Fail(String),
    /// Take a permit from the gate, then run the inner step
    Gated(Arc<Semaphore>, Box<Script>),
}

impl Script {
    pub fn media(title: &str) -> Self {
        Script::Media {
            title: title.to_string(),
            len: MEDIA_SIZE,
        }
    }

    pub fn gated(gate: &Arc<Semaphore>, then: Script) -> Self {
        Script::Gated(gate.clone(), Box::new(then))
    }
}

/// Extractor that replays a script; the last entry repeats
pub struct ScriptedExtractor {
    script: Mutex<VecDeque<Script>>,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new(script: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Script {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap_or(Script::Snapshot)
        }
    }
}

fn write_sibling(base: &Path, ext: &str, len: usize) {
    let mut name = base.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    std::fs::write(PathBuf::from(name), vec![0x42u8; len]).unwrap();
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionInfo, ExtractorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut step = self.next();
        let step = loop {
            match step {
                Script::Gated(gate, then) => {
                    if let Ok(permit) = gate.acquire().await {
                        permit.forget();
                    }
                    step = *then;
                }
                other => break other,
            }
        };

        match step {
            Script::Media { title, len } => {
                // leave a partial file behind like the real collaborator does
                write_sibling(&request.output_base, "mp4.part", 16);
                write_sibling(&request.output_base, "mp4", len);
                Ok(ExtractionInfo { title })
            }
            Script::Snapshot => {
                write_sibling(&request.output_base, "mhtml", 2048);
                Ok(ExtractionInfo::default())
            }
            Script::Fail(message) => Err(ExtractorError::Failed {
                message,
                exit_code: Some(1),
            }),
            Script::Gated(..) => unreachable!(),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Config with a private scratch dir and no retry delays
pub fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.fetch.scratch_dir = temp_dir.path().join("scratch");
    config.fetch.cookies_file = None;
    config.retry = RetryConfig::immediate(4);
    config
}

/// A closed gate; open it with `add_permits`
pub fn closed_gate() -> Arc<Semaphore> {
    Arc::new(Semaphore::new(0))
}

/// Coordinator over `extractor`; keep the TempDir alive for the test
pub fn create_coordinator(extractor: Arc<ScriptedExtractor>) -> (FetchCoordinator, Config, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = test_config(&temp_dir);
    let coordinator = FetchCoordinator::new(&config, extractor);
    (coordinator, config, temp_dir)
}
