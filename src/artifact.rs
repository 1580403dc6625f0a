//! Scratch file lifecycle for fetched media
//!
//! Every fetch attempt gets a [`ScratchPath`]: a uniquely named directory under
//! the scratch root. The extractor writes `<base>.<ext>` inside it and may leave
//! partial or fragment files next to the media file. Dropping the `ScratchPath`
//! (directly or through the [`Artifact`] that owns it) removes the directory, so
//! cleanup runs on success, on error, and when a delivery is abandoned
//! mid-stream. Inside a tokio runtime the removal runs on the blocking pool.

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::types::MediaKind;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const SCRATCH_PREFIX: &str = "media-fetch-";
const SCRATCH_RANDOM_LEN: usize = 12;
const MEDIA_STEM: &str = "media";

#[derive(Debug)]
struct StoreSettings {
    scratch_dir: PathBuf,
    media_extensions: Vec<String>,
    placeholder_extensions: Vec<String>,
    min_valid_size: u64,
}

/// Allocates, probes, and releases scratch directories
///
/// Cheap to clone; clones share the same settings.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    settings: Arc<StoreSettings>,
}

impl ArtifactStore {
    /// Create a store from fetch settings
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            settings: Arc::new(StoreSettings {
                scratch_dir: config.scratch_dir.clone(),
                media_extensions: config.media_extensions.clone(),
                placeholder_extensions: config.placeholder_extensions.clone(),
                min_valid_size: config.min_valid_size,
            }),
        }
    }

    /// Reserve a unique scratch directory for one attempt
    ///
    /// The directory is created with exclusive-create semantics, so no two
    /// concurrent allocations can share it. The media file is not created here;
    /// the extractor picks its extension.
    pub async fn allocate(&self) -> Result<ScratchPath> {
        let dir = self.settings.scratch_dir.clone();
        tokio::task::spawn_blocking(move || allocate_in(&dir))
            .await
            .map_err(|e| Error::Storage {
                path: self.settings.scratch_dir.clone(),
                reason: format!("scratch allocation task failed: {e}"),
            })?
    }

    /// Find the media file the extractor produced for `scratch`
    ///
    /// Probes the accepted media extensions in order and returns the first
    /// regular file whose size exceeds the validity threshold. Falls back to
    /// reporting a webpage snapshot if one exists.
    pub async fn locate(&self, scratch: &ScratchPath) -> std::result::Result<LocatedMedia, LocateError> {
        let settings = &self.settings;

        for ext in &settings.media_extensions {
            let candidate = scratch.with_extension(ext);
            match tokio::fs::metadata(&candidate).await {
                Ok(meta) if meta.is_file() && meta.len() > settings.min_valid_size => {
                    return Ok(LocatedMedia {
                        path: candidate,
                        size_bytes: meta.len(),
                        media_kind: MediaKind::Video,
                    });
                }
                Ok(meta) if meta.is_file() => {
                    tracing::warn!(
                        path = %candidate.display(),
                        size = meta.len(),
                        min_valid_size = settings.min_valid_size,
                        "Ignoring undersized media file"
                    );
                }
                _ => {}
            }
        }

        for ext in &settings.placeholder_extensions {
            let candidate = scratch.with_extension(ext);
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Err(LocateError::Placeholder(candidate));
            }
        }

        Err(LocateError::NotFound)
    }

    /// Release a scratch directory and everything in it
    ///
    /// Same as dropping the guard. Removal errors are logged, never returned.
    pub fn release(&self, scratch: ScratchPath) {
        drop(scratch);
    }
}

fn allocate_in(root: &Path) -> Result<ScratchPath> {
    std::fs::create_dir_all(root).map_err(|e| Error::Storage {
        path: root.to_path_buf(),
        reason: format!("failed to create scratch directory: {e}"),
    })?;

    let dir = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .rand_bytes(SCRATCH_RANDOM_LEN)
        .tempdir_in(root)
        .map_err(|e| Error::Storage {
            path: root.to_path_buf(),
            reason: format!("failed to allocate scratch directory: {e}"),
        })?;

    let base = dir.path().join(MEDIA_STEM);
    tracing::debug!(path = %dir.path().display(), "Allocated scratch directory");
    Ok(ScratchPath {
        dir: Some(dir),
        base,
    })
}

/// Result of a successful [`ArtifactStore::locate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedMedia {
    /// The media file
    pub path: PathBuf,
    /// Size on disk
    pub size_bytes: u64,
    /// Classification from the extension
    pub media_kind: MediaKind,
}

/// Why no usable media file was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    /// No accepted media file above the size threshold exists
    NotFound,
    /// Only a webpage snapshot was produced
    Placeholder(PathBuf),
}

/// Guard over one attempt's scratch directory
///
/// Removes the directory and everything in it when dropped.
#[derive(Debug)]
pub struct ScratchPath {
    dir: Option<TempDir>,
    base: PathBuf,
}

impl ScratchPath {
    /// Output base the extractor appends `.<ext>` to
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// `<base>.<ext>`
    pub fn with_extension(&self, ext: &str) -> PathBuf {
        let mut name = OsString::from(self.base.as_os_str());
        name.push(".");
        name.push(ext);
        PathBuf::from(name)
    }
}

impl Drop for ScratchPath {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || remove_scratch_dir(dir));
            }
            Err(_) => remove_scratch_dir(dir),
        }
    }
}

/// Failures are logged only
fn remove_scratch_dir(dir: TempDir) {
    let path = dir.path().to_path_buf();
    match dir.close() {
        Ok(()) => tracing::info!(path = %path.display(), "Cleaned up scratch directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Error cleaning up scratch directory")
        }
    }
}

/// A validated media file ready for delivery
///
/// Owns its scratch guard: dropping the artifact deletes the file.
#[derive(Debug)]
pub struct Artifact {
    /// The media file
    pub path: PathBuf,
    /// Size on disk at the time it was located
    pub size_bytes: u64,
    /// Title reported by the extractor
    pub title: String,
    /// Classification of the file
    pub media_kind: MediaKind,
    _scratch: ScratchPath,
}

impl Artifact {
    /// Bind a located file and its title to the scratch guard that produced it
    pub fn new(scratch: ScratchPath, located: LocatedMedia, title: impl Into<String>) -> Self {
        Self {
            path: located.path,
            size_bytes: located.size_bytes,
            title: title.into(),
            media_kind: located.media_kind,
            _scratch: scratch,
        }
    }
}
