//! Read-only view over the in-flight registry

use crate::coordinator::InFlightRegistry;
use crate::types::{InFlightEntry, StatusSnapshot};

/// Reports which fetches are in progress
#[derive(Debug, Clone)]
pub struct StatusReporter {
    registry: InFlightRegistry,
}

impl StatusReporter {
    /// Create a reporter over `registry`
    pub fn new(registry: InFlightRegistry) -> Self {
        Self { registry }
    }

    /// Count and keys of active fetches, oldest first
    pub fn snapshot(&self) -> StatusSnapshot {
        let entries = self.registry.snapshot();
        StatusSnapshot {
            active_downloads: entries.len(),
            active_urls: entries.into_iter().map(|e| e.key.to_string()).collect(),
        }
    }

    /// Full entries including admission time
    pub fn entries(&self) -> Vec<InFlightEntry> {
        self.registry.snapshot()
    }
}
