//! Assertions over registry and scratch directory state

use media_fetch::{Config, FetchCoordinator};
use std::time::Duration;

/// Files left in the scratch directory
pub fn scratch_file_count(config: &Config) -> usize {
    std::fs::read_dir(&config.fetch.scratch_dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}

/// Wait until no fetch holds a reservation
pub async fn wait_until_idle(coordinator: &FetchCoordinator, timeout: Duration) {
    tokio::time::timeout(timeout, async {
        while !coordinator.registry().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("registry did not drain in time");
}

/// Wait until the scratch directory is empty
pub async fn wait_until_scratch_empty(config: &Config, timeout: Duration) {
    tokio::time::timeout(timeout, async {
        while scratch_file_count(config) > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("scratch files were not cleaned up in time");
}

/// Wait until the extractor has been called at least `calls` times
pub async fn wait_for_calls(extractor: &super::ScriptedExtractor, calls: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while extractor.calls() < calls {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("extractor was not called in time");
}
