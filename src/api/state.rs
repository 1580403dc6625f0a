//! Application state for the API server

use crate::{Config, FetchCoordinator};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; both fields are reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// Single-flight coordinator owning the in-flight registry
    pub coordinator: FetchCoordinator,

    /// Configuration (read-only at runtime)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(coordinator: FetchCoordinator, config: Arc<Config>) -> Self {
        Self {
            coordinator,
            config,
        }
    }
}
