//! Application state for the HTTP server.

use std::sync::Arc;
use std::time::Duration;

use crate::db::repository::EventRepository;
use crate::services::debounce::Debouncer;
use crate::services::refresh::RefreshController;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Refresh pipeline owning the current view and hotspot snapshot
    pub controller: Arc<RefreshController>,
    /// Coalesces bursts of viewport updates into one refresh
    pub debouncer: Arc<Debouncer>,
}

impl AppState {
    /// Create a new application state around a controller.
    pub fn new(controller: Arc<RefreshController>, debounce: Duration) -> Self {
        Self {
            controller,
            debouncer: Arc::new(Debouncer::new(debounce)),
        }
    }

    pub fn repository(&self) -> &Arc<dyn EventRepository> {
        self.controller.repository()
    }
}
