//! Application state for the Contribution Engine API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::batch::BatchRecomputeOrchestrator;

/// Shared application state.
///
/// Holds the orchestrator and a lock that lets one recompute write to the
/// result store at a time.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<BatchRecomputeOrchestrator>,
    recompute_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Creates a new application state around an orchestrator.
    pub fn new(orchestrator: BatchRecomputeOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            recompute_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the orchestrator.
    pub fn orchestrator(&self) -> &Arc<BatchRecomputeOrchestrator> {
        &self.orchestrator
    }

    /// Returns the recompute lock.
    pub fn recompute_lock(&self) -> &Arc<Mutex<()>> {
        &self.recompute_lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState>();
    }
}
