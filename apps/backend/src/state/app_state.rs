use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::ActionExecutor;

/// Application state containing shared engine resources.
#[derive(Clone)]
pub struct AppState {
    /// The per-game action execution engine.
    pub executor: Arc<ActionExecutor>,
    /// Resolved engine tunables.
    pub config: Arc<EngineConfig>,
    /// Store URL the engine was built against; the expiry listener
    /// opens its own subscription connection from it.
    pub store_url: String,
}

impl AppState {
    pub fn new(
        executor: Arc<ActionExecutor>,
        config: Arc<EngineConfig>,
        store_url: String,
    ) -> Self {
        Self {
            executor,
            config,
            store_url,
        }
    }
}
