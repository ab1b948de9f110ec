//! Composition root.
//!
//! Explicit, ordered construction: leaf collaborators are built first
//! (config, store connection, broadcast, stats), then injected by
//! reference into each component's constructor. No container, no
//! implicit registration; a missing handler fails the build here.

use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::Client;

use crate::actions::registry::HandlerRegistry;
use crate::config::{self, EngineConfig};
use crate::engine::{ActionExecutor, MutationProcessor};
use crate::error::AppError;
use crate::services::broadcast::BroadcastService;
use crate::services::stats::{NoopPlayerStats, PlayerStatsService};
use crate::state::app_state::AppState;

/// Builder for creating engine instances (used in both tests and main).
pub struct EngineBuilder {
    store_url: Option<String>,
    config: Option<EngineConfig>,
    stats: Option<Arc<dyn PlayerStatsService>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            store_url: None,
            config: None,
            stats: None,
        }
    }

    pub fn with_store_url(mut self, url: impl Into<String>) -> Self {
        self.store_url = Some(url.into());
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_stats(mut self, stats: Arc<dyn PlayerStatsService>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub async fn build(self) -> Result<AppState, AppError> {
        let config = Arc::new(match self.config {
            Some(config) => config,
            None => EngineConfig::from_env()?,
        });
        let store_url = self.store_url.unwrap_or_else(config::store_url);

        let client = Client::open(store_url.as_str())
            .map_err(|err| AppError::config(format!("invalid STORE_URL: {err}")))?;
        let conn: ConnectionManager = ConnectionManager::new(client).await?;

        let broadcast = BroadcastService::new(conn.clone());
        let stats: Arc<dyn PlayerStatsService> = self
            .stats
            .unwrap_or_else(|| Arc::new(NoopPlayerStats));

        let registry = Arc::new(HandlerRegistry::build());
        registry.verify_total()?;

        let processor = MutationProcessor::new(config.clone(), broadcast.clone(), stats);
        let executor = Arc::new(ActionExecutor::new(
            conn,
            config.clone(),
            registry,
            processor,
            broadcast,
        ));

        Ok(AppState::new(executor, config, store_url))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_engine() -> EngineBuilder {
    EngineBuilder::new()
}
