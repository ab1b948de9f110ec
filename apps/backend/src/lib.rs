#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod actions;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod errors;
pub mod infra;
pub mod services;
pub mod state;
pub mod store;

#[cfg(test)]
pub mod test_bootstrap;

// Re-exports for public API
pub use actions::{ActionEnvelope, ActionResult, ActionType};
pub use config::EngineConfig;
pub use engine::{ActionExecutor, DataMutation};
pub use error::AppError;
pub use errors::ErrorCode;
pub use infra::state::build_engine;
pub use state::app_state::AppState;

// Prelude for test convenience
pub mod prelude {
    pub use super::actions::*;
    pub use super::config::*;
    pub use super::engine::*;
    pub use super::error::*;
    pub use super::state::*;
}

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    test_bootstrap::logging::init();
}
