//! The per-game action execution engine: executor, mutation processor,
//! and the timer-expiration listener.

pub mod executor;
pub mod expiry;
pub mod mutation;

pub use executor::ActionExecutor;
pub use mutation::{DataMutation, MutationProcessor};
