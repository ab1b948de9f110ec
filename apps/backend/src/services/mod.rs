//! Engine-side services: the broadcast edge and best-effort collaborators.

pub mod broadcast;
pub mod stats;

pub use broadcast::{BroadcastEvent, BroadcastScope, BroadcastService, EventPayload};
pub use stats::{NoopPlayerStats, PlayerStatsService};
