//! Player-stats collaborator.
//!
//! Invoked only via declared mutations, strictly best-effort: a failure
//! here is logged and never rolls back a game save.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::domain::game::{GameId, PlayerId};
use crate::error::AppError;

#[async_trait]
pub trait PlayerStatsService: Send + Sync {
    /// Record the start of a player's session in a game.
    async fn initialize_player_session(
        &self,
        player_id: PlayerId,
        game_id: &GameId,
        at: OffsetDateTime,
    ) -> Result<(), AppError>;

    /// Clear a player's "left at" marker after a rejoin.
    async fn clear_player_left_at_time(&self, player_id: PlayerId) -> Result<(), AppError>;
}

/// Default wiring when no stats backend is configured.
pub struct NoopPlayerStats;

#[async_trait]
impl PlayerStatsService for NoopPlayerStats {
    async fn initialize_player_session(
        &self,
        _player_id: PlayerId,
        _game_id: &GameId,
        _at: OffsetDateTime,
    ) -> Result<(), AppError> {
        Ok(())
    }

    async fn clear_player_left_at_time(&self, _player_id: PlayerId) -> Result<(), AppError> {
        Ok(())
    }
}
