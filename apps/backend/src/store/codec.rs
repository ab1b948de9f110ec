//! Codec between the game aggregate and its store hash.
//!
//! The hash keeps three fields so partial reads stay possible: `meta`
//! (identity, pause flag, lifecycle timestamps), `players`, and
//! `state`. Encoding then decoding must reproduce an identical game.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::game::{Game, GameId, Player};
use crate::domain::state::GameState;
use crate::domain::timer::Timer;
use crate::error::AppError;

pub const FIELD_META: &str = "meta";
pub const FIELD_PLAYERS: &str = "players";
pub const FIELD_STATE: &str = "state";

#[derive(Debug, Serialize, Deserialize)]
struct GameMeta {
    id: GameId,
    paused: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    finished_at: Option<OffsetDateTime>,
}

/// Encode a game into its hash fields.
pub fn game_to_fields(game: &Game) -> Result<Vec<(&'static str, String)>, AppError> {
    let meta = GameMeta {
        id: game.id.clone(),
        paused: game.paused,
        started_at: game.started_at,
        finished_at: game.finished_at,
    };
    Ok(vec![
        (FIELD_META, serde_json::to_string(&meta)?),
        (FIELD_PLAYERS, serde_json::to_string(&game.players)?),
        (FIELD_STATE, serde_json::to_string(&game.state)?),
    ])
}

/// Decode a game from a full hash read. `None` when the hash is empty
/// (missing game); a present-but-malformed hash is data corruption.
pub fn game_from_hash(hash: &HashMap<String, String>) -> Result<Option<Game>, AppError> {
    if hash.is_empty() {
        return Ok(None);
    }

    let meta_raw = hash
        .get(FIELD_META)
        .ok_or_else(|| AppError::data_corruption("game hash is missing the meta field"))?;
    let players_raw = hash
        .get(FIELD_PLAYERS)
        .ok_or_else(|| AppError::data_corruption("game hash is missing the players field"))?;
    let state_raw = hash
        .get(FIELD_STATE)
        .ok_or_else(|| AppError::data_corruption("game hash is missing the state field"))?;

    let meta: GameMeta = serde_json::from_str(meta_raw)?;
    let players: Vec<Player> = serde_json::from_str(players_raw)?;
    let state: GameState = serde_json::from_str(state_raw)?;

    Ok(Some(Game {
        id: meta.id,
        players,
        state,
        paused: meta.paused,
        started_at: meta.started_at,
        finished_at: meta.finished_at,
    }))
}

pub fn timer_to_value(timer: &Timer) -> Result<String, AppError> {
    Ok(serde_json::to_string(timer)?)
}

pub fn timer_from_value(raw: &str) -> Result<Timer, AppError> {
    Ok(serde_json::from_str(raw)?)
}
