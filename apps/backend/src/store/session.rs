//! Socket session directory: `socket:session:{socketId}` hashes
//! associating a socket with its user and game.

use std::collections::HashMap;

use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};

use crate::domain::game::{GameId, PlayerId};
use crate::error::AppError;
use crate::store::keys;

const FIELD_USER: &str = "user_id";
const FIELD_GAME: &str = "game_id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketSession {
    pub user_id: PlayerId,
    pub game_id: GameId,
}

impl SocketSession {
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (FIELD_USER, self.user_id.to_string()),
            (FIELD_GAME, self.game_id.clone()),
        ]
    }

    /// Decode from a hash read; `None` for an absent session.
    pub fn from_hash(hash: &HashMap<String, String>) -> Result<Option<Self>, AppError> {
        if hash.is_empty() {
            return Ok(None);
        }
        let user_raw = hash
            .get(FIELD_USER)
            .ok_or_else(|| AppError::data_corruption("socket session is missing user_id"))?;
        let game_id = hash
            .get(FIELD_GAME)
            .ok_or_else(|| AppError::data_corruption("socket session is missing game_id"))?;
        let user_id = user_raw
            .parse::<PlayerId>()
            .map_err(|_| AppError::data_corruption("socket session user_id is not numeric"))?;
        Ok(Some(Self {
            user_id,
            game_id: game_id.clone(),
        }))
    }
}

/// Write or clear a socket's session association. Best-effort path:
/// the caller logs failures and moves on.
pub async fn update_session(
    conn: &mut ConnectionManager,
    socket_id: &str,
    session: Option<&SocketSession>,
) -> Result<(), AppError> {
    let key = keys::session(socket_id);
    match session {
        Some(session) => {
            let mut pipe = redis::pipe();
            pipe.atomic();
            for (field, value) in session.to_fields() {
                pipe.cmd("HSET").arg(&key).arg(field).arg(value).ignore();
            }
            pipe.query_async::<()>(conn).await?;
        }
        None => {
            redis::cmd("DEL").arg(&key).query_async::<()>(conn).await?;
        }
    }
    Ok(())
}
