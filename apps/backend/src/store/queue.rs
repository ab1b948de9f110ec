//! Per-game action queue.
//!
//! When the lock is contended, actions are appended here and drained
//! FIFO by whichever execution currently (or next) holds the lock —
//! never by polling.

use redis::aio::ConnectionManager;

use crate::actions::ActionEnvelope;
use crate::error::AppError;
use crate::store::keys;

/// Append a contended action. Returns the queue length after the push.
pub async fn push(
    conn: &mut ConnectionManager,
    game_id: &str,
    envelope: &ActionEnvelope,
    queue_ttl_ms: u64,
) -> Result<i64, AppError> {
    let key = keys::queue(game_id);
    let encoded = serde_json::to_string(envelope)?;
    let (len,): (i64,) = redis::pipe()
        .atomic()
        .cmd("RPUSH")
        .arg(&key)
        .arg(encoded)
        .cmd("PEXPIRE")
        .arg(&key)
        .arg(queue_ttl_ms)
        .ignore()
        .query_async(conn)
        .await?;
    Ok(len)
}

/// Current queue depth.
pub async fn len(conn: &mut ConnectionManager, game_id: &str) -> Result<i64, AppError> {
    Ok(redis::cmd("LLEN")
        .arg(keys::queue(game_id))
        .query_async(conn)
        .await?)
}

/// Pop the next queued action, if any. A malformed entry is dropped
/// with an error so one poisoned envelope cannot wedge the queue.
pub async fn pop(
    conn: &mut ConnectionManager,
    game_id: &str,
) -> Result<Option<ActionEnvelope>, AppError> {
    let raw: Option<String> = redis::cmd("LPOP")
        .arg(keys::queue(game_id))
        .query_async(conn)
        .await?;
    match raw {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}
