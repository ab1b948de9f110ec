//! The two fixed, batched store round trips.
//!
//! IN: lock conditional-set + game read + TTL renewal + timer read +
//! session read, as one atomic MULTI/EXEC. OUT: game save + TTL
//! refreshes + timer writes + queue length, likewise one round trip.
//!
//! The IN pipeline derives the session key from a runtime value, which
//! pins it to a single-node store; a clustered deployment needs key
//! co-location or a split read (see DESIGN.md).

use std::collections::HashMap;

use redis::aio::ConnectionManager;

use crate::config::EngineConfig;
use crate::domain::game::Game;
use crate::domain::timer::Timer;
use crate::error::AppError;
use crate::store::codec;
use crate::store::keys;
use crate::store::lock::LockToken;
use crate::store::session::SocketSession;

/// Everything the executor needs before dispatching a handler.
#[derive(Debug)]
pub struct Prefetch {
    pub lock_acquired: bool,
    pub game: Option<Game>,
    pub timer: Option<Timer>,
    pub session: Option<SocketSession>,
}

/// One round trip: try to take the lock and read game, timer, and
/// session state. The game read is speculative — it is discarded by the
/// caller when the conditional-set failed.
pub async fn run_in_pipeline(
    conn: &mut ConnectionManager,
    config: &EngineConfig,
    game_id: &str,
    socket_id: &str,
    token: &LockToken,
) -> Result<Prefetch, AppError> {
    let game_key = keys::game(game_id);
    let timer_keys = keys::all_timers(game_id);

    let mut pipe = redis::pipe();
    pipe.atomic();
    pipe.cmd("SET")
        .arg(keys::lock(game_id))
        .arg(token.as_str())
        .arg("NX")
        .arg("PX")
        .arg(config.lock_ttl_ms);
    pipe.cmd("HGETALL").arg(&game_key);
    pipe.cmd("PEXPIRE").arg(&game_key).arg(config.game_ttl_ms).ignore();
    pipe.cmd("MGET").arg(&timer_keys);
    pipe.cmd("HGETALL").arg(keys::session(socket_id));

    let (lock_reply, game_hash, timer_values, session_hash): (
        Option<String>,
        HashMap<String, String>,
        Vec<Option<String>>,
        HashMap<String, String>,
    ) = pipe.query_async(conn).await?;

    let timer = timer_values
        .iter()
        .flatten()
        .next()
        .map(|raw| codec::timer_from_value(raw))
        .transpose()?;

    Ok(Prefetch {
        lock_acquired: lock_reply.is_some(),
        game: codec::game_from_hash(&game_hash)?,
        timer,
        session: SocketSession::from_hash(&session_hash)?,
    })
}

/// Declarative description of the OUT batch.
#[derive(Debug, Default)]
pub struct OutBatch<'a> {
    /// Write the full game hash and refresh its TTL and the package's.
    pub save_game: Option<&'a Game>,
    /// Timers to (re)create; any pre-existing timer is dropped first.
    pub timer_sets: Vec<&'a Timer>,
    /// Drop the active timer without replacement.
    pub timer_delete: bool,
}

/// One round trip: apply the batch and read the per-game queue length
/// (the executor's drain signal).
pub async fn run_out_pipeline(
    conn: &mut ConnectionManager,
    config: &EngineConfig,
    game_id: &str,
    batch: OutBatch<'_>,
) -> Result<i64, AppError> {
    let game_key = keys::game(game_id);

    let mut pipe = redis::pipe();
    pipe.atomic();

    if let Some(game) = batch.save_game {
        for (field, value) in codec::game_to_fields(game)? {
            pipe.cmd("HSET").arg(&game_key).arg(field).arg(value).ignore();
        }
        pipe.cmd("PEXPIRE").arg(&game_key).arg(config.game_ttl_ms).ignore();
        pipe.cmd("PEXPIRE")
            .arg(keys::package(game_id))
            .arg(config.game_ttl_ms)
            .ignore();
    }

    if batch.timer_delete || !batch.timer_sets.is_empty() {
        pipe.cmd("DEL");
        for key in keys::all_timers(game_id) {
            pipe.arg(key);
        }
        pipe.ignore();
    }

    for timer in &batch.timer_sets {
        let remaining = timer
            .duration_ms
            .saturating_sub(timer.elapsed_ms)
            .max(1);
        pipe.cmd("SET")
            .arg(keys::timer(game_id, timer.kind))
            .arg(codec::timer_to_value(timer)?)
            .arg("PX")
            .arg(remaining)
            .ignore();
    }

    pipe.cmd("LLEN").arg(keys::queue(game_id));

    let (queue_len,): (i64,) = pipe.query_async(conn).await?;
    Ok(queue_len)
}

/// Wind a finished game down: keep its record readable for a linger
/// period, then let expiry purge everything.
pub async fn expire_finished_game(
    conn: &mut ConnectionManager,
    config: &EngineConfig,
    game_id: &str,
) -> Result<(), AppError> {
    let mut pipe = redis::pipe();
    pipe.atomic();
    pipe.cmd("PEXPIRE")
        .arg(keys::game(game_id))
        .arg(config.finished_linger_ms)
        .ignore();
    pipe.cmd("PEXPIRE")
        .arg(keys::package(game_id))
        .arg(config.finished_linger_ms)
        .ignore();
    pipe.cmd("DEL");
    for key in keys::all_timers(game_id) {
        pipe.arg(key);
    }
    pipe.ignore();
    pipe.cmd("DEL").arg(keys::queue(game_id)).ignore();
    pipe.query_async::<()>(conn).await?;
    Ok(())
}
