//! Action executor: the engine's entry point.
//!
//! One call = one action against one game: acquire the per-game lock
//! and prefetch in a single round trip, dispatch the handler, hand the
//! declared mutations to the processor, release the lock (always), and
//! drain the contention queue while it has entries. Serialization per
//! game is pessimistic first (the lock) and cooperative on contention
//! (the FIFO queue) — never polled.

use std::sync::Arc;

use redis::aio::ConnectionManager;
use time::OffsetDateTime;
use tracing::{debug, error, warn};

use crate::actions::registry::HandlerRegistry;
use crate::actions::{ActionContext, ActionEnvelope, ActionResult};
use crate::config::EngineConfig;
use crate::domain::game::Game;
use crate::engine::mutation::{classify, MutationProcessor};
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::services::broadcast::{BroadcastEvent, BroadcastScope, BroadcastService, EventPayload};
use crate::store::lock::{self, LockToken};
use crate::store::pipeline;
use crate::store::{package_store, queue};

pub struct ActionExecutor {
    conn: ConnectionManager,
    config: Arc<EngineConfig>,
    registry: Arc<HandlerRegistry>,
    processor: MutationProcessor,
    broadcast: Arc<BroadcastService>,
}

impl ActionExecutor {
    pub fn new(
        conn: ConnectionManager,
        config: Arc<EngineConfig>,
        registry: Arc<HandlerRegistry>,
        processor: MutationProcessor,
        broadcast: Arc<BroadcastService>,
    ) -> Self {
        Self {
            conn,
            config,
            registry,
            processor,
            broadcast,
        }
    }

    /// Execute one action; when the processor reports queued
    /// follow-ups, pop and execute them before returning — one extra
    /// round trip per queued item instead of a poll interval. The
    /// returned result describes the caller's own action.
    pub async fn execute(&self, envelope: ActionEnvelope) -> Result<ActionResult, AppError> {
        let game_id = envelope.game_id.clone();
        let (first, mut queue_len) = self.execute_one(&envelope).await?;

        // Each drained item re-acquires the lock itself; a failed
        // drain step is logged and left for the next lock holder.
        while queue_len > 0 {
            let mut conn = self.conn.clone();
            let queued = match queue::pop(&mut conn, &game_id).await {
                Ok(Some(envelope)) => envelope,
                Ok(None) => break,
                Err(err) => {
                    warn!(game_id = %game_id, error = %err, "queue pop failed");
                    break;
                }
            };
            match self.execute_one(&queued).await {
                // A Queued result means another execution took the
                // lock meanwhile; it owns the drain now.
                Ok((ActionResult::Queued, _)) => break,
                Ok((_, remaining)) => queue_len = remaining,
                Err(err) => {
                    warn!(game_id = %game_id, error = %err, "queued action failed during drain");
                    break;
                }
            }
        }

        Ok(first)
    }

    /// One locked execution attempt. Returns the action's result plus
    /// the observed queue length for the drain decision.
    async fn execute_one(
        &self,
        envelope: &ActionEnvelope,
    ) -> Result<(ActionResult, i64), AppError> {
        let mut conn = self.conn.clone();
        let game_id = envelope.game_id.as_str();
        let token = LockToken::fresh();

        let prefetch = pipeline::run_in_pipeline(
            &mut conn,
            &self.config,
            game_id,
            &envelope.socket_id,
            &token,
        )
        .await?;

        if !prefetch.lock_acquired {
            // Contention is not an error: the action waits its turn.
            queue::push(&mut conn, game_id, envelope, self.config.game_ttl_ms).await?;
            debug!(game_id, action = ?envelope.action_type, "game locked, action queued");
            return Ok((ActionResult::Queued, 0));
        }

        let outcome = self.run_locked(&mut conn, envelope, prefetch).await;

        // The lock is released with the held token only, success or
        // not. A token the TTL already reclaimed is logged and let go.
        match lock::release(&mut conn, game_id, &token).await {
            Ok(true) => {}
            Ok(false) => warn!(game_id, "lock expired before release"),
            Err(err) => warn!(game_id, error = %err, "lock release failed"),
        }

        match outcome {
            Ok(result) => Ok(result),
            Err(err) => {
                if err.is_client_error() {
                    debug!(game_id, action = ?envelope.action_type, error = %err, "action rejected");
                } else {
                    error!(
                        game_id,
                        action = ?envelope.action_type,
                        error = %err,
                        "action failed with a server error; state not persisted"
                    );
                }
                self.emit_failure(envelope, &err).await;
                let queue_len = queue::len(&mut conn, game_id).await.unwrap_or(0);
                Ok((
                    ActionResult::Completed {
                        success: false,
                        data: None,
                        error: Some(err.to_body()),
                    },
                    queue_len,
                ))
            }
        }
    }

    async fn run_locked(
        &self,
        conn: &mut ConnectionManager,
        envelope: &ActionEnvelope,
        prefetch: pipeline::Prefetch,
    ) -> Result<(ActionResult, i64), AppError> {
        let game_id = envelope.game_id.as_str();

        // No action proceeds against a nonexistent game.
        let game: Game = prefetch.game.ok_or_else(|| {
            AppError::not_found(ErrorCode::GameNotFound, format!("game {game_id} not found"))
        })?;

        let package = package_store::load(conn, game_id).await?.ok_or_else(|| {
            AppError::data_corruption(format!("game {game_id} has no package"))
        })?;

        let current_player_id = prefetch
            .session
            .as_ref()
            .filter(|s| s.game_id == game_id)
            .map(|s| s.user_id);

        let prefetched_game = game.clone();
        let mut ctx = ActionContext {
            game,
            current_player_id,
            timer: prefetch.timer,
            payload: envelope.payload.clone(),
            package: &package,
            config: &self.config,
            now: OffsetDateTime::now_utc(),
            socket_id: envelope.socket_id.clone(),
        };

        let handler = self.registry.get(envelope.action_type)?;
        let outcome = handler.handle(&mut ctx)?;

        let classified = classify(outcome.mutations);
        // A game about to be persisted must satisfy the sub-state
        // invariant; a violating handler is a server bug and its
        // effects never reach the store.
        if let Some(saved) = &classified.save_game {
            saved.state.check_special_invariant().map_err(AppError::from)?;
        }
        let report = self
            .processor
            .process(
                conn,
                game_id,
                classified,
                outcome.success,
                outcome.broadcast_game,
                &prefetched_game,
            )
            .await?;

        debug!(
            game_id,
            action = ?envelope.action_type,
            success = outcome.success,
            queue_len = report.queue_len,
            "action applied"
        );

        Ok((
            ActionResult::Completed {
                success: outcome.success,
                data: outcome.response,
                error: None,
            },
            report.queue_len,
        ))
    }

    /// One structured error event per failed action, addressed to the
    /// originating socket only. Timer expirations have no caller.
    async fn emit_failure(&self, envelope: &ActionEnvelope, err: &AppError) {
        if envelope.action_type.is_timer_expiration() {
            return;
        }
        let event = BroadcastEvent {
            scope: BroadcastScope::Socket(envelope.socket_id.clone()),
            payload: EventPayload::ActionFailed {
                error: err.to_body(),
            },
        };
        if let Err(publish_err) = self.broadcast.publish(&envelope.game_id, &event).await {
            warn!(game_id = %envelope.game_id, error = %publish_err, "failure event publish failed");
        }
    }
}
