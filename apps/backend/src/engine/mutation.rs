//! Declared mutations and their processor.
//!
//! Handlers return a list of [`DataMutation`]s; the processor
//! classifies them with a total match over the mutation sum type and
//! applies them in a fixed order with defined failure isolation:
//!
//! 1. OUT pipeline: game save + TTL refreshes + timer writes, one
//!    round trip, plus the queue-length read used for drain decisions.
//! 2. Socket-session updates — best-effort.
//! 3. Player-stat side effects — best-effort.
//! 4. Broadcasts — only on handler success, only after 1–3, so a
//!    client that re-queries on receipt observes the post-write state.
//! 5. Game-completion bookkeeping — last, after clients were notified.

use std::sync::Arc;

use redis::aio::ConnectionManager;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::domain::game::{Game, PlayerId};
use crate::domain::timer::Timer;
use crate::error::AppError;
use crate::services::broadcast::{BroadcastEvent, BroadcastService, EventPayload};
use crate::services::stats::PlayerStatsService;
use crate::store::pipeline::{self, OutBatch};
use crate::store::session::{self, SocketSession};

/// Closed set of side effects a handler may declare. Produced by
/// handlers, consumed exactly once by the processor; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum DataMutation {
    SaveGame(Box<Game>),
    TimerSet(Timer),
    TimerDelete,
    Broadcast(BroadcastEvent),
    GameCompletion { final_scores: Vec<(PlayerId, i64)> },
    UpdateSocketSession {
        socket_id: String,
        session: Option<SocketSession>,
    },
    UpdatePlayerStats(PlayerStatsUpdate),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerStatsUpdate {
    SessionStarted { player_id: PlayerId, at: OffsetDateTime },
    ClearLeftAt { player_id: PlayerId },
}

/// Mutations grouped by application step.
#[derive(Debug, Default)]
pub struct ClassifiedMutations {
    pub save_game: Option<Box<Game>>,
    pub timer_sets: Vec<Timer>,
    pub timer_delete: bool,
    pub broadcasts: Vec<BroadcastEvent>,
    pub completions: Vec<Vec<(PlayerId, i64)>>,
    pub session_updates: Vec<(String, Option<SocketSession>)>,
    pub stat_updates: Vec<PlayerStatsUpdate>,
}

/// Total classification over the mutation sum type.
pub fn classify(mutations: Vec<DataMutation>) -> ClassifiedMutations {
    let mut classified = ClassifiedMutations::default();
    for mutation in mutations {
        match mutation {
            DataMutation::SaveGame(game) => classified.save_game = Some(game),
            DataMutation::TimerSet(timer) => classified.timer_sets.push(timer),
            DataMutation::TimerDelete => classified.timer_delete = true,
            DataMutation::Broadcast(event) => classified.broadcasts.push(event),
            DataMutation::GameCompletion { final_scores } => {
                classified.completions.push(final_scores)
            }
            DataMutation::UpdateSocketSession { socket_id, session } => {
                classified.session_updates.push((socket_id, session))
            }
            DataMutation::UpdatePlayerStats(update) => classified.stat_updates.push(update),
        }
    }
    classified
}

/// Outcome of one processing pass.
#[derive(Debug, Clone, Copy)]
pub struct ProcessReport {
    /// Queue length observed by the OUT pipeline; non-zero means the
    /// executor should drain before returning.
    pub queue_len: i64,
}

pub struct MutationProcessor {
    config: Arc<EngineConfig>,
    broadcast: Arc<BroadcastService>,
    stats: Arc<dyn PlayerStatsService>,
}

impl MutationProcessor {
    pub fn new(
        config: Arc<EngineConfig>,
        broadcast: Arc<BroadcastService>,
        stats: Arc<dyn PlayerStatsService>,
    ) -> Self {
        Self {
            config,
            broadcast,
            stats,
        }
    }

    /// Apply one handler's declared mutations. `handler_success` gates
    /// broadcasts; the prefetched game is the fallback for broadcast
    /// rendering when the handler neither saved nor overrode it.
    pub async fn process(
        &self,
        conn: &mut ConnectionManager,
        game_id: &str,
        classified: ClassifiedMutations,
        handler_success: bool,
        broadcast_override: Option<Game>,
        prefetched: &Game,
    ) -> Result<ProcessReport, AppError> {
        // Step 1: the primary persistence round trip. A failure here
        // aborts the action; nothing later runs against unsaved state.
        let batch = OutBatch {
            save_game: classified.save_game.as_deref(),
            timer_sets: classified.timer_sets.iter().collect(),
            timer_delete: classified.timer_delete,
        };
        let queue_len =
            pipeline::run_out_pipeline(conn, &self.config, game_id, batch).await?;

        // Step 2: socket sessions, isolated from the save.
        for (socket_id, session_value) in &classified.session_updates {
            if let Err(err) =
                session::update_session(conn, socket_id, session_value.as_ref()).await
            {
                warn!(
                    game_id,
                    socket_id,
                    error = %err,
                    "socket session update failed; game save stands"
                );
            }
        }

        // Step 3: player stats, same isolation.
        for update in &classified.stat_updates {
            let result = match update {
                PlayerStatsUpdate::SessionStarted { player_id, at } => {
                    self.stats
                        .initialize_player_session(*player_id, &game_id.to_string(), *at)
                        .await
                }
                PlayerStatsUpdate::ClearLeftAt { player_id } => {
                    self.stats.clear_player_left_at_time(*player_id).await
                }
            };
            if let Err(err) = result {
                warn!(game_id, error = %err, "player stats update failed; game save stands");
            }
        }

        // Step 4: broadcasts, only for successful handlers, after the
        // write is durable. Broadcast game resolution priority:
        // handler override, else the freshly saved game, else prefetch.
        if handler_success {
            let broadcast_game = broadcast_override
                .or(classified.save_game.map(|g| *g))
                .unwrap_or_else(|| prefetched.clone());
            for event in &classified.broadcasts {
                if matches!(event.payload, EventPayload::StateSync) {
                    for rendered in BroadcastEvent::render_state(&broadcast_game) {
                        if let Err(err) = self.broadcast.publish(game_id, &rendered).await {
                            error!(game_id, error = %err, "broadcast publish failed");
                        }
                    }
                } else if let Err(err) = self.broadcast.publish(game_id, event).await {
                    error!(game_id, error = %err, "broadcast publish failed");
                }
            }
        }

        // Step 5: completion bookkeeping, after clients were notified.
        for final_scores in &classified.completions {
            info!(game_id, scores = ?final_scores, "game completed, winding keys down");
            if let Err(err) =
                pipeline::expire_finished_game(conn, &self.config, game_id).await
            {
                warn!(game_id, error = %err, "completion cleanup failed");
            }
        }

        Ok(ProcessReport { queue_len })
    }
}
