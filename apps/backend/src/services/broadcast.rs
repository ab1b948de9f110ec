//! Broadcast service: the thin edge between the engine and the
//! transport layer.
//!
//! Events declared by handlers are fanned out to per-game and per-user
//! channels on the store's publish mechanism; socket servers subscribe
//! and forward to their connections. Role filtering happens here by
//! publishing role-specific renderings to role-specific channels.

use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::warn;

use crate::domain::game::{Game, PlayerId, PlayerRole};
use crate::domain::snapshot::{GameSnapshot, Perspective};
use crate::domain::state::AnswerVerdict;
use crate::domain::timer::TimerKind;
use crate::error::{AppError, ErrorBody};

// Publisher retry configuration (action execution path)
const PUBLISHER_MAX_ATTEMPTS: u32 = 3;
const PUBLISHER_INITIAL_RETRY_DELAY_MS: u64 = 50;
const PUBLISHER_MAX_RETRY_DELAY_MS: u64 = 200;

/// Who an event is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastScope {
    /// Everybody in the game (optionally narrowed to one role).
    Game { role: Option<PlayerRole> },
    /// One player, on whatever sockets they hold.
    Player(PlayerId),
    /// One socket only (action responses travel out of band; this is
    /// for targeted nudges such as reconnect state).
    Socket(String),
}

/// Payload vocabulary of the engine's out-of-band events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Marker: expanded at publish time into per-role `StateChanged`
    /// events rendered from the resolved broadcast game.
    StateSync,
    GameStarted,
    GameFinished {
        scores: Vec<(PlayerId, i64)>,
    },
    /// Full role-filtered state; emitted whenever the phase moves.
    StateChanged {
        game: GameSnapshot,
    },
    PlayerChanged {
        player_id: PlayerId,
    },
    QuestionPicked {
        question_id: i64,
        theme_id: i64,
        price: i64,
    },
    PlayerAnswering {
        player_id: PlayerId,
    },
    AnswerJudged {
        player_id: PlayerId,
        verdict: AnswerVerdict,
        delta: i64,
        score: i64,
    },
    StakeBidPlaced {
        player_id: PlayerId,
        highest_bid: Option<i64>,
    },
    StakeWinner {
        player_id: PlayerId,
        amount: i64,
    },
    SecretTransferred {
        from: PlayerId,
        to: PlayerId,
    },
    ThemeEliminated {
        theme_id: i64,
    },
    FinalBidPlaced {
        player_id: PlayerId,
    },
    FinalAnswerSubmitted {
        player_id: PlayerId,
    },
    FinalAnswerReviewed {
        player_id: PlayerId,
        correct: bool,
        score: i64,
    },
    RoundChanged {
        round: u32,
    },
    PauseChanged {
        paused: bool,
    },
    TimerStarted {
        kind: TimerKind,
        duration_ms: u64,
    },
    TimerStopped,
    ActionFailed {
        error: ErrorBody,
    },
}

/// One declared broadcast: payload plus addressing.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastEvent {
    pub scope: BroadcastScope,
    pub payload: EventPayload,
}

impl BroadcastEvent {
    pub fn to_game(payload: EventPayload) -> Self {
        Self {
            scope: BroadcastScope::Game { role: None },
            payload,
        }
    }

    pub fn to_role(role: PlayerRole, payload: EventPayload) -> Self {
        Self {
            scope: BroadcastScope::Game { role: Some(role) },
            payload,
        }
    }

    pub fn to_player(player_id: PlayerId, payload: EventPayload) -> Self {
        Self {
            scope: BroadcastScope::Player(player_id),
            payload,
        }
    }

    /// Declare a full state broadcast. The concrete snapshots are
    /// rendered at publish time from the game the processor resolves
    /// (handler override, else saved game, else prefetch).
    pub fn state_sync() -> Self {
        Self::to_game(EventPayload::StateSync)
    }

    /// Per-role renderings of a state sync against the resolved game.
    pub fn render_state(game: &Game) -> Vec<Self> {
        vec![
            Self::to_role(
                PlayerRole::Showman,
                EventPayload::StateChanged {
                    game: GameSnapshot::render(game, Perspective::Showman),
                },
            ),
            Self::to_role(
                PlayerRole::Player,
                EventPayload::StateChanged {
                    game: GameSnapshot::render(game, Perspective::Spectator),
                },
            ),
            Self::to_role(
                PlayerRole::Spectator,
                EventPayload::StateChanged {
                    game: GameSnapshot::render(game, Perspective::Spectator),
                },
            ),
        ]
    }
}

fn channel_for(game_id: &str, scope: &BroadcastScope) -> String {
    match scope {
        BroadcastScope::Game { role: None } => format!("game:{game_id}"),
        BroadcastScope::Game {
            role: Some(PlayerRole::Showman),
        } => format!("game:{game_id}:showman"),
        BroadcastScope::Game {
            role: Some(PlayerRole::Player),
        } => format!("game:{game_id}:players"),
        BroadcastScope::Game {
            role: Some(PlayerRole::Spectator),
        } => format!("game:{game_id}:spectators"),
        BroadcastScope::Player(player_id) => format!("user:{player_id}"),
        BroadcastScope::Socket(socket_id) => format!("socket:{socket_id}"),
    }
}

/// Publishes declared events to the store's notify channels.
pub struct BroadcastService {
    publisher: Mutex<ConnectionManager>,
}

impl BroadcastService {
    pub fn new(connection: ConnectionManager) -> Arc<Self> {
        Arc::new(Self {
            publisher: Mutex::new(connection),
        })
    }

    /// Publish one event. Bounded retry on transient failures; a
    /// publish that still fails is surfaced to the caller.
    pub async fn publish(&self, game_id: &str, event: &BroadcastEvent) -> Result<(), AppError> {
        let channel = channel_for(game_id, &event.scope);
        let encoded = serde_json::to_string(&event.payload)?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let publish_res = {
                let mut publisher = self.publisher.lock().await;
                redis::cmd("PUBLISH")
                    .arg(&channel)
                    .arg(&encoded)
                    .query_async::<i64>(&mut *publisher)
                    .await
            };

            match publish_res {
                Ok(_) => return Ok(()),
                Err(err) => {
                    if attempt >= PUBLISHER_MAX_ATTEMPTS {
                        return Err(err.into());
                    }

                    let delay_ms = PUBLISHER_INITIAL_RETRY_DELAY_MS
                        .saturating_mul(2_u64.pow(attempt - 1))
                        .min(PUBLISHER_MAX_RETRY_DELAY_MS);
                    warn!(
                        error = %err,
                        attempt,
                        retry_delay_ms = delay_ms,
                        channel = %channel,
                        "event publish failed, retrying"
                    );
                    sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }
}
