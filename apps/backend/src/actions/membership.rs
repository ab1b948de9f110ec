//! Membership and lobby handlers: join/ready/start, role/score/slot
//! changes, and the three flavors of departure.

use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::actions::router::{self, RouterContext};
use crate::actions::{ActionContext, ActionHandler, HandlerOutcome};
use crate::domain::game::{Game, Player, PlayerGameStatus, PlayerId, PlayerRole};
use crate::domain::package::RoundKind;
use crate::domain::state::QuestionState;
use crate::engine::mutation::{DataMutation, PlayerStatsUpdate};
use crate::error::AppError;
use crate::errors::domain::{DomainError, ValidationKind};
use crate::errors::ErrorCode;
use crate::services::broadcast::{BroadcastEvent, EventPayload};
use crate::store::session::SocketSession;

fn rcx<'p>(ctx: &ActionContext<'p>) -> RouterContext<'p> {
    RouterContext {
        package: ctx.package,
        config: ctx.config,
        now: ctx.now,
    }
}

fn save_and_sync(game: &Game) -> Vec<DataMutation> {
    vec![
        DataMutation::SaveGame(Box::new(game.clone())),
        DataMutation::Broadcast(BroadcastEvent::state_sync()),
    ]
}

#[derive(Deserialize)]
struct JoinGamePayload {
    user_id: PlayerId,
    name: String,
    #[serde(default)]
    role: Option<PlayerRole>,
}

/// Join or rejoin a game. Creates the player on first join, revives
/// the record on reconnect; the socket session and player stats are
/// updated through declared mutations.
pub struct JoinGameHandler;

impl ActionHandler for JoinGameHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        let payload: JoinGamePayload = ctx.parse_payload()?;
        let role = payload.role.unwrap_or(PlayerRole::Player);

        let rejoin = ctx.game.player(payload.user_id).is_some();
        if !rejoin {
            if role == PlayerRole::Showman && ctx.game.showman().is_some() {
                return Err(AppError::conflict(
                    ErrorCode::Conflict,
                    "the game already has a showman",
                ));
            }
            ctx.game
                .players
                .push(Player::new(payload.user_id, payload.name, role));
        } else if let Some(player) = ctx.game.player_mut(payload.user_id) {
            player.status = PlayerGameStatus::InGame;
        }

        info!(game_id = %ctx.game.id, user_id = payload.user_id, rejoin, "player joined");

        let mut mutations = vec![
            DataMutation::UpdateSocketSession {
                socket_id: ctx.socket_id.clone(),
                session: Some(SocketSession {
                    user_id: payload.user_id,
                    game_id: ctx.game.id.clone(),
                }),
            },
            DataMutation::UpdatePlayerStats(PlayerStatsUpdate::SessionStarted {
                player_id: payload.user_id,
                at: ctx.now,
            }),
            DataMutation::UpdatePlayerStats(PlayerStatsUpdate::ClearLeftAt {
                player_id: payload.user_id,
            }),
            DataMutation::Broadcast(BroadcastEvent::to_game(EventPayload::PlayerChanged {
                player_id: payload.user_id,
            })),
        ];
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations).with_response(json!({ "rejoin": rejoin })))
    }
}

/// Lobby readiness toggle, consumed by START_GAME.
pub struct PlayerReadyHandler;

impl ActionHandler for PlayerReadyHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        let caller = ctx.require_player()?;
        if ctx.game.is_started() {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                "the game already started",
            )
            .into());
        }
        if let Some(player) = ctx.game.player_mut(caller) {
            player.ready = true;
        }
        let mut mutations = vec![DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::PlayerChanged { player_id: caller },
        ))];
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations))
    }
}

/// Leave the lobby for round one. The showman may force the start;
/// otherwise every scoring player must be ready.
pub struct StartGameHandler;

impl ActionHandler for StartGameHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        let caller = ctx.require_player()?;
        if ctx.game.is_started() {
            return Err(AppError::conflict(
                ErrorCode::Conflict,
                "the game already started",
            ));
        }

        if ctx.game.active_players().next().is_none() {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                "cannot start without players",
            )
            .into());
        }
        let everyone_ready = ctx.game.active_players().all(|p| p.ready);
        if !ctx.game.is_showman(caller) && !everyone_ready {
            return Err(DomainError::validation(
                ValidationKind::InsufficientRole,
                "only the showman may start before everyone is ready",
            )
            .into());
        }

        ctx.game.started_at = Some(ctx.now);
        ctx.game.state.current_round = 1;
        ctx.game.state.question_state = QuestionState::Choosing;
        // Lowest slot opens the board.
        let mut seats: Vec<(Option<u8>, PlayerId)> = ctx
            .game
            .active_players()
            .map(|p| (p.slot, p.id))
            .collect();
        seats.sort_by_key(|(slot, _)| slot.unwrap_or(u8::MAX));
        ctx.game.state.current_turn_player_id = seats.first().map(|(_, id)| *id);

        let mut mutations = vec![DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::GameStarted,
        ))];

        // Degenerate package: the first round is already the final one.
        let first_round_is_final = ctx
            .package
            .round(1)
            .map(|r| r.kind == RoundKind::Final)
            .unwrap_or(false);
        if first_round_is_final {
            let router_ctx = rcx(ctx);
            mutations.extend(
                router::enter_final_round(&mut ctx.game, &router_ctx).map_err(AppError::from)?,
            );
        }

        info!(game_id = %ctx.game.id, "game started");
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations))
    }
}

#[derive(Deserialize)]
struct ChangeRolePayload {
    player_id: PlayerId,
    role: PlayerRole,
}

/// Showman-only role management; blocked mid-question so a role swap
/// cannot orphan an open sub-phase.
pub struct ChangeRoleHandler;

impl ActionHandler for ChangeRoleHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        ctx.require_showman()?;
        let payload: ChangeRolePayload = ctx.parse_payload()?;

        if ctx.game.is_started() && ctx.game.state.question_state != QuestionState::Choosing {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                "roles can only change between questions",
            )
            .into());
        }
        if payload.role == PlayerRole::Showman
            && ctx.game.showman().map(|p| p.id) != Some(payload.player_id)
            && ctx.game.showman().is_some()
        {
            return Err(AppError::conflict(
                ErrorCode::Conflict,
                "the game already has a showman",
            ));
        }

        let player = ctx
            .game
            .player_mut(payload.player_id)
            .ok_or_else(|| AppError::not_found(ErrorCode::PlayerNotFound, "no such player"))?;
        player.role = payload.role;
        if payload.role != PlayerRole::Player {
            player.slot = None;
        }

        let mut mutations = vec![DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::PlayerChanged {
                player_id: payload.player_id,
            },
        ))];
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations))
    }
}

#[derive(Deserialize)]
struct ChangeScorePayload {
    player_id: PlayerId,
    score: i64,
}

/// Manual score correction by the showman, soft-capped.
pub struct ChangeScoreHandler;

impl ActionHandler for ChangeScoreHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        ctx.require_showman()?;
        let payload: ChangeScorePayload = ctx.parse_payload()?;
        let cap = ctx.config.max_score;

        let player = ctx
            .game
            .player_mut(payload.player_id)
            .ok_or_else(|| AppError::not_found(ErrorCode::PlayerNotFound, "no such player"))?;
        player.score = payload.score.clamp(-cap, cap);

        let mut mutations = vec![DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::PlayerChanged {
                player_id: payload.player_id,
            },
        ))];
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations))
    }
}

#[derive(Deserialize)]
struct ChangeSlotPayload {
    player_id: PlayerId,
    slot: u8,
}

/// Move a player to a free board slot (self-service, or showman for
/// anyone).
pub struct ChangeSlotHandler;

impl ActionHandler for ChangeSlotHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        let caller = ctx.require_player()?;
        let payload: ChangeSlotPayload = ctx.parse_payload()?;

        if payload.player_id != caller && !ctx.game.is_showman(caller) {
            return Err(DomainError::validation(
                ValidationKind::InsufficientRole,
                "only the showman may move other players",
            )
            .into());
        }
        let taken = ctx
            .game
            .players
            .iter()
            .any(|p| p.id != payload.player_id && p.slot == Some(payload.slot));
        if taken {
            return Err(DomainError::validation(
                ValidationKind::InvalidSlot,
                format!("slot {} is occupied", payload.slot),
            )
            .into());
        }

        let player = ctx
            .game
            .player_mut(payload.player_id)
            .ok_or_else(|| AppError::not_found(ErrorCode::PlayerNotFound, "no such player"))?;
        if player.role != PlayerRole::Player {
            return Err(DomainError::validation(
                ValidationKind::InvalidSlot,
                "only scoring players occupy slots",
            )
            .into());
        }
        player.slot = Some(payload.slot);

        let mut mutations = vec![DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::PlayerChanged {
                player_id: payload.player_id,
            },
        ))];
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations))
    }
}

#[derive(Deserialize)]
struct KickPayload {
    player_id: PlayerId,
}

/// How a player left; drives session cleanup and departure routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartureKind {
    Disconnect,
    Leave,
    Kick,
}

/// Shared departure handler: players are retained (never deleted) so
/// stats and turn history stay valid; the phase router keeps the game
/// moving without them.
pub struct DepartureHandler {
    kind: DepartureKind,
}

impl DepartureHandler {
    pub fn new(kind: DepartureKind) -> Self {
        Self { kind }
    }
}

impl ActionHandler for DepartureHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        let departed = match self.kind {
            DepartureKind::Kick => {
                ctx.require_showman()?;
                let payload: KickPayload = ctx.parse_payload()?;
                if ctx.game.is_showman(payload.player_id) {
                    return Err(DomainError::validation(
                        ValidationKind::InsufficientRole,
                        "the showman cannot be kicked",
                    )
                    .into());
                }
                payload.player_id
            }
            DepartureKind::Disconnect | DepartureKind::Leave => match ctx.current_player_id {
                Some(id) => id,
                // A socket with no session dropped; nothing to do.
                None => return Ok(HandlerOutcome::ok(Vec::new())),
            },
        };

        let player = ctx
            .game
            .player_mut(departed)
            .ok_or_else(|| AppError::not_found(ErrorCode::PlayerNotFound, "no such player"))?;
        player.status = PlayerGameStatus::Disconnected;
        player.ready = false;

        info!(game_id = %ctx.game.id, departed, kind = ?self.kind, "player departed");

        let router_ctx = rcx(ctx);
        let mut mutations = router::handle_departure(&mut ctx.game, &router_ctx, departed)
            .map_err(AppError::from)?;

        if self.kind != DepartureKind::Kick {
            mutations.push(DataMutation::UpdateSocketSession {
                socket_id: ctx.socket_id.clone(),
                session: None,
            });
        }
        mutations.push(DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::PlayerChanged {
                player_id: departed,
            },
        )));
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations))
    }
}
