//! Final-round handlers: theme elimination, blind bidding,
//! simultaneous answering, and showman review.

use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::actions::router::{self, RouterContext};
use crate::actions::{ActionContext, ActionHandler, HandlerOutcome};
use crate::domain::final_round::{self, FinalAnswer, FinalRoundPhase};
use crate::domain::game::{Game, PlayerId};
use crate::domain::state::QuestionState;
use crate::domain::timer::{Timer, TimerKind};
use crate::engine::mutation::DataMutation;
use crate::error::AppError;
use crate::errors::domain::{DomainError, ValidationKind};
use crate::services::broadcast::{BroadcastEvent, EventPayload};

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

/// Participants whose actions still count: turn-order members that are
/// connected.
fn active_participants(game: &Game) -> Vec<PlayerId> {
    let order = game
        .state
        .final_round_data
        .as_ref()
        .map(|d| d.turn_order.clone())
        .unwrap_or_default();
    order
        .into_iter()
        .filter(|id| {
            game.player(*id)
                .map(|p| p.status == crate::domain::game::PlayerGameStatus::InGame)
                .unwrap_or(false)
        })
        .collect()
}

#[derive(Deserialize)]
struct EliminateThemePayload {
    theme_id: i64,
}

/// Turn-ordered theme elimination until a single theme remains.
pub struct EliminateThemeHandler;

impl ActionHandler for EliminateThemeHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        ctx.ensure_not_paused()?;
        let caller = ctx.require_player()?;
        let payload: EliminateThemePayload = ctx.parse_payload()?;

        if ctx.game.state.question_state != QuestionState::ThemeElimination {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                "theme elimination is not running",
            )
            .into());
        }
        let router_ctx = rcx(ctx);
        let remaining = router::remaining_final_themes(&ctx.game, &router_ctx);
        if remaining.len() <= 1 {
            return Err(DomainError::invariant("elimination ran past the last theme").into());
        }
        if !remaining.contains(&payload.theme_id) {
            return Err(DomainError::validation(
                ValidationKind::InvalidTheme,
                format!("theme {} is not on the final board", payload.theme_id),
            )
            .into());
        }

        let is_showman = ctx.game.is_showman(caller);
        {
            let data = ctx
                .game
                .state
                .final_round_data
                .as_mut()
                .ok_or_else(|| DomainError::invariant("final payload missing"))?;
            if data.current_turn() != Some(caller) && !is_showman {
                return Err(DomainError::validation(
                    ValidationKind::OutOfTurn,
                    "not this player's elimination turn",
                )
                .into());
            }
            data.eliminated_themes.push(payload.theme_id);
            data.advance_turn();
        }

        debug!(game_id = %ctx.game.id, theme_id = payload.theme_id, "theme eliminated");

        let mut mutations = vec![DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::ThemeEliminated {
                theme_id: payload.theme_id,
            },
        ))];

        if router::remaining_final_themes(&ctx.game, &router_ctx).len() <= 1 {
            mutations.push(DataMutation::TimerDelete);
            mutations.extend(
                router::begin_final_bidding(&mut ctx.game, &router_ctx)
                    .map_err(AppError::from)?,
            );
        } else {
            let next_turn = ctx
                .game
                .state
                .final_round_data
                .as_ref()
                .and_then(|d| d.current_turn());
            ctx.game.state.current_turn_player_id = next_turn;
            mutations.push(DataMutation::TimerDelete);
            mutations.push(DataMutation::TimerSet(Timer::start(
                TimerKind::Final,
                ctx.config.final_timer_ms,
                ctx.now,
            )));
        }
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations))
    }
}

#[derive(Deserialize)]
struct PlaceFinalBidPayload {
    amount: i64,
}

/// Blind bid, clamped into `[minimum, max(score, minimum)]`.
pub struct PlaceFinalBidHandler;

impl ActionHandler for PlaceFinalBidHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        ctx.ensure_not_paused()?;
        let caller = ctx.require_scoring_player()?;
        let payload: PlaceFinalBidPayload = ctx.parse_payload()?;

        let in_final_bidding = ctx.game.state.question_state == QuestionState::Bidding
            && ctx
                .game
                .state
                .final_round_data
                .as_ref()
                .map(|d| d.phase == FinalRoundPhase::Bidding)
                .unwrap_or(false);
        if !in_final_bidding {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                "final bidding is not running",
            )
            .into());
        }

        let score = ctx.game.player(caller).map(|p| p.score).unwrap_or(0);
        let clamped = final_round::clamp_final_bid(payload.amount, score, ctx.config.min_final_bid);

        {
            let data = ctx
                .game
                .state
                .final_round_data
                .as_mut()
                .ok_or_else(|| DomainError::invariant("final payload missing"))?;
            if !data.turn_order.contains(&caller) {
                return Err(DomainError::validation(
                    ValidationKind::OutOfTurn,
                    "player is not part of the final round",
                )
                .into());
            }
            if data.bids.contains_key(&caller) {
                return Err(DomainError::validation(
                    ValidationKind::InvalidBid,
                    "final bid already placed",
                )
                .into());
            }
            data.bids.insert(caller, clamped);
        }

        let mut mutations = vec![DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::FinalBidPlaced { player_id: caller },
        ))];

        let participants = active_participants(&ctx.game);
        let all_bid = ctx
            .game
            .state
            .final_round_data
            .as_ref()
            .map(|data| participants.iter().all(|p| data.bids.contains_key(p)))
            .unwrap_or(false);
        if all_bid {
            let router_ctx = rcx(ctx);
            mutations.push(DataMutation::TimerDelete);
            mutations.extend(
                router::begin_final_answering(&mut ctx.game, &router_ctx)
                    .map_err(AppError::from)?,
            );
        }
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations).with_response(json!({ "bid": clamped })))
    }
}

#[derive(Deserialize)]
struct SubmitFinalAnswerPayload {
    text: String,
}

/// Written answer during the simultaneous answering phase.
pub struct SubmitFinalAnswerHandler;

impl ActionHandler for SubmitFinalAnswerHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        ctx.ensure_not_paused()?;
        let caller = ctx.require_scoring_player()?;
        let payload: SubmitFinalAnswerPayload = ctx.parse_payload()?;

        let in_final_answering = ctx.game.state.question_state == QuestionState::Answering
            && ctx
                .game
                .state
                .final_round_data
                .as_ref()
                .map(|d| d.phase == FinalRoundPhase::Answering)
                .unwrap_or(false);
        if !in_final_answering {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                "final answering is not running",
            )
            .into());
        }

        let now = ctx.now;
        {
            let data = ctx
                .game
                .state
                .final_round_data
                .as_mut()
                .ok_or_else(|| DomainError::invariant("final payload missing"))?;
            if data.bids.get(&caller).copied().unwrap_or(0) <= 0 {
                return Err(DomainError::validation(
                    ValidationKind::OutOfTurn,
                    "player has nothing at stake in the final",
                )
                .into());
            }
            if data.answer_of(caller).is_some() {
                return Err(DomainError::validation(
                    ValidationKind::PhaseMismatch,
                    "final answer already submitted",
                )
                .into());
            }
            data.answers.push(FinalAnswer {
                id: Uuid::new_v4(),
                player_id: caller,
                text: payload.text,
                submitted_at: now,
                is_correct: None,
                auto_loss: false,
            });
        }

        let mut mutations = vec![DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::FinalAnswerSubmitted { player_id: caller },
        ))];

        let participants = active_participants(&ctx.game);
        let complete = ctx
            .game
            .state
            .final_round_data
            .as_ref()
            .map(|d| d.all_answers_submitted(&participants))
            .unwrap_or(false);
        if complete {
            let router_ctx = rcx(ctx);
            mutations.extend(
                router::begin_final_review(&mut ctx.game, &router_ctx).map_err(AppError::from)?,
            );
        }
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations))
    }
}

#[derive(Deserialize)]
struct ReviewFinalAnswerPayload {
    answer_id: Uuid,
    correct: bool,
}

/// Showman review: `±bid`, clamped by the per-review delta cap and the
/// score ceiling; the game completes when nothing is left to review.
pub struct ReviewFinalAnswerHandler;

impl ActionHandler for ReviewFinalAnswerHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        ctx.ensure_not_paused()?;
        ctx.require_showman()?;
        let payload: ReviewFinalAnswerPayload = ctx.parse_payload()?;

        let in_review = ctx.game.state.question_state == QuestionState::Reviewing
            && ctx
                .game
                .state
                .final_round_data
                .as_ref()
                .map(|d| d.phase == FinalRoundPhase::Reviewing)
                .unwrap_or(false);
        if !in_review {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                "final review is not running",
            )
            .into());
        }

        let (player_id, bid) = {
            let data = ctx
                .game
                .state
                .final_round_data
                .as_mut()
                .ok_or_else(|| DomainError::invariant("final payload missing"))?;
            let answer = data
                .answers
                .iter_mut()
                .find(|a| a.id == payload.answer_id)
                .ok_or_else(|| {
                    DomainError::validation(
                        ValidationKind::InvalidPayload,
                        "no such final answer",
                    )
                })?;
            if answer.is_correct.is_some() || answer.auto_loss {
                return Err(DomainError::validation(
                    ValidationKind::PhaseMismatch,
                    "answer already reviewed",
                )
                .into());
            }
            answer.is_correct = Some(payload.correct);
            let player_id = answer.player_id;
            let bid = data.bids.get(&player_id).copied().unwrap_or(0);
            (player_id, bid)
        };

        let (max_delta, max_score) = (ctx.config.max_review_delta, ctx.config.max_score);
        let new_score = {
            let player = ctx.game.player_mut(player_id).ok_or_else(|| {
                DomainError::invariant("final answer from an unknown player")
            })?;
            player.score =
                final_round::apply_review(player.score, bid, payload.correct, max_delta, max_score);
            player.score
        };

        info!(game_id = %ctx.game.id, player_id, correct = payload.correct, new_score, "final answer reviewed");

        let mut mutations = vec![DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::FinalAnswerReviewed {
                player_id,
                correct: payload.correct,
                score: new_score,
            },
        ))];

        let all_reviewed = ctx
            .game
            .state
            .final_round_data
            .as_ref()
            .map(|d| d.next_unreviewed().is_none())
            .unwrap_or(true);
        if all_reviewed {
            let router_ctx = rcx(ctx);
            mutations.extend(router::finish_game(&mut ctx.game, &router_ctx));
        }
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations))
    }
}

/// Deadline fallbacks used by the timer-expiration handler.
pub(crate) fn auto_eliminate_theme(
    ctx: &mut ActionContext<'_>,
) -> Result<Vec<DataMutation>, DomainError> {
    let router_ctx = RouterContext {
        package: ctx.package,
        config: ctx.config,
        now: ctx.now,
    };
    let remaining = router::remaining_final_themes(&ctx.game, &router_ctx);
    let Some(theme_id) = remaining.first().copied() else {
        return Ok(Vec::new());
    };

    let mut mutations = Vec::new();
    if let Some(data) = ctx.game.state.final_round_data.as_mut() {
        data.eliminated_themes.push(theme_id);
        data.advance_turn();
        ctx.game.state.current_turn_player_id = data.current_turn();
    }
    mutations.push(DataMutation::Broadcast(BroadcastEvent::to_game(
        EventPayload::ThemeEliminated { theme_id },
    )));

    if router::remaining_final_themes(&ctx.game, &router_ctx).len() <= 1 {
        mutations.extend(router::begin_final_bidding(&mut ctx.game, &router_ctx)?);
    } else {
        mutations.push(DataMutation::TimerDelete);
        mutations.push(DataMutation::TimerSet(Timer::start(
            TimerKind::Final,
            ctx.config.final_timer_ms,
            ctx.now,
        )));
    }
    Ok(mutations)
}

/// Deadline fallback: force minimum bids for everyone still missing.
pub(crate) fn auto_place_missing_bids(
    ctx: &mut ActionContext<'_>,
) -> Result<Vec<DataMutation>, DomainError> {
    let participants = active_participants(&ctx.game);
    let min_bid = ctx.config.min_final_bid;

    let scores: Vec<(PlayerId, i64)> = participants
        .iter()
        .map(|&id| (id, ctx.game.player(id).map(|p| p.score).unwrap_or(0)))
        .collect();
    {
        let data = ctx
            .game
            .state
            .final_round_data
            .as_mut()
            .ok_or_else(|| DomainError::invariant("final payload missing"))?;
        for (id, score) in scores {
            data.bids
                .entry(id)
                .or_insert_with(|| final_round::clamp_final_bid(min_bid, score, min_bid));
        }
    }

    let router_ctx = RouterContext {
        package: ctx.package,
        config: ctx.config,
        now: ctx.now,
    };
    router::begin_final_answering(&mut ctx.game, &router_ctx)
}

/// Deadline fallback: unanswered stakes become automatic losses, then
/// review begins.
pub(crate) fn auto_close_final_answers(
    ctx: &mut ActionContext<'_>,
    now: OffsetDateTime,
) -> Result<Vec<DataMutation>, DomainError> {
    let participants = active_participants(&ctx.game);
    let (max_delta, max_score) = (ctx.config.max_review_delta, ctx.config.max_score);

    let mut losses: Vec<(PlayerId, i64)> = Vec::new();
    {
        let data = ctx
            .game
            .state
            .final_round_data
            .as_mut()
            .ok_or_else(|| DomainError::invariant("final payload missing"))?;
        for &id in &participants {
            let bid = data.bids.get(&id).copied().unwrap_or(0);
            if bid > 0 && data.answer_of(id).is_none() {
                data.answers.push(FinalAnswer {
                    id: Uuid::new_v4(),
                    player_id: id,
                    text: String::new(),
                    submitted_at: now,
                    is_correct: None,
                    auto_loss: true,
                });
                losses.push((id, bid));
            }
        }
    }

    let mut mutations = Vec::new();
    for (id, bid) in losses {
        let new_score = {
            let player = ctx
                .game
                .player_mut(id)
                .ok_or_else(|| DomainError::invariant("participant vanished"))?;
            player.score = final_round::apply_review(player.score, bid, false, max_delta, max_score);
            player.score
        };
        mutations.push(DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::FinalAnswerReviewed {
                player_id: id,
                correct: false,
                score: new_score,
            },
        )));
    }

    let router_ctx = RouterContext {
        package: ctx.package,
        config: ctx.config,
        now: ctx.now,
    };
    mutations.extend(router::begin_final_review(&mut ctx.game, &router_ctx)?);
    Ok(mutations)
}
