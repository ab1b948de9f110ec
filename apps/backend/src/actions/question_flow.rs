//! Handlers for the ordinary question loop: pick, answer, verdict,
//! skips, round control, and pause.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::actions::router::{self, RouterContext};
use crate::actions::{ActionContext, ActionHandler, HandlerOutcome};
use crate::domain::game::Game;
use crate::domain::state::{AnswerVerdict, QuestionState};
use crate::domain::timer::{Timer, TimerKind};
use crate::engine::mutation::DataMutation;
use crate::error::AppError;
use crate::errors::domain::{DomainError, ValidationKind};
use crate::errors::ErrorCode;
use crate::services::broadcast::{BroadcastEvent, EventPayload};

fn rcx<'p>(ctx: &ActionContext<'p>) -> RouterContext<'p> {
    RouterContext {
        package: ctx.package,
        config: ctx.config,
        now: ctx.now,
    }
}

/// The standard tail of a mutating handler: persist, then let every
/// role re-render.
fn save_and_sync(game: &Game) -> Vec<DataMutation> {
    vec![
        DataMutation::SaveGame(Box::new(game.clone())),
        DataMutation::Broadcast(BroadcastEvent::state_sync()),
    ]
}

#[derive(Deserialize)]
struct PickQuestionPayload {
    question_id: i64,
}

/// Only the turn holder or the showman picks; only from CHOOSING.
pub struct PickQuestionHandler;

impl ActionHandler for PickQuestionHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        ctx.ensure_not_paused()?;
        let caller = ctx.require_player()?;
        let payload: PickQuestionPayload = ctx.parse_payload()?;

        if ctx.game.state.question_state != QuestionState::Choosing {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                "a question can only be picked from the board",
            )
            .into());
        }
        let is_turn_holder = ctx.game.state.current_turn_player_id == Some(caller);
        if !is_turn_holder && !ctx.game.is_showman(caller) {
            return Err(DomainError::validation(
                ValidationKind::OutOfTurn,
                "only the turn holder or the showman may pick",
            )
            .into());
        }

        let picker = ctx
            .game
            .state
            .current_turn_player_id
            .unwrap_or(caller);
        let router_ctx = rcx(ctx);
        let mut mutations =
            router::enter_question(&mut ctx.game, &router_ctx, payload.question_id, picker)
                .map_err(AppError::from)?;

        let question = ctx
            .game
            .state
            .current_question
            .clone()
            .ok_or_else(|| DomainError::invariant("enter_question left no current question"))?;
        mutations.push(DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::QuestionPicked {
                question_id: question.question_id,
                theme_id: question.theme_id,
                price: question.price,
            },
        )));
        mutations.extend(save_and_sync(&ctx.game));

        Ok(HandlerOutcome::ok(mutations)
            .with_response(json!({ "question_id": question.question_id })))
    }
}

/// A player claims the right to answer while the question is shown.
pub struct SubmitAnswerHandler;

impl ActionHandler for SubmitAnswerHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        ctx.ensure_not_paused()?;
        let caller = ctx.require_scoring_player()?;

        if ctx.game.state.question_state != QuestionState::Showing {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                "answers are only accepted while the question is shown",
            )
            .into());
        }
        if !ctx.game.eligible_answerers().contains(&caller) {
            return Err(DomainError::validation(
                ValidationKind::OutOfTurn,
                "player is not eligible to answer this question",
            )
            .into());
        }

        ctx.game.state.answering_player = Some(caller);
        ctx.game.state.question_state = QuestionState::Answering;

        let mut mutations = vec![
            DataMutation::TimerDelete,
            DataMutation::TimerSet(Timer::start(
                TimerKind::Answer,
                ctx.config.answer_timer_ms,
                ctx.now,
            )),
            DataMutation::Broadcast(BroadcastEvent::to_game(EventPayload::PlayerAnswering {
                player_id: caller,
            })),
        ];
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations))
    }
}

#[derive(Deserialize)]
struct AnswerResultPayload {
    correct: bool,
}

/// The showman judges the pending answer.
pub struct AnswerResultHandler;

impl ActionHandler for AnswerResultHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        ctx.ensure_not_paused()?;
        ctx.require_showman()?;
        let payload: AnswerResultPayload = ctx.parse_payload()?;

        if ctx.game.state.question_state != QuestionState::Answering
            || ctx.game.state.final_round_data.is_some()
        {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                "no answer is pending judgement",
            )
            .into());
        }
        let answerer = ctx.game.state.answering_player.ok_or_else(|| {
            DomainError::invariant("ANSWERING without an answering player")
        })?;

        // Stake questions are worth the winning bid; everything else is
        // worth the nominal price.
        let stake_amount = ctx
            .game
            .state
            .stake_question_data
            .as_ref()
            .and_then(|s| s.highest_bid);
        let price = stake_amount.or_else(|| {
            ctx.game
                .state
                .current_question
                .as_ref()
                .map(|q| q.price)
        });
        let price = price
            .ok_or_else(|| DomainError::invariant("ANSWERING without a current question"))?;

        let verdict = if payload.correct {
            AnswerVerdict::Correct
        } else {
            AnswerVerdict::Wrong
        };
        let delta = if payload.correct { price } else { -price };
        router::record_answer(&mut ctx.game, answerer, verdict, delta);
        if let Some(player) = ctx.game.player_mut(answerer) {
            player.score = player.score.clamp(-ctx.config.max_score, ctx.config.max_score);
        }
        let score = ctx.game.player(answerer).map(|p| p.score).unwrap_or(0);

        debug!(game_id = %ctx.game.id, answerer, correct = payload.correct, delta, "answer judged");

        let mut mutations = vec![DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::AnswerJudged {
                player_id: answerer,
                verdict,
                delta,
                score,
            },
        ))];

        let router_ctx = rcx(ctx);
        if payload.correct {
            // Correct answerer takes the next turn on the board.
            ctx.game.state.current_turn_player_id = Some(answerer);
            mutations.extend(router::resolve_question(&mut ctx.game, &router_ctx));
        } else {
            mutations.extend(router::continue_after_wrong_answer(&mut ctx.game, &router_ctx));
        }
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations))
    }
}

/// A player waves the question off.
pub struct SkipQuestionHandler;

impl ActionHandler for SkipQuestionHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        ctx.ensure_not_paused()?;
        let caller = ctx.require_scoring_player()?;

        // Skipping is blocked while a special-question sub-phase runs.
        if ctx.game.state.question_state != QuestionState::Showing
            || ctx.game.state.active_special().is_some()
        {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                "nothing to skip right now",
            )
            .into());
        }
        if !ctx.game.eligible_answerers().contains(&caller) {
            return Err(DomainError::validation(
                ValidationKind::OutOfTurn,
                "player already answered or skipped",
            )
            .into());
        }

        ctx.game.state.skipped_players.push(caller);

        let router_ctx = rcx(ctx);
        let mut mutations = Vec::new();
        if ctx.game.eligible_answerers().is_empty() {
            mutations.extend(router::resolve_question(&mut ctx.game, &router_ctx));
        }
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations))
    }
}

/// The showman abandons the current question entirely; a zero-point
/// resolution for everyone still in it.
pub struct ShowmanSkipHandler;

impl ActionHandler for ShowmanSkipHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        ctx.ensure_not_paused()?;
        ctx.require_showman()?;

        let skippable = matches!(
            ctx.game.state.question_state,
            QuestionState::Showing
                | QuestionState::Answering
                | QuestionState::SecretTransfer
                | QuestionState::Bidding
        ) && ctx.game.state.final_round_data.is_none();
        if !skippable {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                "no question to skip",
            )
            .into());
        }

        ctx.game.state.stake_question_data = None;
        ctx.game.state.secret_question_data = None;
        let router_ctx = rcx(ctx);
        let mut mutations = router::resolve_question(&mut ctx.game, &router_ctx);
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations))
    }
}

/// Take a skip back while the question is still open.
pub struct UnskipQuestionHandler;

impl ActionHandler for UnskipQuestionHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        ctx.ensure_not_paused()?;
        let caller = ctx.require_scoring_player()?;

        if ctx.game.state.question_state != QuestionState::Showing {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                "nothing to unskip right now",
            )
            .into());
        }

        ctx.game.state.skipped_players.retain(|&p| p != caller);
        Ok(HandlerOutcome::ok(save_and_sync(&ctx.game)))
    }
}

/// The showman forces the next round.
pub struct NextRoundHandler;

impl ActionHandler for NextRoundHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        ctx.ensure_not_paused()?;
        ctx.require_showman()?;

        if ctx.game.state.question_state != QuestionState::Choosing {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                "the round can only change from the board",
            )
            .into());
        }

        let router_ctx = rcx(ctx);
        let mut mutations =
            router::advance_round(&mut ctx.game, &router_ctx).map_err(AppError::from)?;
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations))
    }
}

/// Freeze the game and any running countdown.
pub struct PauseHandler;

impl ActionHandler for PauseHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        ctx.require_showman()?;
        if ctx.game.paused {
            return Err(AppError::conflict(ErrorCode::Conflict, "already paused"));
        }

        ctx.game.paused = true;
        let mut mutations = Vec::new();
        if let Some(timer) = &ctx.timer {
            let mut frozen = timer.clone();
            frozen.elapsed_ms = timer.freeze(ctx.now);
            ctx.game.state.paused_timer = Some(frozen);
            mutations.push(DataMutation::TimerDelete);
            mutations.push(DataMutation::Broadcast(BroadcastEvent::to_game(
                EventPayload::TimerStopped,
            )));
        }
        mutations.push(DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::PauseChanged { paused: true },
        )));
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations))
    }
}

/// Resume the game, restarting a frozen countdown with its remaining
/// time.
pub struct UnpauseHandler;

impl ActionHandler for UnpauseHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        ctx.require_showman()?;
        if !ctx.game.paused {
            return Err(AppError::conflict(ErrorCode::Conflict, "not paused"));
        }

        ctx.game.paused = false;
        let mut mutations = Vec::new();
        if let Some(frozen) = ctx.game.state.paused_timer.take() {
            let resumed = Timer::resume(
                frozen.kind,
                frozen.duration_ms,
                frozen.elapsed_ms,
                ctx.now,
            );
            mutations.push(DataMutation::Broadcast(BroadcastEvent::to_game(
                EventPayload::TimerStarted {
                    kind: resumed.kind,
                    duration_ms: resumed.duration_ms.saturating_sub(resumed.elapsed_ms),
                },
            )));
            mutations.push(DataMutation::TimerSet(resumed));
        }
        mutations.push(DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::PauseChanged { paused: false },
        )));
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations))
    }
}
