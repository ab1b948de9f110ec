//! Secret-question transfer handler.

use serde::Deserialize;
use tracing::debug;

use crate::actions::{ActionContext, ActionHandler, HandlerOutcome};
use crate::domain::game::{Game, PlayerId};
use crate::domain::state::QuestionState;
use crate::domain::timer::{Timer, TimerKind};
use crate::engine::mutation::DataMutation;
use crate::error::AppError;
use crate::errors::domain::{DomainError, ValidationKind};
use crate::services::broadcast::{BroadcastEvent, EventPayload};

fn save_and_sync(game: &Game) -> Vec<DataMutation> {
    vec![
        DataMutation::SaveGame(Box::new(game.clone())),
        DataMutation::Broadcast(BroadcastEvent::state_sync()),
    ]
}

#[derive(Deserialize)]
struct TransferSecretPayload {
    target_player_id: PlayerId,
}

/// The picker hands the secret question to an eligible player; the
/// transfer consumes the transfer phase and starts the answer clock.
pub struct TransferSecretHandler;

impl ActionHandler for TransferSecretHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        ctx.ensure_not_paused()?;
        let caller = ctx.require_player()?;
        let payload: TransferSecretPayload = ctx.parse_payload()?;

        if ctx.game.state.question_state != QuestionState::SecretTransfer {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                "no secret transfer is pending",
            )
            .into());
        }
        let secret = ctx
            .game
            .state
            .secret_question_data
            .clone()
            .ok_or_else(|| DomainError::invariant("SECRET_TRANSFER without secret payload"))?;

        if secret.picker_id != caller && !ctx.game.is_showman(caller) {
            return Err(DomainError::validation(
                ValidationKind::OutOfTurn,
                "only the picker decides the transfer",
            )
            .into());
        }

        let target_active = ctx
            .game
            .player(payload.target_player_id)
            .map(|p| p.is_active_player())
            .unwrap_or(false);
        if !target_active || !secret.may_receive(payload.target_player_id) {
            return Err(DomainError::validation(
                ValidationKind::InvalidTransfer,
                "target cannot receive this question",
            )
            .into());
        }

        // The package is immutable during play: a picked question that
        // cannot be located is broken data, not a user mistake.
        if ctx.package.question(secret.question_id).is_none() {
            return Err(DomainError::invariant(format!(
                "secret question {} is missing from the package",
                secret.question_id
            ))
            .into());
        }

        if let Some(data) = ctx.game.state.secret_question_data.as_mut() {
            data.transfer_phase = false;
        }
        ctx.game.state.answering_player = Some(payload.target_player_id);
        ctx.game.state.question_state = QuestionState::Answering;

        debug!(game_id = %ctx.game.id, from = caller, to = payload.target_player_id, "secret transferred");

        let mut mutations = vec![
            DataMutation::TimerDelete,
            DataMutation::TimerSet(Timer::start(
                TimerKind::Answer,
                ctx.config.answer_timer_ms,
                ctx.now,
            )),
            DataMutation::Broadcast(BroadcastEvent::to_game(EventPayload::SecretTransferred {
                from: secret.picker_id,
                to: payload.target_player_id,
            })),
        ];
        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations))
    }
}
