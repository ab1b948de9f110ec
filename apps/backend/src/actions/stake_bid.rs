//! Stake auction handler.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::actions::router::{self, RouterContext};
use crate::actions::{ActionContext, ActionHandler, HandlerOutcome};
use crate::domain::game::Game;
use crate::domain::stake::StakeBidInput;
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

#[derive(Deserialize)]
struct PlaceStakeBidPayload {
    bid: StakeBidInput,
}

/// One bidding turn of the stake auction. Validation order and the
/// all-in regime live in the domain type; this handler wires turn
/// advancement, timers, and completion.
pub struct PlaceStakeBidHandler;

impl ActionHandler for PlaceStakeBidHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        ctx.ensure_not_paused()?;
        let caller = ctx.require_scoring_player()?;
        let payload: PlaceStakeBidPayload = ctx.parse_payload()?;

        if ctx.game.state.question_state != QuestionState::Bidding
            || ctx.game.state.stake_question_data.is_none()
        {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                "no stake auction is running",
            )
            .into());
        }

        let score = ctx.game.player(caller).map(|p| p.score).unwrap_or(0);
        let price = ctx
            .game
            .state
            .current_question
            .as_ref()
            .map(|q| q.price)
            .ok_or_else(|| DomainError::invariant("BIDDING without a current question"))?;

        let router_ctx = rcx(ctx);
        let mut stake = ctx
            .game
            .state
            .stake_question_data
            .take()
            .ok_or_else(|| DomainError::invariant("stake payload vanished"))?;

        let validated = match stake.validate_bid(caller, score, price, payload.bid) {
            Ok(bid) => bid,
            Err(err) => {
                ctx.game.state.stake_question_data = Some(stake);
                return Err(err.into());
            }
        };
        stake.record_bid(caller, validated);

        debug!(game_id = %ctx.game.id, caller, bid = ?validated, highest = ?stake.highest_bid, "stake bid recorded");

        let mut mutations = vec![DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::StakeBidPlaced {
                player_id: caller,
                highest_bid: stake.highest_bid,
            },
        ))];

        let auction_over = stake.is_complete() || stake.advance_turn().is_none();
        if auction_over {
            mutations.extend(
                router::stake_completed(&mut ctx.game, &router_ctx, &mut stake)
                    .map_err(AppError::from)?,
            );
        } else {
            // Fresh countdown for the next bidder.
            mutations.push(DataMutation::TimerDelete);
            mutations.push(DataMutation::TimerSet(Timer::start(
                TimerKind::Bid,
                ctx.config.bid_timer_ms,
                ctx.now,
            )));
        }
        ctx.game.state.stake_question_data = Some(stake);

        mutations.extend(save_and_sync(&ctx.game));
        Ok(HandlerOutcome::ok(mutations).with_response(json!({ "accepted": true })))
    }
}
