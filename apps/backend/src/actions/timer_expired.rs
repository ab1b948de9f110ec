//! The shared timer-expiration handler.
//!
//! Every expiration variant registers this one instance: the fired
//! deadline's meaning follows from the game's current sub-phase, so the
//! handler dispatches on `question_state` rather than on the action
//! type. Expirations racing a phase that already resolved are no-ops.

use tracing::debug;

use crate::actions::router::{self, RouterContext};
use crate::actions::{final_round, ActionContext, ActionHandler, HandlerOutcome};
use crate::domain::final_round::FinalRoundPhase;
use crate::domain::game::Game;
use crate::domain::stake::{StakeBid, StakeBidInput};
use crate::domain::state::{AnswerVerdict, QuestionState};
use crate::domain::timer::{Timer, TimerKind};
use crate::engine::mutation::DataMutation;
use crate::error::AppError;
use crate::errors::domain::DomainError;
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

pub struct TimerExpiredHandler;

impl ActionHandler for TimerExpiredHandler {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError> {
        // A pause deletes the live timer; an expiration that still
        // slipped through the queue is stale.
        if ctx.game.paused {
            return Ok(HandlerOutcome::ok(Vec::new()));
        }

        let state = ctx.game.state.question_state;
        debug!(game_id = %ctx.game.id, ?state, "timer expired");
        let router_ctx = rcx(ctx);

        let mutations = match state {
            // Nobody claimed the question before the deadline.
            QuestionState::Showing => {
                let mut m = router::resolve_question(&mut ctx.game, &router_ctx);
                m.extend(save_and_sync(&ctx.game));
                m
            }

            // The reveal ends; back to the board (or onward).
            QuestionState::ShowingAnswer => {
                let mut m = router::finish_question(&mut ctx.game, &router_ctx)
                    .map_err(AppError::from)?;
                m.extend(save_and_sync(&ctx.game));
                m
            }

            QuestionState::Answering
                if ctx.game.state.final_round_data.is_none() =>
            {
                self.answer_deadline(ctx, &router_ctx)?
            }

            QuestionState::Answering => {
                let now = ctx.now;
                let mut m = final_round::auto_close_final_answers(ctx, now)
                    .map_err(AppError::from)?;
                m.extend(save_and_sync(&ctx.game));
                m
            }

            QuestionState::SecretTransfer => self.transfer_deadline(ctx, &router_ctx)?,

            QuestionState::Bidding if ctx.game.state.stake_question_data.is_some() => {
                self.stake_deadline(ctx, &router_ctx)?
            }

            QuestionState::Bidding => {
                let mut m =
                    final_round::auto_place_missing_bids(ctx).map_err(AppError::from)?;
                m.extend(save_and_sync(&ctx.game));
                m
            }

            QuestionState::ThemeElimination => {
                let mut m =
                    final_round::auto_eliminate_theme(ctx).map_err(AppError::from)?;
                m.extend(save_and_sync(&ctx.game));
                m
            }

            // Review has no deadline pressure; the showman finishes it.
            QuestionState::Choosing | QuestionState::Reviewing => Vec::new(),
        };

        Ok(HandlerOutcome::ok(mutations))
    }
}

impl TimerExpiredHandler {
    /// Out of time mid-answer counts as a wrong answer.
    fn answer_deadline(
        &self,
        ctx: &mut ActionContext<'_>,
        router_ctx: &RouterContext<'_>,
    ) -> Result<Vec<DataMutation>, AppError> {
        let Some(answerer) = ctx.game.state.answering_player else {
            return Ok(Vec::new());
        };

        let stake_amount = ctx
            .game
            .state
            .stake_question_data
            .as_ref()
            .and_then(|s| s.highest_bid);
        let price = stake_amount
            .or_else(|| ctx.game.state.current_question.as_ref().map(|q| q.price))
            .ok_or_else(|| DomainError::invariant("ANSWERING without a current question"))?;

        router::record_answer(&mut ctx.game, answerer, AnswerVerdict::Wrong, -price);
        if let Some(player) = ctx.game.player_mut(answerer) {
            player.score = player.score.clamp(-ctx.config.max_score, ctx.config.max_score);
        }
        let score = ctx.game.player(answerer).map(|p| p.score).unwrap_or(0);

        let mut mutations = vec![DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::AnswerJudged {
                player_id: answerer,
                verdict: AnswerVerdict::Wrong,
                delta: -price,
                score,
            },
        ))];
        mutations.extend(router::continue_after_wrong_answer(&mut ctx.game, router_ctx));
        mutations.extend(save_and_sync(&ctx.game));
        Ok(mutations)
    }

    /// A picker who never decides the transfer keeps the question (or
    /// hands it to the first other eligible player when self-transfer
    /// is not allowed).
    fn transfer_deadline(
        &self,
        ctx: &mut ActionContext<'_>,
        router_ctx: &RouterContext<'_>,
    ) -> Result<Vec<DataMutation>, AppError> {
        let Some(secret) = ctx.game.state.secret_question_data.clone() else {
            return Ok(Vec::new());
        };

        let target = if secret.may_receive(secret.picker_id)
            && ctx
                .game
                .player(secret.picker_id)
                .map(|p| p.is_active_player())
                .unwrap_or(false)
        {
            Some(secret.picker_id)
        } else {
            ctx.game
                .active_players()
                .map(|p| p.id)
                .find(|&id| secret.may_receive(id))
        };

        let mut mutations = Vec::new();
        match target {
            Some(target) => {
                if let Some(data) = ctx.game.state.secret_question_data.as_mut() {
                    data.transfer_phase = false;
                }
                ctx.game.state.answering_player = Some(target);
                ctx.game.state.question_state = QuestionState::Answering;
                mutations.push(DataMutation::TimerDelete);
                mutations.push(DataMutation::TimerSet(Timer::start(
                    TimerKind::Answer,
                    ctx.config.answer_timer_ms,
                    ctx.now,
                )));
                mutations.push(DataMutation::Broadcast(BroadcastEvent::to_game(
                    EventPayload::SecretTransferred {
                        from: secret.picker_id,
                        to: target,
                    },
                )));
            }
            None => {
                // Nobody can receive it: a zero-point resolution.
                ctx.game.state.secret_question_data = None;
                mutations.extend(router::resolve_question(&mut ctx.game, router_ctx));
            }
        }
        mutations.extend(save_and_sync(&ctx.game));
        Ok(mutations)
    }

    /// The current bidder ran out of time: a forced opening bid for the
    /// opener, a pass for everyone else.
    fn stake_deadline(
        &self,
        ctx: &mut ActionContext<'_>,
        router_ctx: &RouterContext<'_>,
    ) -> Result<Vec<DataMutation>, AppError> {
        let price = ctx
            .game
            .state
            .current_question
            .as_ref()
            .map(|q| q.price)
            .ok_or_else(|| DomainError::invariant("BIDDING without a current question"))?;

        let mut stake = match ctx.game.state.stake_question_data.take() {
            Some(stake) => stake,
            None => return Ok(Vec::new()),
        };
        let Some(bidder) = stake.current_bidder() else {
            ctx.game.state.stake_question_data = Some(stake);
            return Ok(Vec::new());
        };
        let score = ctx.game.player(bidder).map(|p| p.score).unwrap_or(0);

        let forced = if stake.bids.is_empty() {
            // Openers must open; an unaffordable price becomes a
            // minimal all-in on their behalf.
            match stake.validate_bid(bidder, score, price, StakeBidInput::Normal { amount: price })
            {
                Ok(bid) => bid,
                Err(_) => StakeBid::AllIn { amount: score },
            }
        } else {
            StakeBid::Pass
        };
        stake.record_bid(bidder, forced);

        let mut mutations = vec![DataMutation::Broadcast(BroadcastEvent::to_game(
            EventPayload::StakeBidPlaced {
                player_id: bidder,
                highest_bid: stake.highest_bid,
            },
        ))];

        let auction_over = stake.is_complete() || stake.advance_turn().is_none();
        if auction_over {
            mutations.extend(
                router::stake_completed(&mut ctx.game, router_ctx, &mut stake)
                    .map_err(AppError::from)?,
            );
        } else {
            mutations.push(DataMutation::TimerDelete);
            mutations.push(DataMutation::TimerSet(Timer::start(
                TimerKind::Bid,
                ctx.config.bid_timer_ms,
                ctx.now,
            )));
        }
        ctx.game.state.stake_question_data = Some(stake);
        mutations.extend(save_and_sync(&ctx.game));
        Ok(mutations)
    }
}
