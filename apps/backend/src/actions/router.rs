//! Phase transition router.
//!
//! Advances the question/round state machine and resolves the
//! cross-cutting events several handlers share: question entry by
//! kind, answerer exhaustion, round exhaustion, final-round entry, and
//! forced resolution when a sole bidder or answerer departs. Handlers
//! own validation; the router owns what happens next.

use time::OffsetDateTime;
use tracing::debug;

use crate::config::EngineConfig;
use crate::domain::final_round::{FinalRoundData, FinalRoundPhase};
use crate::domain::game::{Game, PlayerId, PlayerRole};
use crate::domain::package::{GamePackage, QuestionKind, RoundKind};
use crate::domain::secret::SecretQuestionData;
use crate::domain::stake::{StakeBid, StakeQuestionData};
use crate::domain::state::{AnswerVerdict, AnsweredPlayer, CurrentQuestion, QuestionState};
use crate::domain::timer::{Timer, TimerKind};
use crate::engine::mutation::DataMutation;
use crate::errors::domain::{DomainError, NotFoundKind, ValidationKind};
use crate::services::broadcast::{BroadcastEvent, EventPayload};

/// Read-only collaborators the router needs alongside the game.
pub struct RouterContext<'a> {
    pub package: &'a GamePackage,
    pub config: &'a EngineConfig,
    pub now: OffsetDateTime,
}

impl RouterContext<'_> {
    fn timer(&self, kind: TimerKind, duration_ms: u64) -> Vec<DataMutation> {
        vec![
            DataMutation::TimerSet(Timer::start(kind, duration_ms, self.now)),
            DataMutation::Broadcast(BroadcastEvent::to_game(EventPayload::TimerStarted {
                kind,
                duration_ms,
            })),
        ]
    }
}

/// Put a picked question on the table and branch by its kind.
pub fn enter_question(
    game: &mut Game,
    rcx: &RouterContext<'_>,
    question_id: i64,
    picker: PlayerId,
) -> Result<Vec<DataMutation>, DomainError> {
    let round = rcx
        .package
        .round(game.state.current_round)
        .ok_or_else(|| {
            DomainError::not_found(
                NotFoundKind::Round,
                format!("round {} is not in the package", game.state.current_round),
            )
        })?;

    if !round.question_ids().any(|id| id == question_id) {
        return Err(DomainError::not_found(
            NotFoundKind::Question,
            format!("question {question_id} is not on this round's board"),
        ));
    }
    if game.state.played_questions.contains(&question_id) {
        return Err(DomainError::validation(
            ValidationKind::PhaseMismatch,
            format!("question {question_id} was already played"),
        ));
    }

    let (theme, question) = rcx
        .package
        .question_with_theme(question_id)
        .ok_or_else(|| {
            DomainError::not_found(NotFoundKind::Question, format!("question {question_id}"))
        })?;

    game.state.current_question = Some(CurrentQuestion {
        question_id,
        theme_id: theme.id,
        price: question.price,
    });
    game.state.played_questions.push(question_id);
    game.state.question_players = game.active_players().map(|p| p.id).collect();
    game.state.answered_players.clear();
    game.state.skipped_players.clear();

    debug!(game_id = %game.id, question_id, kind = ?question.kind, "question entered");

    match &question.kind {
        QuestionKind::Ordinary => {
            game.state.question_state = QuestionState::Showing;
            Ok(rcx.timer(TimerKind::Question, rcx.config.question_timer_ms))
        }
        QuestionKind::Secret { transfer } => {
            game.state.question_state = QuestionState::SecretTransfer;
            game.state.secret_question_data =
                Some(SecretQuestionData::new(picker, *transfer, question_id));
            // Deadline on the transfer decision so an absent picker
            // cannot stall the game.
            Ok(rcx.timer(TimerKind::Bid, rcx.config.bid_timer_ms))
        }
        QuestionKind::Stake { max_price } => {
            game.state.question_state = QuestionState::Bidding;
            let order: Vec<PlayerId> = game.state.question_players.clone();
            let mut stake = StakeQuestionData::new(
                picker,
                order,
                max_price.unwrap_or(rcx.config.default_max_stake_price),
            );

            let picker_score = game.player(picker).map(|p| p.score).unwrap_or(0);
            if picker_score < question.price {
                // Forced opening: the picker cannot afford the nominal
                // price, so a minimal all-in is placed on their behalf.
                stake.record_bid(picker, StakeBid::AllIn {
                    amount: picker_score,
                });
                stake.advance_turn();
            }

            let mut mutations = Vec::new();
            if stake.is_complete() || stake.contenders().is_empty() {
                mutations.extend(stake_completed(game, rcx, &mut stake)?);
            } else {
                mutations.extend(rcx.timer(TimerKind::Bid, rcx.config.bid_timer_ms));
            }
            game.state.stake_question_data = Some(stake);
            Ok(mutations)
        }
    }
}

/// Close the stake auction: the winner answers for their bid.
pub fn stake_completed(
    game: &mut Game,
    rcx: &RouterContext<'_>,
    stake: &mut StakeQuestionData,
) -> Result<Vec<DataMutation>, DomainError> {
    let winner = stake.complete()?;
    let amount = stake.highest_bid.unwrap_or(0);
    game.state.question_state = QuestionState::Answering;
    game.state.answering_player = Some(winner);

    let mut mutations = vec![DataMutation::Broadcast(BroadcastEvent::to_game(
        EventPayload::StakeWinner {
            player_id: winner,
            amount,
        },
    ))];
    mutations.extend(rcx.timer(TimerKind::Answer, rcx.config.answer_timer_ms));
    Ok(mutations)
}

/// Record an answer outcome against the current question.
pub fn record_answer(game: &mut Game, player: PlayerId, verdict: AnswerVerdict, delta: i64) {
    game.state.answered_players.push(AnsweredPlayer {
        player_id: player,
        verdict,
        delta,
    });
    if let Some(p) = game.player_mut(player) {
        p.score = p.score.saturating_add(delta);
    }
}

/// A wrong answer hands the question back to the floor — unless nobody
/// eligible remains, in which case the reveal starts immediately
/// (no countdown with no one left to answer).
pub fn continue_after_wrong_answer(
    game: &mut Game,
    rcx: &RouterContext<'_>,
) -> Vec<DataMutation> {
    game.state.answering_player = None;

    let exclusive = game.state.stake_question_data.is_some()
        || game.state.secret_question_data.is_some();
    if !exclusive && !game.eligible_answerers().is_empty() {
        game.state.question_state = QuestionState::Showing;
        return rcx.timer(TimerKind::Question, rcx.config.question_timer_ms);
    }
    resolve_question(game, rcx)
}

/// Force the reveal phase: correct answer, exhaustion, or a forced
/// zero-point resolution.
pub fn resolve_question(game: &mut Game, rcx: &RouterContext<'_>) -> Vec<DataMutation> {
    game.state.question_state = QuestionState::ShowingAnswer;
    game.state.answering_player = None;
    let mut mutations = vec![DataMutation::TimerDelete];
    mutations.extend(rcx.timer(TimerKind::Question, rcx.config.answer_reveal_ms));
    mutations
}

/// Leave the reveal: back to the board, or on an exhausted board to
/// the next round.
pub fn finish_question(
    game: &mut Game,
    rcx: &RouterContext<'_>,
) -> Result<Vec<DataMutation>, DomainError> {
    game.state.reset_question();

    let round = rcx
        .package
        .round(game.state.current_round)
        .ok_or_else(|| DomainError::invariant("current round missing from package"))?;
    let exhausted = round
        .question_ids()
        .all(|id| game.state.played_questions.contains(&id));

    if exhausted {
        return advance_round(game, rcx);
    }
    Ok(vec![DataMutation::TimerDelete])
}

/// Move to the next round; entered by board exhaustion or by the
/// showman's explicit NEXT_ROUND.
pub fn advance_round(
    game: &mut Game,
    rcx: &RouterContext<'_>,
) -> Result<Vec<DataMutation>, DomainError> {
    let next_order = game.state.current_round + 1;
    let Some(round) = rcx.package.round(next_order) else {
        return Ok(finish_game(game, rcx));
    };

    game.state.reset_question();
    game.state.current_round = next_order;
    game.state.played_questions.clear();

    let mut mutations = vec![
        DataMutation::TimerDelete,
        DataMutation::Broadcast(BroadcastEvent::to_game(EventPayload::RoundChanged {
            round: next_order,
        })),
    ];

    if round.kind == RoundKind::Final {
        mutations.extend(enter_final_round(game, rcx)?);
    }
    Ok(mutations)
}

/// Seed the final round: eligible players (positive score) in slot
/// order; with nobody eligible the showman is substituted so the round
/// still has a driver.
pub fn enter_final_round(
    game: &mut Game,
    rcx: &RouterContext<'_>,
) -> Result<Vec<DataMutation>, DomainError> {
    let mut eligible: Vec<&crate::domain::game::Player> = game
        .active_players()
        .filter(|p| p.score > 0)
        .collect();
    eligible.sort_by_key(|p| p.slot.unwrap_or(u8::MAX));
    let mut order: Vec<PlayerId> = eligible.iter().map(|p| p.id).collect();

    if order.is_empty() {
        match game.showman() {
            Some(showman) => order.push(showman.id),
            None => return Ok(finish_game(game, rcx)),
        }
    }

    game.state.current_turn_player_id = order.first().copied();
    game.state.final_round_data = Some(FinalRoundData::new(order));
    game.state.question_state = QuestionState::ThemeElimination;

    let mut mutations = rcx.timer(TimerKind::Final, rcx.config.final_timer_ms);

    // A board with a single theme has nothing to eliminate.
    if remaining_final_themes(game, rcx).len() <= 1 {
        mutations.extend(begin_final_bidding(game, rcx)?);
    }
    Ok(mutations)
}

/// Theme ids of the final round not yet eliminated.
pub fn remaining_final_themes(game: &Game, rcx: &RouterContext<'_>) -> Vec<i64> {
    let eliminated = game
        .state
        .final_round_data
        .as_ref()
        .map(|d| d.eliminated_themes.clone())
        .unwrap_or_default();
    rcx.package
        .round(game.state.current_round)
        .map(|round| {
            round
                .themes
                .iter()
                .map(|t| t.id)
                .filter(|id| !eliminated.contains(id))
                .collect()
        })
        .unwrap_or_default()
}

/// One theme left: open the blind bidding phase.
pub fn begin_final_bidding(
    game: &mut Game,
    rcx: &RouterContext<'_>,
) -> Result<Vec<DataMutation>, DomainError> {
    let data = game
        .state
        .final_round_data
        .as_mut()
        .ok_or_else(|| DomainError::invariant("final bidding without final payload"))?;
    data.phase = FinalRoundPhase::Bidding;
    game.state.question_state = QuestionState::Bidding;
    Ok(rcx.timer(TimerKind::Final, rcx.config.final_timer_ms))
}

/// Everybody bid: reveal the question, collect written answers.
pub fn begin_final_answering(
    game: &mut Game,
    rcx: &RouterContext<'_>,
) -> Result<Vec<DataMutation>, DomainError> {
    let data = game
        .state
        .final_round_data
        .as_mut()
        .ok_or_else(|| DomainError::invariant("final answering without final payload"))?;
    data.phase = FinalRoundPhase::Answering;
    game.state.question_state = QuestionState::Answering;
    game.state.answering_player = None;
    Ok(rcx.timer(TimerKind::Final, rcx.config.final_timer_ms))
}

/// All answers in: the showman reviews them one by one.
pub fn begin_final_review(
    game: &mut Game,
    _rcx: &RouterContext<'_>,
) -> Result<Vec<DataMutation>, DomainError> {
    let data = game
        .state
        .final_round_data
        .as_mut()
        .ok_or_else(|| DomainError::invariant("final review without final payload"))?;
    data.phase = FinalRoundPhase::Reviewing;
    game.state.question_state = QuestionState::Reviewing;
    Ok(vec![DataMutation::TimerDelete])
}

/// Terminate the match and declare completion bookkeeping.
pub fn finish_game(game: &mut Game, rcx: &RouterContext<'_>) -> Vec<DataMutation> {
    game.finished_at = Some(rcx.now);
    let scores: Vec<(PlayerId, i64)> = game
        .players
        .iter()
        .filter(|p| p.role == PlayerRole::Player)
        .map(|p| (p.id, p.score))
        .collect();

    vec![
        DataMutation::TimerDelete,
        DataMutation::Broadcast(BroadcastEvent::to_game(EventPayload::GameFinished {
            scores: scores.clone(),
        })),
        DataMutation::GameCompletion {
            final_scores: scores,
        },
    ]
}

/// Cross-cutting departure handling (disconnect, leave, kick).
///
/// A departing sole answerer is recorded as an automatic zero-score
/// skip; a departing sole bidder force-resolves the auction; a
/// departing turn holder passes the turn — the sub-phase never stalls
/// waiting for someone who is gone.
pub fn handle_departure(
    game: &mut Game,
    rcx: &RouterContext<'_>,
    departed: PlayerId,
) -> Result<Vec<DataMutation>, DomainError> {
    let mut mutations = Vec::new();

    match game.state.question_state {
        QuestionState::Answering if game.state.final_round_data.is_none() => {
            if game.state.answering_player == Some(departed) {
                record_answer(game, departed, AnswerVerdict::Skip, 0);
                game.state.answering_player = None;
                let exclusive = game.state.stake_question_data.is_some()
                    || game.state.secret_question_data.is_some();
                if !exclusive && !game.eligible_answerers().is_empty() {
                    game.state.question_state = QuestionState::Showing;
                    mutations.push(DataMutation::TimerDelete);
                    mutations.extend(rcx.timer(TimerKind::Question, rcx.config.question_timer_ms));
                } else {
                    mutations.extend(resolve_question(game, rcx));
                }
            }
        }
        QuestionState::Showing => {
            // The departed player counts as skipped; with nobody left
            // the reveal starts immediately.
            if game.state.question_players.contains(&departed)
                && !game.state.skipped_players.contains(&departed)
            {
                game.state.skipped_players.push(departed);
            }
            if game.eligible_answerers().is_empty() {
                mutations.extend(resolve_question(game, rcx));
            }
        }
        QuestionState::Bidding if game.state.stake_question_data.is_some() => {
            let mut stake = game
                .state
                .stake_question_data
                .take()
                .ok_or_else(|| DomainError::invariant("stake payload vanished"))?;
            stake.forfeit(departed);
            if stake.contenders().is_empty() {
                // Zero-point outcome: nobody left to fight for it.
                game.state.stake_question_data = None;
                mutations.extend(resolve_question(game, rcx));
                return Ok(mutations);
            }
            if stake.is_complete() {
                mutations.extend(stake_completed(game, rcx, &mut stake)?);
            } else if stake.current_bidder() == Some(departed) {
                stake.advance_turn();
                mutations.push(DataMutation::TimerDelete);
                mutations.extend(rcx.timer(TimerKind::Bid, rcx.config.bid_timer_ms));
            }
            game.state.stake_question_data = Some(stake);
        }
        QuestionState::SecretTransfer => {
            let is_picker = game
                .state
                .secret_question_data
                .as_ref()
                .map(|d| d.picker_id == departed)
                .unwrap_or(false);
            if is_picker {
                game.state.secret_question_data = None;
                mutations.extend(resolve_question(game, rcx));
            }
        }
        QuestionState::ThemeElimination => {
            if let Some(data) = game.state.final_round_data.as_mut() {
                if data.current_turn() == Some(departed) {
                    data.advance_turn();
                    game.state.current_turn_player_id = data.current_turn();
                }
            }
        }
        _ => {}
    }

    // A departing turn holder on the board passes the turn along.
    if game.state.question_state == QuestionState::Choosing
        && game.state.current_turn_player_id == Some(departed)
    {
        let next_turn_player_id = game.active_players().map(|p| p.id).next();
        game.state.current_turn_player_id = next_turn_player_id;
    }

    Ok(mutations)
}
