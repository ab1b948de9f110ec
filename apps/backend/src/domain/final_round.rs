use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::game::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalRoundPhase {
    ThemeElimination,
    Bidding,
    Answering,
    Reviewing,
}

/// One player's written final-round answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAnswer {
    pub id: Uuid,
    pub player_id: PlayerId,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
    pub is_correct: Option<bool>,
    /// Set when the player never submitted and the deadline fired.
    pub auto_loss: bool,
}

/// State of the closing round: theme elimination, blind bidding,
/// simultaneous answering, and showman review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalRoundData {
    pub phase: FinalRoundPhase,
    pub turn_order: Vec<PlayerId>,
    pub turn_index: usize,
    pub bids: BTreeMap<PlayerId, i64>,
    pub answers: Vec<FinalAnswer>,
    pub eliminated_themes: Vec<i64>,
}

impl FinalRoundData {
    pub fn new(turn_order: Vec<PlayerId>) -> Self {
        Self {
            phase: FinalRoundPhase::ThemeElimination,
            turn_order,
            turn_index: 0,
            bids: BTreeMap::new(),
            answers: Vec::new(),
            eliminated_themes: Vec::new(),
        }
    }

    pub fn current_turn(&self) -> Option<PlayerId> {
        self.turn_order.get(self.turn_index).copied()
    }

    pub fn advance_turn(&mut self) {
        if !self.turn_order.is_empty() {
            self.turn_index = (self.turn_index + 1) % self.turn_order.len();
        }
    }

    pub fn answer_of(&self, player: PlayerId) -> Option<&FinalAnswer> {
        self.answers.iter().find(|a| a.player_id == player)
    }

    pub fn answer_of_mut(&mut self, player: PlayerId) -> Option<&mut FinalAnswer> {
        self.answers.iter_mut().find(|a| a.player_id == player)
    }

    /// Completeness check for the answering phase. Players whose bid is
    /// non-positive are exempt: they have nothing at stake.
    pub fn all_answers_submitted(&self, participants: &[PlayerId]) -> bool {
        participants
            .iter()
            .filter(|p| self.bids.get(p).copied().unwrap_or(0) > 0)
            .all(|p| self.answer_of(*p).is_some())
    }

    /// Next submitted answer awaiting a review verdict.
    pub fn next_unreviewed(&self) -> Option<&FinalAnswer> {
        self.answers
            .iter()
            .find(|a| a.is_correct.is_none() && !a.auto_loss)
    }
}

/// Clamp a requested final bid into `[minimum, max(score, minimum)]`.
/// A non-positive score forces the minimum bid.
pub fn clamp_final_bid(requested: i64, score: i64, minimum: i64) -> i64 {
    if score <= 0 {
        return minimum;
    }
    requested.clamp(minimum, score.max(minimum))
}

/// Apply a review verdict: `±bid`, clamped to the per-review delta cap
/// and the absolute score ceiling. Soft caps, not hard failures.
pub fn apply_review(score: i64, bid: i64, correct: bool, max_delta: i64, max_score: i64) -> i64 {
    let delta = bid.abs().min(max_delta);
    let next = if correct {
        score.saturating_add(delta)
    } else {
        score.saturating_sub(delta)
    };
    next.clamp(-max_score, max_score)
}
