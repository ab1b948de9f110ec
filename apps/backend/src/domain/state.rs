use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::domain::final_round::FinalRoundData;
use crate::domain::game::PlayerId;
use crate::domain::secret::SecretQuestionData;
use crate::domain::stake::StakeQuestionData;
use crate::domain::timer::Timer;
use crate::errors::domain::DomainError;

/// Question/phase state machine positions.
///
/// Ordinary loop: `CHOOSING → SHOWING → ANSWERING → SHOWING_ANSWER →
/// CHOOSING`. Stake and secret questions branch into `BIDDING` /
/// `SECRET_TRANSFER` for exactly one question; the final round runs
/// `THEME_ELIMINATION → BIDDING → ANSWERING → REVIEWING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionState {
    Choosing,
    Showing,
    Answering,
    ShowingAnswer,
    SecretTransfer,
    Bidding,
    ThemeElimination,
    Reviewing,
}

/// Outcome recorded against a player for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnswerVerdict {
    Correct,
    Wrong,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnsweredPlayer {
    pub player_id: PlayerId,
    pub verdict: AnswerVerdict,
    /// Score delta applied for this answer (0 for a skip).
    pub delta: i64,
}

/// The question currently on the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentQuestion {
    pub question_id: i64,
    pub theme_id: i64,
    pub price: i64,
}

/// Which special sub-protocol is active, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialData {
    Secret,
    Stake,
    FinalRound,
}

/// The mutable heart of a [`crate::domain::game::Game`].
///
/// Invariant: at most one of `secret_question_data`,
/// `stake_question_data`, `final_round_data` is non-null, and only while
/// `question_state` sits in the corresponding sub-phase; all are null
/// during ordinary `CHOOSING`/`SHOWING`.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub question_state: QuestionState,
    /// 1-based order of the current round within the package.
    pub current_round: u32,
    pub current_question: Option<CurrentQuestion>,
    pub current_turn_player_id: Option<PlayerId>,
    pub answering_player: Option<PlayerId>,
    #[serde(default)]
    pub answered_players: Vec<AnsweredPlayer>,
    #[serde(default)]
    pub skipped_players: Vec<PlayerId>,
    /// Participant snapshot taken when the question was picked.
    #[serde(default)]
    pub question_players: Vec<PlayerId>,
    /// Question ids consumed in the current round.
    #[serde(default)]
    pub played_questions: Vec<i64>,
    /// The sub-phase timer frozen by a pause, restarted on unpause.
    pub paused_timer: Option<Timer>,
    pub secret_question_data: Option<SecretQuestionData>,
    pub stake_question_data: Option<StakeQuestionData>,
    pub final_round_data: Option<FinalRoundData>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            question_state: QuestionState::Choosing,
            current_round: 0,
            current_question: None,
            current_turn_player_id: None,
            answering_player: None,
            answered_players: Vec::new(),
            skipped_players: Vec::new(),
            question_players: Vec::new(),
            played_questions: Vec::new(),
            paused_timer: None,
            secret_question_data: None,
            stake_question_data: None,
            final_round_data: None,
        }
    }

    /// The special sub-protocol payload currently present, if any.
    pub fn active_special(&self) -> Option<SpecialData> {
        if self.secret_question_data.is_some() {
            Some(SpecialData::Secret)
        } else if self.stake_question_data.is_some() {
            Some(SpecialData::Stake)
        } else if self.final_round_data.is_some() {
            Some(SpecialData::FinalRound)
        } else {
            None
        }
    }

    /// Clear all per-question bookkeeping when returning to `CHOOSING`.
    pub fn reset_question(&mut self) {
        self.question_state = QuestionState::Choosing;
        self.current_question = None;
        self.answering_player = None;
        self.answered_players.clear();
        self.skipped_players.clear();
        self.question_players.clear();
        self.paused_timer = None;
        self.secret_question_data = None;
        self.stake_question_data = None;
    }

    /// Check the exactly-one-special-payload invariant against the
    /// current phase. Violations are server errors, never user errors.
    pub fn check_special_invariant(&self) -> Result<(), DomainError> {
        let specials = [
            self.secret_question_data.is_some(),
            self.stake_question_data.is_some(),
            self.final_round_data.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count();

        if specials > 1 {
            return Err(DomainError::invariant(format!(
                "more than one special payload present in {:?}",
                self.question_state
            )));
        }

        match self.question_state {
            QuestionState::Choosing | QuestionState::Showing
                if self.active_special() == Some(SpecialData::Secret)
                    || self.active_special() == Some(SpecialData::Stake) =>
            {
                Err(DomainError::invariant(format!(
                    "special payload left behind in {:?}",
                    self.question_state
                )))
            }
            QuestionState::SecretTransfer if self.secret_question_data.is_none() => Err(
                DomainError::invariant("SECRET_TRANSFER without secret payload"),
            ),
            QuestionState::ThemeElimination | QuestionState::Reviewing
                if self.final_round_data.is_none() =>
            {
                Err(DomainError::invariant(format!(
                    "{:?} without final-round payload",
                    self.question_state
                )))
            }
            _ => Ok(()),
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn require_current_question(state: &GameState) -> Result<&CurrentQuestion, DomainError> {
    state
        .current_question
        .as_ref()
        .ok_or_else(|| DomainError::invariant("current_question must be set"))
}

pub fn require_answering_player(state: &GameState) -> Result<PlayerId, DomainError> {
    state
        .answering_player
        .ok_or_else(|| DomainError::invariant("answering_player must be set"))
}

pub fn require_stake_data(state: &mut GameState) -> Result<&mut StakeQuestionData, DomainError> {
    state
        .stake_question_data
        .as_mut()
        .ok_or_else(|| DomainError::invariant("stake payload must be set"))
}

pub fn require_secret_data(state: &mut GameState) -> Result<&mut SecretQuestionData, DomainError> {
    state
        .secret_question_data
        .as_mut()
        .ok_or_else(|| DomainError::invariant("secret payload must be set"))
}

pub fn require_final_data(state: &mut GameState) -> Result<&mut FinalRoundData, DomainError> {
    state
        .final_round_data
        .as_mut()
        .ok_or_else(|| DomainError::invariant("final-round payload must be set"))
}
