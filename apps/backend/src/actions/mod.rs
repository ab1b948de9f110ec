//! Action layer: the typed requests that mutate a game, and the
//! handlers that decide what each one does.
//!
//! Handlers are pure: `(context) -> outcome`. They never touch the
//! store; every side effect is declared as a [`DataMutation`] and
//! applied afterwards by the mutation processor.

pub mod final_round;
pub mod membership;
pub mod question_flow;
pub mod registry;
pub mod router;
pub mod secret_transfer;
pub mod stake_bid;
pub mod timer_expired;

#[cfg(test)]
mod tests_final_round;
#[cfg(test)]
mod tests_membership;
#[cfg(test)]
mod tests_stake_bid;
#[cfg(test)]
pub(crate) mod test_support;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::EngineConfig;
use crate::domain::game::{Game, PlayerId, PlayerRole};
use crate::domain::package::GamePackage;
use crate::domain::timer::Timer;
use crate::engine::mutation::DataMutation;
use crate::error::{AppError, ErrorBody};
use crate::errors::ErrorCode;

/// Closed set of action types the engine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    JoinGame,
    PlayerReady,
    StartGame,
    PickQuestion,
    SubmitAnswer,
    AnswerResult,
    SkipQuestion,
    ShowmanSkip,
    UnskipQuestion,
    NextRound,
    Pause,
    Unpause,
    ChangeRole,
    ChangeScore,
    ChangeSlot,
    Disconnect,
    Leave,
    Kick,
    PlaceStakeBid,
    TransferSecret,
    EliminateTheme,
    PlaceFinalBid,
    SubmitFinalAnswer,
    ReviewFinalAnswer,
    QuestionTimerExpired,
    AnswerTimerExpired,
    BidTimerExpired,
    FinalTimerExpired,
}

impl ActionType {
    /// Total enumeration, used by the registry's startup check.
    pub const ALL: [ActionType; 28] = [
        ActionType::JoinGame,
        ActionType::PlayerReady,
        ActionType::StartGame,
        ActionType::PickQuestion,
        ActionType::SubmitAnswer,
        ActionType::AnswerResult,
        ActionType::SkipQuestion,
        ActionType::ShowmanSkip,
        ActionType::UnskipQuestion,
        ActionType::NextRound,
        ActionType::Pause,
        ActionType::Unpause,
        ActionType::ChangeRole,
        ActionType::ChangeScore,
        ActionType::ChangeSlot,
        ActionType::Disconnect,
        ActionType::Leave,
        ActionType::Kick,
        ActionType::PlaceStakeBid,
        ActionType::TransferSecret,
        ActionType::EliminateTheme,
        ActionType::PlaceFinalBid,
        ActionType::SubmitFinalAnswer,
        ActionType::ReviewFinalAnswer,
        ActionType::QuestionTimerExpired,
        ActionType::AnswerTimerExpired,
        ActionType::BidTimerExpired,
        ActionType::FinalTimerExpired,
    ];

    /// Actions fired by timer expiry rather than a socket.
    pub fn is_timer_expiration(&self) -> bool {
        matches!(
            self,
            ActionType::QuestionTimerExpired
                | ActionType::AnswerTimerExpired
                | ActionType::BidTimerExpired
                | ActionType::FinalTimerExpired
        )
    }
}

/// Transport-agnostic action envelope; also the queue entry format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub game_id: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub socket_id: String,
}

/// Everything a handler may look at. Built by the executor after the
/// IN pipeline; owned mutably so handlers edit the game in place and
/// then declare a save.
pub struct ActionContext<'a> {
    pub game: Game,
    /// Resolved from the caller's socket session; None for timer
    /// actions and unknown sockets.
    pub current_player_id: Option<PlayerId>,
    pub timer: Option<Timer>,
    pub payload: serde_json::Value,
    pub package: &'a GamePackage,
    pub config: &'a EngineConfig,
    pub now: OffsetDateTime,
    pub socket_id: String,
}

impl ActionContext<'_> {
    /// Deserialize the action payload into its typed form.
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| AppError::validation(ErrorCode::InvalidPayload, e.to_string()))
    }

    /// The caller, required to be a member of the game.
    pub fn require_player(&self) -> Result<PlayerId, AppError> {
        let id = self.current_player_id.ok_or_else(|| {
            AppError::validation(ErrorCode::NotAMember, "caller has no session in this game")
        })?;
        if self.game.player(id).is_none() {
            return Err(AppError::validation(
                ErrorCode::NotAMember,
                "caller is not a member of this game",
            ));
        }
        Ok(id)
    }

    /// The caller, required to be the showman.
    pub fn require_showman(&self) -> Result<PlayerId, AppError> {
        let id = self.require_player()?;
        if !self.game.is_showman(id) {
            return Err(AppError::validation(
                ErrorCode::InsufficientRole,
                "only the showman may do this",
            ));
        }
        Ok(id)
    }

    /// The caller, required to hold a scoring role.
    pub fn require_scoring_player(&self) -> Result<PlayerId, AppError> {
        let id = self.require_player()?;
        let player = self.game.player(id).ok_or_else(|| {
            AppError::validation(ErrorCode::NotAMember, "caller is not a member of this game")
        })?;
        if player.role != PlayerRole::Player {
            return Err(AppError::validation(
                ErrorCode::InsufficientRole,
                "only a scoring player may do this",
            ));
        }
        Ok(id)
    }

    /// Gameplay actions are rejected while the game is paused.
    pub fn ensure_not_paused(&self) -> Result<(), AppError> {
        if self.game.paused {
            return Err(AppError::conflict(ErrorCode::Conflict, "game is paused"));
        }
        Ok(())
    }
}

/// What a handler decided.
#[derive(Debug)]
pub struct HandlerOutcome {
    pub success: bool,
    pub mutations: Vec<DataMutation>,
    pub response: Option<serde_json::Value>,
    /// Overrides the game used for broadcast rendering; rarely needed.
    pub broadcast_game: Option<Game>,
}

impl HandlerOutcome {
    pub fn ok(mutations: Vec<DataMutation>) -> Self {
        Self {
            success: true,
            mutations,
            response: None,
            broadcast_game: None,
        }
    }

    pub fn with_response(mut self, response: serde_json::Value) -> Self {
        self.response = Some(response);
        self
    }
}

/// One handler per action type; stateless, holding only read-only
/// collaborators.
pub trait ActionHandler: Send + Sync {
    fn handle(&self, ctx: &mut ActionContext<'_>) -> Result<HandlerOutcome, AppError>;
}

/// Terminal result of executing one action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionResult {
    /// Applied (successfully or not) under the lock.
    Completed {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ErrorBody>,
    },
    /// The game was locked by another execution; the action waits in
    /// the per-game queue.
    Queued,
}
