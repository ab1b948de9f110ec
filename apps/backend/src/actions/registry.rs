//! Action handler registry: a closed table from action type to handler.
//!
//! Registration is explicit and total — every action type must have a
//! handler, checked once at startup so a missing registration is a
//! boot failure, never a runtime surprise.

use std::collections::HashMap;
use std::sync::Arc;

use crate::actions::final_round::{
    EliminateThemeHandler, PlaceFinalBidHandler, ReviewFinalAnswerHandler,
    SubmitFinalAnswerHandler,
};
use crate::actions::membership::{
    ChangeRoleHandler, ChangeScoreHandler, ChangeSlotHandler, DepartureHandler, DepartureKind,
    JoinGameHandler, PlayerReadyHandler, StartGameHandler,
};
use crate::actions::question_flow::{
    AnswerResultHandler, NextRoundHandler, PauseHandler, PickQuestionHandler, ShowmanSkipHandler,
    SkipQuestionHandler, SubmitAnswerHandler, UnpauseHandler, UnskipQuestionHandler,
};
use crate::actions::secret_transfer::TransferSecretHandler;
use crate::actions::stake_bid::PlaceStakeBidHandler;
use crate::actions::timer_expired::TimerExpiredHandler;
use crate::actions::{ActionHandler, ActionType};
use crate::error::AppError;

pub struct HandlerRegistry {
    handlers: HashMap<ActionType, Arc<dyn ActionHandler>>,
}

impl HandlerRegistry {
    /// Build the full table. One shared instance serves every
    /// timer-expiration variant.
    pub fn build() -> Self {
        let mut handlers: HashMap<ActionType, Arc<dyn ActionHandler>> = HashMap::new();

        handlers.insert(ActionType::JoinGame, Arc::new(JoinGameHandler));
        handlers.insert(ActionType::PlayerReady, Arc::new(PlayerReadyHandler));
        handlers.insert(ActionType::StartGame, Arc::new(StartGameHandler));
        handlers.insert(ActionType::PickQuestion, Arc::new(PickQuestionHandler));
        handlers.insert(ActionType::SubmitAnswer, Arc::new(SubmitAnswerHandler));
        handlers.insert(ActionType::AnswerResult, Arc::new(AnswerResultHandler));
        handlers.insert(ActionType::SkipQuestion, Arc::new(SkipQuestionHandler));
        handlers.insert(ActionType::ShowmanSkip, Arc::new(ShowmanSkipHandler));
        handlers.insert(ActionType::UnskipQuestion, Arc::new(UnskipQuestionHandler));
        handlers.insert(ActionType::NextRound, Arc::new(NextRoundHandler));
        handlers.insert(ActionType::Pause, Arc::new(PauseHandler));
        handlers.insert(ActionType::Unpause, Arc::new(UnpauseHandler));
        handlers.insert(ActionType::ChangeRole, Arc::new(ChangeRoleHandler));
        handlers.insert(ActionType::ChangeScore, Arc::new(ChangeScoreHandler));
        handlers.insert(ActionType::ChangeSlot, Arc::new(ChangeSlotHandler));
        handlers.insert(
            ActionType::Disconnect,
            Arc::new(DepartureHandler::new(DepartureKind::Disconnect)),
        );
        handlers.insert(
            ActionType::Leave,
            Arc::new(DepartureHandler::new(DepartureKind::Leave)),
        );
        handlers.insert(
            ActionType::Kick,
            Arc::new(DepartureHandler::new(DepartureKind::Kick)),
        );
        handlers.insert(ActionType::PlaceStakeBid, Arc::new(PlaceStakeBidHandler));
        handlers.insert(ActionType::TransferSecret, Arc::new(TransferSecretHandler));
        handlers.insert(ActionType::EliminateTheme, Arc::new(EliminateThemeHandler));
        handlers.insert(ActionType::PlaceFinalBid, Arc::new(PlaceFinalBidHandler));
        handlers.insert(
            ActionType::SubmitFinalAnswer,
            Arc::new(SubmitFinalAnswerHandler),
        );
        handlers.insert(
            ActionType::ReviewFinalAnswer,
            Arc::new(ReviewFinalAnswerHandler),
        );

        let timer_handler: Arc<dyn ActionHandler> = Arc::new(TimerExpiredHandler);
        for action in ActionType::ALL {
            if action.is_timer_expiration() {
                handlers.insert(action, timer_handler.clone());
            }
        }

        Self { handlers }
    }

    pub fn get(&self, action: ActionType) -> Result<&Arc<dyn ActionHandler>, AppError> {
        self.handlers
            .get(&action)
            .ok_or_else(|| AppError::internal(format!("no handler registered for {action:?}")))
    }

    /// Startup check: the table must cover the whole action set.
    pub fn verify_total(&self) -> Result<(), AppError> {
        for action in ActionType::ALL {
            if !self.handlers.contains_key(&action) {
                return Err(AppError::config(format!(
                    "action {action:?} has no registered handler"
                )));
            }
        }
        Ok(())
    }
}
