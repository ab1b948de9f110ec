//! Domain layer: pure game logic types and helpers.

pub mod final_round;
pub mod game;
pub mod package;
pub mod secret;
pub mod snapshot;
pub mod stake;
pub mod state;
pub mod timer;

#[cfg(test)]
pub(crate) mod test_fixtures;
#[cfg(test)]
pub(crate) mod test_prelude;
#[cfg(test)]
mod tests_props_scoring;
#[cfg(test)]
mod tests_props_stake;
#[cfg(test)]
mod tests_serde_roundtrip;
#[cfg(test)]
mod tests_stake;

// Re-exports for ergonomics
pub use game::{Game, GameId, Player, PlayerGameStatus, PlayerId, PlayerRole};
pub use package::{GamePackage, PackRound, Question, QuestionKind, RoundKind, Theme};
pub use state::{GameState, QuestionState};
pub use timer::{Timer, TimerKind};
