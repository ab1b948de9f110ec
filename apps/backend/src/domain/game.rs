use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::state::{GameState, QuestionState};

/// Games are keyed by an externally issued string id (`game:{id}` in the
/// store); players by the numeric user id carried in the socket session.
pub type GameId = String;
pub type PlayerId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerRole {
    Player,
    Showman,
    Spectator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerGameStatus {
    InGame,
    Disconnected,
}

/// One participant of a game.
///
/// Players are retained (never deleted) on disconnect so stats and turn
/// history remain valid; they are purged only when the game itself
/// expires from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub role: PlayerRole,
    pub status: PlayerGameStatus,
    /// Signed score, soft-capped by `EngineConfig::max_score`.
    pub score: i64,
    /// Board slot for scoring players; None for showman/spectators.
    pub slot: Option<u8>,
    /// Lobby readiness, consumed by START_GAME.
    pub ready: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, role: PlayerRole) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            status: PlayerGameStatus::InGame,
            score: 0,
            slot: None,
            ready: false,
        }
    }

    pub fn is_active_player(&self) -> bool {
        self.role == PlayerRole::Player && self.status == PlayerGameStatus::InGame
    }
}

/// Aggregate root: one match.
///
/// Owned exclusively, at any instant, by whichever execution currently
/// holds its lock; persisted as a flat field-map keyed by game id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub players: Vec<Player>,
    pub state: GameState,
    pub paused: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
}

impl Game {
    pub fn new(id: GameId) -> Self {
        Self {
            id,
            players: Vec::new(),
            state: GameState::new(),
            paused: false,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn showman(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.role == PlayerRole::Showman)
    }

    pub fn is_showman(&self, id: PlayerId) -> bool {
        self.player(id)
            .map(|p| p.role == PlayerRole::Showman)
            .unwrap_or(false)
    }

    /// Scoring players currently connected.
    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_active_player())
    }

    /// Players still allowed to answer the current question.
    ///
    /// Eligibility requires: scoring role, connected, present in the
    /// question's participant snapshot (players who joined after the
    /// question started are excluded), and no prior answer or skip on
    /// this question.
    pub fn eligible_answerers(&self) -> Vec<PlayerId> {
        self.active_players()
            .filter(|p| self.state.question_players.contains(&p.id))
            .filter(|p| !self.state.skipped_players.contains(&p.id))
            .filter(|p| {
                !self
                    .state
                    .answered_players
                    .iter()
                    .any(|a| a.player_id == p.id)
            })
            .map(|p| p.id)
            .collect()
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// True once the match left the lobby.
    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// True while an ordinary question (not a special sub-phase) is open.
    pub fn in_ordinary_question(&self) -> bool {
        matches!(
            self.state.question_state,
            QuestionState::Showing | QuestionState::Answering | QuestionState::ShowingAnswer
        ) && self.state.active_special().is_none()
    }
}
