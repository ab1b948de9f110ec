//! Role-filtered view of a game, shipped inside broadcast events.
//!
//! Players and spectators must not see question answers or other
//! players' blind final-round bids; the showman sees everything.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_with::skip_serializing_none;

use crate::domain::final_round::{FinalRoundData, FinalRoundPhase};
use crate::domain::game::{Game, Player, PlayerGameStatus, PlayerId, PlayerRole};
use crate::domain::state::{CurrentQuestion, QuestionState};

/// Perspective a snapshot is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perspective {
    Showman,
    Player(PlayerId),
    Spectator,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub role: PlayerRole,
    pub score: i64,
    pub slot: Option<u8>,
    pub ready: bool,
    pub connected: bool,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalRoundSnapshot {
    pub phase: FinalRoundPhase,
    pub current_turn: Option<PlayerId>,
    /// Bid amounts, masked to `None` for bids the viewer may not see
    /// while bidding is still blind.
    pub bids: BTreeMap<PlayerId, Option<i64>>,
    pub answered_players: Vec<PlayerId>,
    pub eliminated_themes: Vec<i64>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSnapshot {
    pub id: String,
    pub question_state: QuestionState,
    pub current_round: u32,
    pub paused: bool,
    pub current_question: Option<CurrentQuestion>,
    pub current_turn_player_id: Option<PlayerId>,
    pub answering_player: Option<PlayerId>,
    pub players: Vec<PlayerSnapshot>,
    pub final_round: Option<FinalRoundSnapshot>,
}

impl GameSnapshot {
    pub fn render(game: &Game, perspective: Perspective) -> Self {
        Self {
            id: game.id.clone(),
            question_state: game.state.question_state,
            current_round: game.state.current_round,
            paused: game.paused,
            current_question: game.state.current_question.clone(),
            current_turn_player_id: game.state.current_turn_player_id,
            answering_player: game.state.answering_player,
            players: game.players.iter().map(player_snapshot).collect(),
            final_round: game
                .state
                .final_round_data
                .as_ref()
                .map(|data| final_round_snapshot(data, perspective)),
        }
    }
}

fn player_snapshot(player: &Player) -> PlayerSnapshot {
    PlayerSnapshot {
        id: player.id,
        name: player.name.clone(),
        role: player.role,
        score: player.score,
        slot: player.slot,
        ready: player.ready,
        connected: player.status == PlayerGameStatus::InGame,
    }
}

fn final_round_snapshot(data: &FinalRoundData, perspective: Perspective) -> FinalRoundSnapshot {
    let blind = data.phase == FinalRoundPhase::Bidding || data.phase == FinalRoundPhase::Answering;
    let bids = data
        .bids
        .iter()
        .map(|(&player, &amount)| {
            let visible = match perspective {
                Perspective::Showman => true,
                Perspective::Player(viewer) => !blind || viewer == player,
                Perspective::Spectator => !blind,
            };
            (player, visible.then_some(amount))
        })
        .collect();

    FinalRoundSnapshot {
        phase: data.phase,
        current_turn: data.current_turn(),
        bids,
        answered_players: data.answers.iter().map(|a| a.player_id).collect(),
        eliminated_themes: data.eliminated_themes.clone(),
    }
}
