//! Shared fixtures for domain and handler tests.

use time::macros::datetime;

use crate::domain::game::{Game, Player, PlayerId, PlayerRole};
use crate::domain::package::{GamePackage, PackRound, Question, QuestionKind, RoundKind, Theme};
use crate::domain::secret::SecretTransferType;
use crate::domain::state::QuestionState;

pub const SHOWMAN: PlayerId = 100;
pub const ALICE: PlayerId = 1;
pub const BOB: PlayerId = 2;
pub const CAROL: PlayerId = 3;

/// A started three-player game with a showman, positioned in CHOOSING
/// with Alice holding the turn.
pub fn started_game() -> Game {
    let mut game = Game::new("g-test".to_string());
    let mut showman = Player::new(SHOWMAN, "Host", PlayerRole::Showman);
    showman.ready = true;
    game.players.push(showman);
    for (id, name, score) in [(ALICE, "Alice", 500), (BOB, "Bob", 300), (CAROL, "Carol", 200)] {
        let mut p = Player::new(id, name, PlayerRole::Player);
        p.score = score;
        p.ready = true;
        p.slot = Some(id as u8);
        game.players.push(p);
    }
    game.started_at = Some(datetime!(2025-01-10 18:00 UTC));
    game.state.current_round = 1;
    game.state.question_state = QuestionState::Choosing;
    game.state.current_turn_player_id = Some(ALICE);
    game
}

/// Two ordinary rounds plus a final round; round 1 carries one
/// ordinary, one stake, and one secret question.
pub fn package() -> GamePackage {
    GamePackage {
        name: "Fixture pack".to_string(),
        rounds: vec![
            PackRound {
                order: 1,
                name: "Round one".to_string(),
                kind: RoundKind::Ordinary,
                themes: vec![Theme {
                    id: 10,
                    name: "History".to_string(),
                    questions: vec![
                        Question {
                            id: 101,
                            price: 200,
                            kind: QuestionKind::Ordinary,
                            text: "Ordinary question".to_string(),
                            answer: "Ordinary answer".to_string(),
                        },
                        Question {
                            id: 102,
                            price: 200,
                            kind: QuestionKind::Stake { max_price: None },
                            text: "Stake question".to_string(),
                            answer: "Stake answer".to_string(),
                        },
                        Question {
                            id: 103,
                            price: 400,
                            kind: QuestionKind::Secret {
                                transfer: SecretTransferType::Others,
                            },
                            text: "Secret question".to_string(),
                            answer: "Secret answer".to_string(),
                        },
                    ],
                }],
            },
            PackRound {
                order: 2,
                name: "Round two".to_string(),
                kind: RoundKind::Ordinary,
                themes: vec![Theme {
                    id: 20,
                    name: "Science".to_string(),
                    questions: vec![Question {
                        id: 201,
                        price: 300,
                        kind: QuestionKind::Ordinary,
                        text: "Second round question".to_string(),
                        answer: "Second round answer".to_string(),
                    }],
                }],
            },
            PackRound {
                order: 3,
                name: "Final".to_string(),
                kind: RoundKind::Final,
                themes: vec![
                    Theme {
                        id: 30,
                        name: "Cinema".to_string(),
                        questions: vec![Question {
                            id: 301,
                            price: 0,
                            kind: QuestionKind::Ordinary,
                            text: "Final question A".to_string(),
                            answer: "Final answer A".to_string(),
                        }],
                    },
                    Theme {
                        id: 31,
                        name: "Music".to_string(),
                        questions: vec![Question {
                            id: 311,
                            price: 0,
                            kind: QuestionKind::Ordinary,
                            text: "Final question B".to_string(),
                            answer: "Final answer B".to_string(),
                        }],
                    },
                ],
            },
        ],
    }
}
