//! Handler tests for membership, lobby, and departures.

use serde_json::json;
use time::macros::datetime;

use crate::actions::membership::{
    DepartureHandler, DepartureKind, JoinGameHandler, PlayerReadyHandler, StartGameHandler,
};
use crate::actions::question_flow::{PickQuestionHandler, SubmitAnswerHandler};
use crate::actions::test_support::{saved_game, TestBed};
use crate::actions::ActionHandler;
use crate::domain::game::{Game, Player, PlayerGameStatus, PlayerRole};
use crate::domain::state::{AnswerVerdict, QuestionState};
use crate::domain::test_fixtures::{started_game, ALICE, BOB, CAROL, SHOWMAN};
use crate::engine::mutation::{DataMutation, PlayerStatsUpdate};
use crate::errors::ErrorCode;

fn lobby_game() -> Game {
    let mut game = started_game();
    game.started_at = None;
    game.state.current_round = 0;
    game.state.current_turn_player_id = None;
    for p in &mut game.players {
        p.ready = false;
    }
    game
}

#[test]
fn join_creates_player_session_and_stats() {
    let bed = TestBed::new();
    let mut game = lobby_game();
    game.players.retain(|p| p.id != CAROL);

    let mut ctx = bed.ctx(
        game,
        None,
        json!({ "user_id": CAROL, "name": "Carol" }),
    );
    let outcome = JoinGameHandler.handle(&mut ctx).unwrap();

    let saved = saved_game(&outcome.mutations).unwrap();
    assert!(saved.player(CAROL).is_some());
    assert!(outcome.mutations.iter().any(|m| matches!(
        m,
        DataMutation::UpdateSocketSession {
            session: Some(_),
            ..
        }
    )));
    assert!(outcome.mutations.iter().any(|m| matches!(
        m,
        DataMutation::UpdatePlayerStats(PlayerStatsUpdate::SessionStarted { player_id, .. })
            if *player_id == CAROL
    )));
}

#[test]
fn second_showman_is_rejected() {
    let bed = TestBed::new();
    let mut ctx = bed.ctx(
        lobby_game(),
        None,
        json!({ "user_id": 999, "name": "Usurper", "role": "SHOWMAN" }),
    );
    let err = JoinGameHandler.handle(&mut ctx).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[test]
fn start_by_player_requires_everyone_ready() {
    let bed = TestBed::new();
    let mut ctx = bed.ctx(lobby_game(), Some(ALICE), json!({}));
    let err = StartGameHandler.handle(&mut ctx).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InsufficientRole);
}

#[test]
fn ready_then_start_seeds_round_one() {
    let bed = TestBed::new();
    let mut game = lobby_game();

    for player in [ALICE, BOB, CAROL, SHOWMAN] {
        let mut ctx = bed.ctx(game, Some(player), json!({}));
        PlayerReadyHandler.handle(&mut ctx).unwrap();
        game = ctx.game;
    }

    let mut ctx = bed.ctx(game, Some(ALICE), json!({}));
    let outcome = StartGameHandler.handle(&mut ctx).unwrap();

    let saved = saved_game(&outcome.mutations).unwrap();
    assert!(saved.is_started());
    assert_eq!(saved.state.current_round, 1);
    assert_eq!(saved.state.question_state, QuestionState::Choosing);
    assert_eq!(saved.state.current_turn_player_id, Some(ALICE));
}

#[test]
fn start_twice_conflicts() {
    let bed = TestBed::new();
    let mut ctx = bed.ctx(started_game(), Some(SHOWMAN), json!({}));
    let err = StartGameHandler.handle(&mut ctx).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[test]
fn late_joiner_is_not_eligible_for_the_open_question() {
    let bed = TestBed::new();
    let mut ctx = bed.ctx(started_game(), Some(ALICE), json!({ "question_id": 101 }));
    PickQuestionHandler.handle(&mut ctx).unwrap();
    let game = ctx.game;

    let mut ctx = bed.ctx(game, None, json!({ "user_id": 500, "name": "Dave" }));
    let outcome = JoinGameHandler.handle(&mut ctx).unwrap();

    let saved = saved_game(&outcome.mutations).unwrap();
    assert!(saved.player(500).is_some());
    // The participant snapshot was taken at pick time.
    assert!(!saved.eligible_answerers().contains(&500));
}

#[test]
fn disconnect_of_the_answering_player_auto_skips() {
    let bed = TestBed::new();
    let mut ctx = bed.ctx(started_game(), Some(ALICE), json!({ "question_id": 101 }));
    PickQuestionHandler.handle(&mut ctx).unwrap();
    let game = ctx.game;
    let mut ctx = bed.ctx(game, Some(BOB), json!({}));
    SubmitAnswerHandler.handle(&mut ctx).unwrap();
    let game = ctx.game;

    let mut ctx = bed.ctx(game, Some(BOB), json!({}));
    let outcome = DepartureHandler::new(DepartureKind::Disconnect)
        .handle(&mut ctx)
        .unwrap();

    let saved = saved_game(&outcome.mutations).unwrap();
    let recorded = &saved.state.answered_players[0];
    assert_eq!(recorded.player_id, BOB);
    assert_eq!(recorded.verdict, AnswerVerdict::Skip);
    assert_eq!(recorded.delta, 0);
    assert_eq!(saved.player(BOB).unwrap().score, 300);
    assert_eq!(saved.state.answering_player, None);
    // Alice and Carol can still answer.
    assert_eq!(saved.state.question_state, QuestionState::Showing);
}

#[test]
fn disconnect_of_the_sole_answerer_resolves_the_question() {
    let bed = TestBed::new();
    let mut ctx = bed.ctx(started_game(), Some(ALICE), json!({ "question_id": 101 }));
    PickQuestionHandler.handle(&mut ctx).unwrap();
    let mut game = ctx.game;
    game.state.skipped_players = vec![ALICE, CAROL];
    let mut ctx = bed.ctx(game, Some(BOB), json!({}));
    SubmitAnswerHandler.handle(&mut ctx).unwrap();
    let game = ctx.game;

    let mut ctx = bed.ctx(game, Some(BOB), json!({}));
    let outcome = DepartureHandler::new(DepartureKind::Disconnect)
        .handle(&mut ctx)
        .unwrap();

    let saved = saved_game(&outcome.mutations).unwrap();
    assert_eq!(saved.state.question_state, QuestionState::ShowingAnswer);
}

#[test]
fn departed_players_are_retained() {
    let bed = TestBed::new();
    let mut ctx = bed.ctx(started_game(), Some(CAROL), json!({}));
    let outcome = DepartureHandler::new(DepartureKind::Leave)
        .handle(&mut ctx)
        .unwrap();

    let saved = saved_game(&outcome.mutations).unwrap();
    let carol = saved.player(CAROL).unwrap();
    assert_eq!(carol.status, PlayerGameStatus::Disconnected);
    assert_eq!(carol.score, 200);
}

#[test]
fn kicking_the_showman_is_rejected() {
    let bed = TestBed::new();
    let mut ctx = bed.ctx(
        started_game(),
        Some(SHOWMAN),
        json!({ "player_id": SHOWMAN }),
    );
    let err = DepartureHandler::new(DepartureKind::Kick)
        .handle(&mut ctx)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InsufficientRole);
}

#[test]
fn kick_passes_the_board_turn_along() {
    let bed = TestBed::new();
    let game = started_game();
    assert_eq!(game.state.current_turn_player_id, Some(ALICE));

    let mut ctx = bed.ctx(game, Some(SHOWMAN), json!({ "player_id": ALICE }));
    let outcome = DepartureHandler::new(DepartureKind::Kick)
        .handle(&mut ctx)
        .unwrap();

    let saved = saved_game(&outcome.mutations).unwrap();
    assert_ne!(saved.state.current_turn_player_id, Some(ALICE));
    assert!(saved.state.current_turn_player_id.is_some());
}

#[test]
fn unknown_session_disconnect_is_a_noop() {
    let bed = TestBed::new();
    let mut ctx = bed.ctx(started_game(), None, json!({}));
    let outcome = DepartureHandler::new(DepartureKind::Disconnect)
        .handle(&mut ctx)
        .unwrap();
    assert!(outcome.success);
    assert!(outcome.mutations.is_empty());
}

#[test]
fn fixture_timestamps_are_stable() {
    // Guard against fixture drift: handler tests depend on the game
    // having started before NOW.
    let game = started_game();
    assert!(game.started_at.unwrap() < datetime!(2025-01-10 18:30 UTC));
}

#[test]
fn join_rejoin_marks_connected() {
    let bed = TestBed::new();
    let mut game = started_game();
    if let Some(p) = game.player_mut(CAROL) {
        p.status = PlayerGameStatus::Disconnected;
    }
    let mut ctx = bed.ctx(game, None, json!({ "user_id": CAROL, "name": "Carol" }));
    let outcome = JoinGameHandler.handle(&mut ctx).unwrap();
    let saved = saved_game(&outcome.mutations).unwrap();
    assert_eq!(saved.player(CAROL).unwrap().status, PlayerGameStatus::InGame);
    assert_eq!(
        outcome.response.unwrap(),
        json!({ "rejoin": true })
    );
}

#[test]
fn player_fixture_roles_are_sane() {
    let game = started_game();
    assert_eq!(game.showman().map(|p| p.id), Some(SHOWMAN));
    assert_eq!(game.active_players().count(), 3);
    assert!(game
        .players
        .iter()
        .all(|p: &Player| p.role != PlayerRole::Spectator));
}
