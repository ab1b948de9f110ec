//! Handler tests for the final round.

use serde_json::json;

use crate::actions::final_round::{
    EliminateThemeHandler, PlaceFinalBidHandler, ReviewFinalAnswerHandler,
    SubmitFinalAnswerHandler,
};
use crate::actions::router::{self, RouterContext};
use crate::actions::test_support::{has_completion, saved_game, TestBed, NOW};
use crate::actions::timer_expired::TimerExpiredHandler;
use crate::actions::ActionHandler;
use crate::domain::final_round::{FinalRoundData, FinalRoundPhase};
use crate::domain::game::Game;
use crate::domain::state::QuestionState;
use crate::domain::test_fixtures::{started_game, ALICE, BOB, CAROL, SHOWMAN};
use crate::errors::ErrorCode;

fn router_ctx<'a>(bed: &'a TestBed) -> RouterContext<'a> {
    RouterContext {
        package: &bed.package,
        config: &bed.config,
        now: NOW,
    }
}

/// A game positioned at the start of the final round (two themes on
/// the board, every player has a positive score).
fn game_in_final(bed: &TestBed) -> Game {
    let mut game = started_game();
    game.state.current_round = 2;
    game.state.question_state = QuestionState::Choosing;
    let rcx = router_ctx(bed);
    router::advance_round(&mut game, &rcx).unwrap();
    game
}

fn game_in_final_bidding(bed: &TestBed) -> Game {
    let mut game = game_in_final(bed);
    let mut ctx = bed.ctx(game, Some(ALICE), json!({ "theme_id": 31 }));
    EliminateThemeHandler.handle(&mut ctx).unwrap();
    game = ctx.game;
    assert_eq!(game.state.question_state, QuestionState::Bidding);
    game
}

fn place_bid(bed: &TestBed, game: Game, player: i64, amount: i64) -> Game {
    let mut ctx = bed.ctx(game, Some(player), json!({ "amount": amount }));
    PlaceFinalBidHandler.handle(&mut ctx).unwrap();
    ctx.game
}

#[test]
fn round_exhaustion_enters_theme_elimination() {
    let bed = TestBed::new();
    let game = game_in_final(&bed);
    assert_eq!(game.state.question_state, QuestionState::ThemeElimination);
    let data = game.state.final_round_data.as_ref().unwrap();
    assert_eq!(data.phase, FinalRoundPhase::ThemeElimination);
    // Slot order: Alice, Bob, Carol.
    assert_eq!(data.turn_order, vec![ALICE, BOB, CAROL]);
    assert_eq!(game.state.current_turn_player_id, Some(ALICE));
}

#[test]
fn final_round_with_no_eligible_players_seats_the_showman() {
    let bed = TestBed::new();
    let mut game = started_game();
    game.state.current_round = 2;
    for id in [ALICE, BOB, CAROL] {
        game.player_mut(id).unwrap().score = 0;
    }
    let rcx = router_ctx(&bed);
    router::advance_round(&mut game, &rcx).unwrap();

    let data = game.state.final_round_data.as_ref().unwrap();
    assert_eq!(data.turn_order, vec![SHOWMAN]);
    assert_eq!(game.state.current_turn_player_id, Some(SHOWMAN));
}

#[test]
fn eliminating_down_to_one_theme_opens_bidding() {
    let bed = TestBed::new();
    let game = game_in_final_bidding(&bed);
    let data = game.state.final_round_data.as_ref().unwrap();
    assert_eq!(data.phase, FinalRoundPhase::Bidding);
    assert_eq!(data.eliminated_themes, vec![31]);
}

#[test]
fn eliminating_an_unknown_theme_is_rejected() {
    let bed = TestBed::new();
    let game = game_in_final(&bed);
    let mut ctx = bed.ctx(game, Some(ALICE), json!({ "theme_id": 77 }));
    let err = EliminateThemeHandler.handle(&mut ctx).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidTheme);
}

#[test]
fn elimination_respects_the_turn_order() {
    let bed = TestBed::new();
    let game = game_in_final(&bed);
    let mut ctx = bed.ctx(game, Some(BOB), json!({ "theme_id": 31 }));
    let err = EliminateThemeHandler.handle(&mut ctx).unwrap_err();
    assert_eq!(err.code(), ErrorCode::OutOfTurn);
}

#[test]
fn bids_are_clamped_and_completion_opens_answering() {
    let bed = TestBed::new();
    let game = game_in_final_bidding(&bed);

    // Alice asks for more than her 500 points: clamped.
    let mut ctx = bed.ctx(game, Some(ALICE), json!({ "amount": 9_999 }));
    let outcome = PlaceFinalBidHandler.handle(&mut ctx).unwrap();
    assert_eq!(outcome.response.unwrap(), json!({ "bid": 500 }));
    let game = ctx.game;

    let game = place_bid(&bed, game, BOB, 100);
    let game = place_bid(&bed, game, CAROL, 150);

    assert_eq!(game.state.question_state, QuestionState::Answering);
    let data = game.state.final_round_data.as_ref().unwrap();
    assert_eq!(data.phase, FinalRoundPhase::Answering);
}

#[test]
fn double_final_bid_is_rejected() {
    let bed = TestBed::new();
    let game = game_in_final_bidding(&bed);
    let game = place_bid(&bed, game, ALICE, 200);
    let mut ctx = bed.ctx(game, Some(ALICE), json!({ "amount": 300 }));
    let err = PlaceFinalBidHandler.handle(&mut ctx).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidBid);
}

fn game_in_final_answering(bed: &TestBed) -> Game {
    let game = game_in_final_bidding(bed);
    let game = place_bid(bed, game, ALICE, 300);
    let game = place_bid(bed, game, BOB, 100);
    place_bid(bed, game, CAROL, 150)
}

#[test]
fn all_answers_in_moves_to_review() {
    let bed = TestBed::new();
    let mut game = game_in_final_answering(&bed);

    for (player, text) in [(ALICE, "alpha"), (BOB, "beta"), (CAROL, "gamma")] {
        let mut ctx = bed.ctx(game, Some(player), json!({ "text": text }));
        SubmitFinalAnswerHandler.handle(&mut ctx).unwrap();
        game = ctx.game;
    }

    assert_eq!(game.state.question_state, QuestionState::Reviewing);
    let data = game.state.final_round_data.as_ref().unwrap();
    assert_eq!(data.phase, FinalRoundPhase::Reviewing);
    assert_eq!(data.answers.len(), 3);
}

#[test]
fn answer_deadline_applies_automatic_losses() {
    let bed = TestBed::new();
    let mut game = game_in_final_answering(&bed);

    // Only Alice answers in time.
    let mut ctx = bed.ctx(game, Some(ALICE), json!({ "text": "alpha" }));
    SubmitFinalAnswerHandler.handle(&mut ctx).unwrap();
    game = ctx.game;

    let mut ctx = bed.ctx(game, None, serde_json::Value::Null);
    let outcome = TimerExpiredHandler.handle(&mut ctx).unwrap();

    let saved = saved_game(&outcome.mutations).unwrap();
    assert_eq!(saved.state.question_state, QuestionState::Reviewing);
    // Bob lost his 100-point bid without an answer.
    assert_eq!(saved.player(BOB).unwrap().score, 200);
    let data = saved.state.final_round_data.as_ref().unwrap();
    assert!(data.answer_of(BOB).unwrap().auto_loss);
}

#[test]
fn reviews_apply_bids_and_the_last_review_completes_the_game() {
    let bed = TestBed::new();
    let mut game = game_in_final_answering(&bed);

    for (player, text) in [(ALICE, "alpha"), (BOB, "beta"), (CAROL, "gamma")] {
        let mut ctx = bed.ctx(game, Some(player), json!({ "text": text }));
        SubmitFinalAnswerHandler.handle(&mut ctx).unwrap();
        game = ctx.game;
    }

    let verdicts = [(ALICE, true), (BOB, false), (CAROL, true)];
    let mut last_outcome = None;
    for (player, correct) in verdicts {
        let answer_id = game
            .state
            .final_round_data
            .as_ref()
            .unwrap()
            .answer_of(player)
            .unwrap()
            .id;
        let mut ctx = bed.ctx(
            game,
            Some(SHOWMAN),
            json!({ "answer_id": answer_id, "correct": correct }),
        );
        last_outcome = Some(ReviewFinalAnswerHandler.handle(&mut ctx).unwrap());
        game = ctx.game;
    }

    assert_eq!(game.player(ALICE).unwrap().score, 800);
    assert_eq!(game.player(BOB).unwrap().score, 200);
    assert_eq!(game.player(CAROL).unwrap().score, 350);
    assert!(game.is_finished());

    let outcome = last_outcome.unwrap();
    assert!(has_completion(&outcome.mutations));
}

#[test]
fn review_requires_the_showman() {
    let bed = TestBed::new();
    let mut game = started_game();
    game.state.current_round = 3;
    game.state.question_state = QuestionState::Reviewing;
    let mut data = FinalRoundData::new(vec![ALICE]);
    data.phase = FinalRoundPhase::Reviewing;
    game.state.final_round_data = Some(data);

    let mut ctx = bed.ctx(
        game,
        Some(ALICE),
        json!({ "answer_id": uuid::Uuid::new_v4(), "correct": true }),
    );
    let err = ReviewFinalAnswerHandler.handle(&mut ctx).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InsufficientRole);
}
