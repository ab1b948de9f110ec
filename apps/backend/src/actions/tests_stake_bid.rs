//! Handler tests for the stake auction flow.

use serde_json::json;

use crate::actions::question_flow::PickQuestionHandler;
use crate::actions::stake_bid::PlaceStakeBidHandler;
use crate::actions::test_support::{saved_game, set_timers, TestBed};
use crate::actions::timer_expired::TimerExpiredHandler;
use crate::actions::ActionHandler;
use crate::domain::game::Game;
use crate::domain::stake::StakeBid;
use crate::domain::state::QuestionState;
use crate::domain::test_fixtures::{started_game, ALICE, BOB, CAROL};
use crate::domain::timer::TimerKind;
use crate::errors::ErrorCode;

/// Question 102 is the stake question (price 200); Alice picks it.
fn game_in_bidding(bed: &TestBed) -> Game {
    let mut ctx = bed.ctx(started_game(), Some(ALICE), json!({ "question_id": 102 }));
    PickQuestionHandler.handle(&mut ctx).unwrap();
    ctx.game
}

#[test]
fn stake_pick_opens_the_auction_at_the_picker() {
    let bed = TestBed::new();
    let game = game_in_bidding(&bed);
    assert_eq!(game.state.question_state, QuestionState::Bidding);
    let stake = game.state.stake_question_data.as_ref().unwrap();
    assert_eq!(stake.current_bidder(), Some(ALICE));
    assert!(stake.bidding_phase);
}

#[test]
fn underbid_is_rejected_then_raise_accepted() {
    let bed = TestBed::new();
    let game = game_in_bidding(&bed);

    // Alice opens at the question price.
    let mut ctx = bed.ctx(game, Some(ALICE), json!({ "bid": { "type": "NORMAL", "amount": 200 } }));
    let outcome = PlaceStakeBidHandler.handle(&mut ctx).unwrap();
    assert!(outcome.success);
    let game = ctx.game;

    // Bob tries 150: below the current highest bid.
    let mut ctx = bed.ctx(
        game,
        Some(BOB),
        json!({ "bid": { "type": "NORMAL", "amount": 150 } }),
    );
    let err = PlaceStakeBidHandler.handle(&mut ctx).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidBid);
    let game = ctx.game;

    // Bob raises to 250.
    let mut ctx = bed.ctx(
        game,
        Some(BOB),
        json!({ "bid": { "type": "NORMAL", "amount": 250 } }),
    );
    let outcome = PlaceStakeBidHandler.handle(&mut ctx).unwrap();
    let saved = saved_game(&outcome.mutations).unwrap();
    let stake = saved.state.stake_question_data.as_ref().unwrap();
    assert_eq!(stake.highest_bid, Some(250));
}

#[test]
fn passes_close_the_auction_and_the_winner_answers() {
    let bed = TestBed::new();
    let game = game_in_bidding(&bed);

    let mut ctx = bed.ctx(game, Some(ALICE), json!({ "bid": { "type": "NORMAL", "amount": 300 } }));
    PlaceStakeBidHandler.handle(&mut ctx).unwrap();
    let game = ctx.game;

    let mut ctx = bed.ctx(game, Some(BOB), json!({ "bid": { "type": "PASS" } }));
    PlaceStakeBidHandler.handle(&mut ctx).unwrap();
    let game = ctx.game;

    let mut ctx = bed.ctx(game, Some(CAROL), json!({ "bid": { "type": "PASS" } }));
    let outcome = PlaceStakeBidHandler.handle(&mut ctx).unwrap();

    let saved = saved_game(&outcome.mutations).unwrap();
    let stake = saved.state.stake_question_data.as_ref().unwrap();
    assert_eq!(stake.winner_player_id, Some(ALICE));
    assert!(!stake.bidding_phase);
    assert_eq!(saved.state.question_state, QuestionState::Answering);
    assert_eq!(saved.state.answering_player, Some(ALICE));
    assert_eq!(set_timers(&outcome.mutations), vec![TimerKind::Answer]);
}

#[test]
fn out_of_turn_stake_bid_is_rejected() {
    let bed = TestBed::new();
    let game = game_in_bidding(&bed);
    let mut ctx = bed.ctx(
        game,
        Some(CAROL),
        json!({ "bid": { "type": "NORMAL", "amount": 300 } }),
    );
    let err = PlaceStakeBidHandler.handle(&mut ctx).unwrap_err();
    assert_eq!(err.code(), ErrorCode::OutOfTurn);
}

#[test]
fn poor_picker_opens_with_a_forced_all_in() {
    let bed = TestBed::new();
    let mut game = started_game();
    // Alice can no longer afford the 200-point opening bid.
    game.player_mut(ALICE).unwrap().score = 150;

    let mut ctx = bed.ctx(game, Some(ALICE), json!({ "question_id": 102 }));
    PickQuestionHandler.handle(&mut ctx).unwrap();
    let game = ctx.game;

    let stake = game.state.stake_question_data.as_ref().unwrap();
    assert_eq!(
        stake.bids.get(&ALICE),
        Some(&StakeBid::AllIn { amount: 150 })
    );
    assert_eq!(stake.current_bidder(), Some(BOB));
}

#[test]
fn bid_deadline_passes_for_the_current_bidder() {
    let bed = TestBed::new();
    let game = game_in_bidding(&bed);

    let mut ctx = bed.ctx(game, Some(ALICE), json!({ "bid": { "type": "NORMAL", "amount": 200 } }));
    PlaceStakeBidHandler.handle(&mut ctx).unwrap();
    let game = ctx.game;

    // Bob's clock runs out: an automatic pass.
    let mut ctx = bed.ctx(game, None, serde_json::Value::Null);
    let outcome = TimerExpiredHandler.handle(&mut ctx).unwrap();

    let saved = saved_game(&outcome.mutations).unwrap();
    let stake = saved.state.stake_question_data.as_ref().unwrap();
    assert!(stake.passed_players.contains(&BOB));
    assert_eq!(stake.current_bidder(), Some(CAROL));
}

#[test]
fn bid_deadline_forces_the_opening_bid() {
    let bed = TestBed::new();
    let game = game_in_bidding(&bed);

    // Alice never opens; the deadline opens for her at the question
    // price.
    let mut ctx = bed.ctx(game, None, serde_json::Value::Null);
    let outcome = TimerExpiredHandler.handle(&mut ctx).unwrap();

    let saved = saved_game(&outcome.mutations).unwrap();
    let stake = saved.state.stake_question_data.as_ref().unwrap();
    assert_eq!(
        stake.bids.get(&ALICE),
        Some(&StakeBid::Normal { amount: 200 })
    );
    assert_eq!(stake.highest_bid, Some(200));
}
