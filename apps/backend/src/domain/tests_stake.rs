//! Unit tests for the stake auction rules (pure domain, no store).

use crate::domain::stake::{StakeBid, StakeBidInput, StakeQuestionData};
use crate::domain::test_fixtures::{ALICE, BOB, CAROL};
use crate::errors::domain::{DomainError, ValidationKind};

const PRICE: i64 = 200;

fn auction() -> StakeQuestionData {
    // Bob picked; order rotates to start at the picker.
    StakeQuestionData::new(BOB, vec![ALICE, BOB, CAROL], 10_000)
}

#[test]
fn order_rotates_to_picker() {
    let data = auction();
    assert_eq!(data.bidding_order, vec![BOB, CAROL, ALICE]);
    assert_eq!(data.current_bidder(), Some(BOB));
}

#[test]
fn opening_pass_is_rejected() {
    let data = auction();
    let err = data
        .validate_bid(BOB, 300, PRICE, StakeBidInput::Pass)
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::InvalidBid, _)
    ));
}

#[test]
fn bid_below_question_price_is_rejected() {
    let data = auction();
    let err = data
        .validate_bid(BOB, 300, PRICE, StakeBidInput::Normal { amount: 150 })
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::InvalidBid, _)
    ));
}

#[test]
fn scenario_open_then_underbid_then_raise() {
    // Picker opens NORMAL 200 on a 200-point question; second bidder's
    // 150 is rejected, their 250 is accepted and leads.
    let mut data = auction();
    let bid = data
        .validate_bid(BOB, 300, PRICE, StakeBidInput::Normal { amount: 200 })
        .unwrap();
    assert_eq!(bid, StakeBid::Normal { amount: 200 });
    data.record_bid(BOB, bid);
    assert_eq!(data.advance_turn(), Some(CAROL));

    let err = data
        .validate_bid(CAROL, 400, PRICE, StakeBidInput::Normal { amount: 150 })
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::InvalidBid, _)
    ));

    let raise = data
        .validate_bid(CAROL, 400, PRICE, StakeBidInput::Normal { amount: 250 })
        .unwrap();
    data.record_bid(CAROL, raise);
    assert_eq!(data.highest_bid, Some(250));
    assert_eq!(data.leading_bidder(), Some(CAROL));
}

#[test]
fn bid_equal_to_score_classifies_all_in() {
    let data = auction();
    let bid = data
        .validate_bid(BOB, 300, PRICE, StakeBidInput::Normal { amount: 300 })
        .unwrap();
    assert_eq!(bid, StakeBid::AllIn { amount: 300 });
}

#[test]
fn after_all_in_only_pass_or_all_in() {
    let mut data = auction();
    data.record_bid(BOB, StakeBid::AllIn { amount: 300 });
    data.advance_turn();

    let err = data
        .validate_bid(CAROL, 500, PRICE, StakeBidInput::Normal { amount: 350 })
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::InvalidBid, _)
    ));

    let pass = data
        .validate_bid(CAROL, 500, PRICE, StakeBidInput::Pass)
        .unwrap();
    assert_eq!(pass, StakeBid::Pass);

    let all_in = data.validate_bid(CAROL, 500, PRICE, StakeBidInput::AllIn).unwrap();
    assert_eq!(all_in, StakeBid::AllIn { amount: 500 });
}

#[test]
fn smaller_all_in_cannot_tie_the_leader() {
    let mut data = auction();
    data.record_bid(BOB, StakeBid::AllIn { amount: 300 });
    data.advance_turn();

    // Carol's whole score is below the leading all-in: not acceptable.
    let err = data
        .validate_bid(CAROL, 250, PRICE, StakeBidInput::AllIn)
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::InvalidBid, _)
    ));
}

#[test]
fn bid_above_own_score_is_rejected() {
    let data = auction();
    let err = data
        .validate_bid(BOB, 300, PRICE, StakeBidInput::Normal { amount: 400 })
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::InvalidBid, _)
    ));
}

#[test]
fn bid_above_max_price_is_rejected() {
    let mut data = auction();
    data.max_price = 250;
    let err = data
        .validate_bid(BOB, 1_000, PRICE, StakeBidInput::Normal { amount: 300 })
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::InvalidBid, _)
    ));
}

#[test]
fn out_of_turn_bid_is_rejected() {
    let data = auction();
    let err = data
        .validate_bid(ALICE, 1_000, PRICE, StakeBidInput::Normal { amount: 300 })
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::OutOfTurn, _)
    ));
}

#[test]
fn auction_completes_when_others_pass() {
    let mut data = auction();
    data.record_bid(BOB, StakeBid::Normal { amount: 200 });
    data.advance_turn();
    data.record_bid(CAROL, StakeBid::Pass);
    data.advance_turn();
    data.record_bid(ALICE, StakeBid::Pass);

    assert!(data.is_complete());
    let winner = data.complete().unwrap();
    assert_eq!(winner, BOB);
    assert!(!data.bidding_phase);
    assert_eq!(data.winner_player_id, Some(BOB));
}

#[test]
fn forfeit_counts_as_pass() {
    let mut data = auction();
    data.record_bid(BOB, StakeBid::Normal { amount: 200 });
    data.forfeit(CAROL);
    data.forfeit(ALICE);
    assert!(data.is_complete());
    assert_eq!(data.complete().unwrap(), BOB);
}
