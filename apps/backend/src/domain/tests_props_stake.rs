//! Property tests for the stake auction (pure domain, no store).
//!
//! Ruleset contract under test:
//! - `highest_bid` never decreases while the bidding phase is open
//! - after any ALL-IN, non-PASS bids below the bidder's whole score are
//!   rejected

use proptest::prelude::*;

use crate::domain::stake::{StakeBid, StakeBidInput, StakeQuestionData};
use crate::domain::test_prelude;

const PRICE: i64 = 100;
const MAX_PRICE: i64 = 100_000;

fn fresh_auction(players: usize) -> StakeQuestionData {
    let order: Vec<i64> = (1..=players as i64).collect();
    StakeQuestionData::new(1, order, MAX_PRICE)
}

proptest! {
    #![proptest_config(test_prelude::proptest_config())]

    /// Property: for any sequence of attempted raises, every accepted
    /// bid keeps `highest_bid` monotonically non-decreasing.
    #[test]
    fn prop_highest_bid_monotonic(
        raises in prop::collection::vec((100i64..5_000, any::<bool>()), 1..30),
    ) {
        let mut data = fresh_auction(3);
        let mut last_highest = 0i64;
        // Every bidder is rich enough that only the auction rules decide.
        let score = 1_000_000;

        for (amount, pass) in raises {
            let Some(bidder) = data.current_bidder() else { break };
            let input = if pass {
                StakeBidInput::Pass
            } else {
                StakeBidInput::Normal { amount }
            };
            if let Ok(bid) = data.validate_bid(bidder, score, PRICE, input) {
                data.record_bid(bidder, bid);
            }
            if let Some(h) = data.highest_bid {
                prop_assert!(h >= last_highest,
                    "highest bid decreased: {last_highest} -> {h}");
                last_highest = h;
            }
            if data.is_complete() {
                break;
            }
            if data.advance_turn().is_none() {
                break;
            }
        }
    }

    /// Property: once an all-in is on the table, any numeric bid that is
    /// not the bidder's entire score is rejected.
    #[test]
    fn prop_all_in_locks_out_normal_bids(
        all_in_score in 200i64..10_000,
        attempt in 100i64..20_000,
        next_score in 100i64..20_000,
    ) {
        let mut data = fresh_auction(3);
        data.record_bid(1, StakeBid::AllIn { amount: all_in_score });
        prop_assert!(data.advance_turn().is_some());
        let bidder = data.current_bidder().unwrap();

        let result = data.validate_bid(
            bidder,
            next_score,
            PRICE,
            StakeBidInput::Normal { amount: attempt },
        );

        if attempt != next_score {
            prop_assert!(result.is_err(),
                "non-all-in bid {attempt} accepted after an all-in");
        } else if let Ok(bid) = result {
            prop_assert_eq!(bid, StakeBid::AllIn { amount: attempt });
        }
    }

    /// Property: an accepted bid never exceeds the bidder's score nor
    /// the configured maximum price.
    #[test]
    fn prop_accepted_bids_respect_caps(
        score in 100i64..50_000,
        amount in 0i64..200_000,
    ) {
        let data = fresh_auction(2);
        if let Ok(bid) = data.validate_bid(1, score, PRICE, StakeBidInput::Normal { amount }) {
            let accepted = bid.amount().unwrap();
            prop_assert!(accepted <= score);
            prop_assert!(accepted <= MAX_PRICE);
            prop_assert!(accepted >= PRICE);
        }
    }
}
