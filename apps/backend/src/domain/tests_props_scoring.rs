//! Property tests for final-round score saturation.

use proptest::prelude::*;

use crate::domain::final_round::{apply_review, clamp_final_bid};
use crate::domain::test_prelude;

const MAX_SCORE: i64 = 1_000_000;
const MAX_DELTA: i64 = 100_000;
const MIN_BID: i64 = 1;

proptest! {
    #![proptest_config(test_prelude::proptest_config())]

    /// Property: a review never moves a score beyond the absolute
    /// ceiling and never changes it by more than the per-review cap,
    /// regardless of bid size.
    #[test]
    fn prop_review_saturates(
        score in -MAX_SCORE..MAX_SCORE,
        bid in 0i64..i64::MAX / 4,
        correct in any::<bool>(),
    ) {
        let next = apply_review(score, bid, correct, MAX_DELTA, MAX_SCORE);
        prop_assert!(next >= -MAX_SCORE && next <= MAX_SCORE);
        prop_assert!((next - score).abs() <= MAX_DELTA);
    }

    /// Property: clamped bids land in [minimum, max(score, minimum)].
    #[test]
    fn prop_bid_clamp_range(
        requested in i64::MIN / 4..i64::MAX / 4,
        score in -10_000i64..1_000_000,
    ) {
        let bid = clamp_final_bid(requested, score, MIN_BID);
        prop_assert!(bid >= MIN_BID);
        prop_assert!(bid <= score.max(MIN_BID));
        if score <= 0 {
            prop_assert_eq!(bid, MIN_BID);
        }
    }
}
