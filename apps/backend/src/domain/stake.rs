use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::game::PlayerId;
use crate::errors::domain::{DomainError, ValidationKind};

/// A recorded stake bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StakeBid {
    Normal { amount: i64 },
    /// A bid equal to the bidder's entire current score.
    AllIn { amount: i64 },
    Pass,
}

impl StakeBid {
    pub fn amount(&self) -> Option<i64> {
        match self {
            StakeBid::Normal { amount } | StakeBid::AllIn { amount } => Some(*amount),
            StakeBid::Pass => None,
        }
    }
}

/// What a bidder asked for, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StakeBidInput {
    Normal { amount: i64 },
    AllIn,
    Pass,
}

/// Auction state for one stake question.
///
/// Invariant: `highest_bid` is monotonically non-decreasing while
/// `bidding_phase` is true; once any player is recorded all-in, every
/// subsequent bid must be PASS or an equal/greater all-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeQuestionData {
    pub picker_id: PlayerId,
    /// Bidding order, rotated to start at the picker.
    pub bidding_order: Vec<PlayerId>,
    pub current_bidder_index: usize,
    pub bids: BTreeMap<PlayerId, StakeBid>,
    pub highest_bid: Option<i64>,
    pub winner_player_id: Option<PlayerId>,
    pub passed_players: Vec<PlayerId>,
    pub max_price: i64,
    pub bidding_phase: bool,
}

impl StakeQuestionData {
    /// Build auction state with the bidding order rotated so the picker
    /// opens.
    pub fn new(picker_id: PlayerId, mut order: Vec<PlayerId>, max_price: i64) -> Self {
        if let Some(pos) = order.iter().position(|&p| p == picker_id) {
            order.rotate_left(pos);
        }
        Self {
            picker_id,
            bidding_order: order,
            current_bidder_index: 0,
            bids: BTreeMap::new(),
            highest_bid: None,
            winner_player_id: None,
            passed_players: Vec::new(),
            max_price,
            bidding_phase: true,
        }
    }

    pub fn current_bidder(&self) -> Option<PlayerId> {
        self.bidding_order.get(self.current_bidder_index).copied()
    }

    pub fn has_all_in(&self) -> bool {
        self.bids
            .values()
            .any(|b| matches!(b, StakeBid::AllIn { .. }))
    }

    fn has_passed(&self, player: PlayerId) -> bool {
        self.passed_players.contains(&player)
    }

    /// Players still contending (not passed).
    pub fn contenders(&self) -> Vec<PlayerId> {
        self.bidding_order
            .iter()
            .copied()
            .filter(|p| !self.has_passed(*p))
            .collect()
    }

    /// Validate a bid against the auction rules, in the fixed order:
    /// below question price, all-in regime, own score, configured
    /// maximum, current highest. A bid equal to the bidder's entire
    /// score classifies as ALL-IN. Passing is forbidden for the opener.
    pub fn validate_bid(
        &self,
        bidder: PlayerId,
        score: i64,
        question_price: i64,
        input: StakeBidInput,
    ) -> Result<StakeBid, DomainError> {
        if !self.bidding_phase {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                "bidding already resolved",
            ));
        }
        if self.current_bidder() != Some(bidder) {
            return Err(DomainError::validation(
                ValidationKind::OutOfTurn,
                "not this player's turn to bid",
            ));
        }

        let amount = match input {
            StakeBidInput::Pass => {
                if self.bids.is_empty() {
                    return Err(DomainError::validation(
                        ValidationKind::InvalidBid,
                        "the opening bidder cannot pass",
                    ));
                }
                return Ok(StakeBid::Pass);
            }
            StakeBidInput::AllIn => score,
            StakeBidInput::Normal { amount } => amount,
        };

        if amount < question_price {
            return Err(DomainError::validation(
                ValidationKind::InvalidBid,
                format!("bid {amount} is below the question price {question_price}"),
            ));
        }
        if self.has_all_in() && amount != score {
            return Err(DomainError::validation(
                ValidationKind::InvalidBid,
                "after an all-in, only PASS or ALL-IN bids are accepted",
            ));
        }
        if amount > score {
            return Err(DomainError::validation(
                ValidationKind::InvalidBid,
                format!("bid {amount} exceeds the bidder's score {score}"),
            ));
        }
        if amount > self.max_price {
            return Err(DomainError::validation(
                ValidationKind::InvalidBid,
                format!("bid {amount} exceeds the maximum price {}", self.max_price),
            ));
        }
        if let Some(highest) = self.highest_bid {
            // An all-in matching the table's all-in is allowed to tie.
            let tie_allowed = self.has_all_in() && amount == score;
            if amount < highest || (amount == highest && !tie_allowed) {
                return Err(DomainError::validation(
                    ValidationKind::InvalidBid,
                    format!("bid {amount} does not exceed the current highest bid {highest}"),
                ));
            }
        }

        if amount == score {
            Ok(StakeBid::AllIn { amount })
        } else {
            Ok(StakeBid::Normal { amount })
        }
    }

    /// Record a validated bid for the current bidder.
    pub fn record_bid(&mut self, bidder: PlayerId, bid: StakeBid) {
        match bid {
            StakeBid::Pass => {
                if !self.has_passed(bidder) {
                    self.passed_players.push(bidder);
                }
            }
            StakeBid::Normal { amount } | StakeBid::AllIn { amount } => {
                self.highest_bid = Some(self.highest_bid.map_or(amount, |h| h.max(amount)));
            }
        }
        self.bids.insert(bidder, bid);
    }

    /// Advance to the next contender after the current bidder.
    ///
    /// Returns the new current bidder, or None when nobody but the
    /// leader remains.
    pub fn advance_turn(&mut self) -> Option<PlayerId> {
        let n = self.bidding_order.len();
        for step in 1..=n {
            let idx = (self.current_bidder_index + step) % n;
            let candidate = self.bidding_order[idx];
            if !self.has_passed(candidate) && Some(candidate) != self.leading_bidder() {
                self.current_bidder_index = idx;
                return Some(candidate);
            }
        }
        None
    }

    /// The player currently holding the highest bid.
    pub fn leading_bidder(&self) -> Option<PlayerId> {
        let highest = self.highest_bid?;
        self.bids
            .iter()
            .find(|(_, b)| b.amount() == Some(highest))
            .map(|(p, _)| *p)
    }

    /// The auction completes when a single contender remains and holds
    /// a bid.
    pub fn is_complete(&self) -> bool {
        let contenders = self.contenders();
        contenders.len() == 1 && self.bids.contains_key(&contenders[0])
    }

    /// Close the auction, fixing the winner.
    pub fn complete(&mut self) -> Result<PlayerId, DomainError> {
        let contenders = self.contenders();
        let winner = match contenders.as_slice() {
            [single] => *single,
            _ => self
                .leading_bidder()
                .ok_or_else(|| DomainError::invariant("auction completed without any bid"))?,
        };
        self.winner_player_id = Some(winner);
        self.bidding_phase = false;
        Ok(winner)
    }

    /// Drop a player from the auction (disconnect/kick): treated as a
    /// pass so the auction cannot stall.
    pub fn forfeit(&mut self, player: PlayerId) {
        if self.bidding_order.contains(&player) && !self.has_passed(player) {
            self.passed_players.push(player);
        }
    }
}
