use std::env;

use crate::error::AppError;

/// Tunables of the action engine.
///
/// Lock TTL, timer durations, bid minimums and score caps are
/// deployment policy, not constants. Every field can be overridden
/// from the environment; the defaults are sane for a single-node
/// deployment.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// TTL of the per-game lock key, in milliseconds. Bounds the damage
    /// of a crashed lock holder.
    pub lock_ttl_ms: u64,
    /// TTL of the game hash and its package hash, renewed on every
    /// prefetch and save.
    pub game_ttl_ms: u64,
    /// TTL applied to game keys once the game completes, so late
    /// readers still see the final scoreboard for a while.
    pub finished_linger_ms: u64,
    /// Countdown while a question is shown and players may answer.
    pub question_timer_ms: u64,
    /// Countdown for a single player's answer.
    pub answer_timer_ms: u64,
    /// Countdown for one stake-bidding turn.
    pub bid_timer_ms: u64,
    /// Countdown for each final-round phase.
    pub final_timer_ms: u64,
    /// How long the answer stays on screen before the board returns.
    pub answer_reveal_ms: u64,
    /// Minimum final-round bid forced onto non-positive scores.
    pub min_final_bid: i64,
    /// Absolute score ceiling (soft cap, applies in both directions).
    pub max_score: i64,
    /// Maximum score change a single final-round review may apply.
    pub max_review_delta: i64,
    /// Default cap for stake bids when the package does not set one.
    pub default_max_stake_price: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_ttl_ms: 10_000,
            game_ttl_ms: 2 * 60 * 60 * 1000,
            finished_linger_ms: 10 * 60 * 1000,
            question_timer_ms: 30_000,
            answer_timer_ms: 20_000,
            bid_timer_ms: 30_000,
            final_timer_ms: 45_000,
            answer_reveal_ms: 5_000,
            min_final_bid: 1,
            max_score: 1_000_000,
            max_review_delta: 100_000,
            default_max_stake_price: 100_000,
        }
    }
}

impl EngineConfig {
    /// Build a config from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        Ok(Self {
            lock_ttl_ms: var_u64("ENGINE_LOCK_TTL_MS", defaults.lock_ttl_ms)?,
            game_ttl_ms: var_u64("ENGINE_GAME_TTL_MS", defaults.game_ttl_ms)?,
            finished_linger_ms: var_u64("ENGINE_FINISHED_LINGER_MS", defaults.finished_linger_ms)?,
            question_timer_ms: var_u64("ENGINE_QUESTION_TIMER_MS", defaults.question_timer_ms)?,
            answer_timer_ms: var_u64("ENGINE_ANSWER_TIMER_MS", defaults.answer_timer_ms)?,
            bid_timer_ms: var_u64("ENGINE_BID_TIMER_MS", defaults.bid_timer_ms)?,
            final_timer_ms: var_u64("ENGINE_FINAL_TIMER_MS", defaults.final_timer_ms)?,
            answer_reveal_ms: var_u64("ENGINE_ANSWER_REVEAL_MS", defaults.answer_reveal_ms)?,
            min_final_bid: var_i64("ENGINE_MIN_FINAL_BID", defaults.min_final_bid)?,
            max_score: var_i64("ENGINE_MAX_SCORE", defaults.max_score)?,
            max_review_delta: var_i64("ENGINE_MAX_REVIEW_DELTA", defaults.max_review_delta)?,
            default_max_stake_price: var_i64(
                "ENGINE_DEFAULT_MAX_STAKE_PRICE",
                defaults.default_max_stake_price,
            )?,
        })
    }
}

fn var_u64(name: &str, default: u64) -> Result<u64, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|_| AppError::config(format!("'{name}' must be a non-negative integer"))),
        Err(_) => Ok(default),
    }
}

fn var_i64(name: &str, default: i64) -> Result<i64, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<i64>()
            .map_err(|_| AppError::config(format!("'{name}' must be an integer"))),
        Err(_) => Ok(default),
    }
}
