//! Error codes for the Quizhall game engine.
//!
//! This module defines all error codes used throughout the engine.
//! Add new codes here; never pass ad-hoc strings as error codes.
//!
//! All error codes are SCREAMING_SNAKE_CASE and map 1:1 to the strings
//! that appear in action responses and error events.

use core::fmt;

/// Centralized error codes for the Quizhall game engine.
///
/// This enum ensures type safety and prevents the use of ad-hoc error codes.
/// Each variant maps to a canonical SCREAMING_SNAKE_CASE string that appears
/// in the `error` field of a failed action response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Role & membership
    /// Caller is not a member of the game
    NotAMember,
    /// Caller's role does not permit this action
    InsufficientRole,

    // Action validation
    /// Unknown or malformed action payload
    InvalidPayload,
    /// Action not valid in the current question state
    PhaseMismatch,
    /// Caller acted out of turn
    OutOfTurn,
    /// Stake or final-round bid violates the bidding rules
    InvalidBid,
    /// Secret-question transfer target is not eligible
    InvalidTransfer,
    /// Theme cannot be eliminated (unknown or already gone)
    InvalidTheme,
    /// Board slot is occupied or out of range
    InvalidSlot,
    /// General validation error
    ValidationError,

    // Resource not found
    /// Game not found in the store
    GameNotFound,
    /// Question not present in the game's package
    QuestionNotFound,
    /// Round not present in the game's package
    RoundNotFound,
    /// Player not found in the game
    PlayerNotFound,
    /// General not found error
    NotFound,

    // Conflicts
    /// Action raced a concurrent state change
    Conflict,

    // System errors
    /// Store command failed
    StoreError,
    /// Store unreachable
    StoreUnavailable,
    /// Game record failed to decode
    DataCorruption,
    /// Internal invariant violated
    Internal,
    /// Configuration error
    ConfigError,
}

impl ErrorCode {
    /// Returns the canonical SCREAMING_SNAKE_CASE string for this error code.
    ///
    /// This is the exact string that appears in action responses.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotAMember => "NOT_A_MEMBER",
            Self::InsufficientRole => "INSUFFICIENT_ROLE",

            Self::InvalidPayload => "INVALID_PAYLOAD",
            Self::PhaseMismatch => "PHASE_MISMATCH",
            Self::OutOfTurn => "OUT_OF_TURN",
            Self::InvalidBid => "INVALID_BID",
            Self::InvalidTransfer => "INVALID_TRANSFER",
            Self::InvalidTheme => "INVALID_THEME",
            Self::InvalidSlot => "INVALID_SLOT",
            Self::ValidationError => "VALIDATION_ERROR",

            Self::GameNotFound => "GAME_NOT_FOUND",
            Self::QuestionNotFound => "QUESTION_NOT_FOUND",
            Self::RoundNotFound => "ROUND_NOT_FOUND",
            Self::PlayerNotFound => "PLAYER_NOT_FOUND",
            Self::NotFound => "NOT_FOUND",

            Self::Conflict => "CONFLICT",

            Self::StoreError => "STORE_ERROR",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::DataCorruption => "DATA_CORRUPTION",
            Self::Internal => "INTERNAL",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
