use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Which sub-phase a countdown belongs to. Expirations are routed back
/// into the engine as the matching timer-expiration action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    Question,
    Answer,
    Bid,
    Final,
}

impl TimerKind {
    pub const ALL: [TimerKind; 4] = [
        TimerKind::Question,
        TimerKind::Answer,
        TimerKind::Bid,
        TimerKind::Final,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            TimerKind::Question => "question",
            TimerKind::Answer => "answer",
            TimerKind::Bid => "bid",
            TimerKind::Final => "final",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "question" => Some(TimerKind::Question),
            "answer" => Some(TimerKind::Answer),
            "bid" => Some(TimerKind::Bid),
            "final" => Some(TimerKind::Final),
            _ => None,
        }
    }
}

/// One outstanding countdown tied to the current sub-phase.
///
/// Stored as a single expiring value whose TTL is the remaining
/// duration; deleted when the phase resolves before expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    pub kind: TimerKind,
    pub duration_ms: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    /// Time already spent before (re)start, carried across pauses.
    pub elapsed_ms: u64,
}

impl Timer {
    pub fn start(kind: TimerKind, duration_ms: u64, now: OffsetDateTime) -> Self {
        Self {
            kind,
            duration_ms,
            started_at: now,
            elapsed_ms: 0,
        }
    }

    /// Milliseconds until expiry as of `now`.
    pub fn remaining_ms(&self, now: OffsetDateTime) -> u64 {
        let running = (now - self.started_at).whole_milliseconds().max(0) as u64;
        self.duration_ms
            .saturating_sub(self.elapsed_ms.saturating_add(running))
    }

    /// Freeze the timer at `now` (pause): elapsed time is folded in.
    pub fn freeze(&self, now: OffsetDateTime) -> u64 {
        let running = (now - self.started_at).whole_milliseconds().max(0) as u64;
        (self.elapsed_ms + running).min(self.duration_ms)
    }

    /// Resume a frozen timer with the recorded elapsed time.
    pub fn resume(kind: TimerKind, duration_ms: u64, elapsed_ms: u64, now: OffsetDateTime) -> Self {
        Self {
            kind,
            duration_ms,
            started_at: now,
            elapsed_ms,
        }
    }
}
