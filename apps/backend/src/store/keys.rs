//! Store key layout.
//!
//! `game:{id}`              hash: serialized game state + meta
//! `game:package:{id}`      hash: immutable question/round data
//! `game:action:lock:{id}`  string, short TTL, conditional-set
//! `game:action:queue:{id}` list of serialized action envelopes
//! `timer:{id}:{kind}`      string, TTL = remaining duration
//! `socket:session:{sid}`   hash: socket ↔ {user, game} association

use crate::domain::timer::TimerKind;

pub fn game(game_id: &str) -> String {
    format!("game:{game_id}")
}

pub fn package(game_id: &str) -> String {
    format!("game:package:{game_id}")
}

pub fn lock(game_id: &str) -> String {
    format!("game:action:lock:{game_id}")
}

pub fn queue(game_id: &str) -> String {
    format!("game:action:queue:{game_id}")
}

pub fn timer(game_id: &str, kind: TimerKind) -> String {
    format!("timer:{game_id}:{}", kind.as_str())
}

/// All possible timer keys of a game, in `TimerKind::ALL` order. At
/// most one exists at a time.
pub fn all_timers(game_id: &str) -> Vec<String> {
    TimerKind::ALL
        .iter()
        .map(|kind| timer(game_id, *kind))
        .collect()
}

pub fn session(socket_id: &str) -> String {
    format!("socket:session:{socket_id}")
}

/// Parse an expired timer key back into `(game_id, kind)`.
pub fn parse_timer_key(key: &str) -> Option<(String, TimerKind)> {
    let rest = key.strip_prefix("timer:")?;
    let (game_id, kind_raw) = rest.rsplit_once(':')?;
    if game_id.is_empty() {
        return None;
    }
    let kind = TimerKind::parse(kind_raw)?;
    Some((game_id.to_string(), kind))
}
