//! Shared bed for handler tests: a fixture game, package, config, and
//! helpers for inspecting declared mutations.

use serde_json::Value;
use time::macros::datetime;
use time::OffsetDateTime;

use crate::actions::ActionContext;
use crate::config::EngineConfig;
use crate::domain::game::Game;
use crate::domain::package::GamePackage;
use crate::domain::test_fixtures;
use crate::domain::timer::{Timer, TimerKind};
use crate::engine::mutation::DataMutation;

pub const NOW: OffsetDateTime = datetime!(2025-01-10 18:30 UTC);

pub struct TestBed {
    pub package: GamePackage,
    pub config: EngineConfig,
}

impl TestBed {
    pub fn new() -> Self {
        Self {
            package: test_fixtures::package(),
            config: EngineConfig::default(),
        }
    }

    pub fn ctx(&self, game: Game, caller: Option<i64>, payload: Value) -> ActionContext<'_> {
        ActionContext {
            game,
            current_player_id: caller,
            timer: None,
            payload,
            package: &self.package,
            config: &self.config,
            now: NOW,
            socket_id: "s-test".to_string(),
        }
    }

    pub fn ctx_with_timer(
        &self,
        game: Game,
        caller: Option<i64>,
        payload: Value,
        kind: TimerKind,
        duration_ms: u64,
    ) -> ActionContext<'_> {
        let mut ctx = self.ctx(game, caller, payload);
        ctx.timer = Some(Timer::start(kind, duration_ms, NOW));
        ctx
    }
}

/// The game the handler declared for saving, if any.
pub fn saved_game(mutations: &[DataMutation]) -> Option<&Game> {
    mutations.iter().find_map(|m| match m {
        DataMutation::SaveGame(game) => Some(game.as_ref()),
        _ => None,
    })
}

pub fn set_timers(mutations: &[DataMutation]) -> Vec<TimerKind> {
    mutations
        .iter()
        .filter_map(|m| match m {
            DataMutation::TimerSet(timer) => Some(timer.kind),
            _ => None,
        })
        .collect()
}

pub fn has_timer_delete(mutations: &[DataMutation]) -> bool {
    mutations
        .iter()
        .any(|m| matches!(m, DataMutation::TimerDelete))
}

pub fn has_completion(mutations: &[DataMutation]) -> bool {
    mutations
        .iter()
        .any(|m| matches!(m, DataMutation::GameCompletion { .. }))
}
