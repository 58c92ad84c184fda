use crate::api::types::ShotData;
use crate::engine::hud::HudSnapshot;
use crate::rules::state::GameState;

/// Host callbacks. Each receives a copy-able view; nothing handed out here
/// aliases engine state.
pub trait EngineObserver {
    fn on_hud(&mut self, hud: &HudSnapshot);
    fn on_shot(&mut self, shot: &ShotData);
    fn on_state(&mut self, state: &GameState);
}

/// Ignores everything. For hosts that poll the event queue instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl EngineObserver for NullObserver {
    fn on_hud(&mut self, _hud: &HudSnapshot) {}
    fn on_shot(&mut self, _shot: &ShotData) {}
    fn on_state(&mut self, _state: &GameState) {}
}

/// Keeps a copy of every callback, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub huds: Vec<HudSnapshot>,
    pub shots: Vec<ShotData>,
    pub states: Vec<GameState>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_hud(&self) -> Option<&HudSnapshot> {
        self.huds.last()
    }
}

impl EngineObserver for RecordingObserver {
    fn on_hud(&mut self, hud: &HudSnapshot) {
        self.huds.push(hud.clone());
    }

    fn on_shot(&mut self, shot: &ShotData) {
        self.shots.push(*shot);
    }

    fn on_state(&mut self, state: &GameState) {
        self.states.push(state.clone());
    }
}
