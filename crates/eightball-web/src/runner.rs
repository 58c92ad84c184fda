use eightball_engine::bridge::protocol::FRAME_FLOATS;
use eightball_engine::{
    write_frame, ConfigError, Engine, HudFrame, InputEvent, MatchConfig, NullObserver, Side,
    WireError, WireEvent,
};

/// Wires one engine to the browser host.
///
/// wasm-bindgen cannot export generic structs, so the crate root keeps a
/// `thread_local!` MatchRunner and exports free functions around it.
pub struct MatchRunner {
    engine: Engine<NullObserver>,
    /// Flat frame block the host reads through `frame_ptr`/`frame_len`.
    frame: Vec<f32>,
    frame_counter: u32,
}

impl MatchRunner {
    pub fn new(config: MatchConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            engine: Engine::with_config(config, NullObserver)?,
            frame: Vec::with_capacity(FRAME_FLOATS),
            frame_counter: 0,
        })
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.engine.push_input(event);
    }

    /// Run one host frame and refresh the frame block.
    pub fn tick(&mut self, dt: f32) {
        self.engine.tick(dt);
        self.frame_counter = self.frame_counter.wrapping_add(1);
        let hud = HudFrame::from_snapshot(&self.engine.hud(), self.frame_counter);
        write_frame(&mut self.frame, &hud, &self.engine.balls());
    }

    pub fn remote_shot(&mut self, json: &str) -> Result<(), WireError> {
        self.engine.apply_remote_shot_json(json)
    }

    pub fn remote_state(&mut self, json: &str) -> Result<(), WireError> {
        self.engine.apply_state_json(json)
    }

    pub fn set_spin(&mut self, x: f32, y: f32) {
        self.engine.set_spin(x, y);
    }

    pub fn set_difficulty(&mut self, level: u32) -> Result<(), ConfigError> {
        self.engine.set_ai_difficulty(level)
    }

    pub fn concede(&mut self) -> bool {
        let local = self.engine.config().map_or(Side::P1, |c| c.local_side);
        match self.engine.concede(local) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("concede refused: {}", e);
                false
            }
        }
    }

    pub fn rematch(&mut self) -> bool {
        match self.engine.rematch() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("rematch refused: {}", e);
                false
            }
        }
    }

    pub fn detach(&mut self) {
        self.engine.detach();
        self.frame.clear();
    }

    /// Outbound events as a JSON array of `{"type", "payload"}` envelopes.
    pub fn take_events(&mut self) -> String {
        let events: Vec<WireEvent> = self.engine.drain_events();
        if events.is_empty() {
            return "[]".to_string();
        }
        serde_json::to_string(&events).unwrap_or_else(|e| {
            log::error!("failed to encode {} outbound events: {}", events.len(), e);
            "[]".to_string()
        })
    }

    pub fn hud_json(&self) -> String {
        serde_json::to_string(&self.engine.hud()).unwrap_or_else(|e| {
            log::error!("failed to encode HUD: {}", e);
            "{}".to_string()
        })
    }

    // ---- Pointer accessors for SharedArrayBuffer reads ----

    pub fn frame_ptr(&self) -> *const f32 {
        self.frame.as_ptr()
    }

    pub fn frame_len(&self) -> u32 {
        self.frame.len() as u32
    }
}
