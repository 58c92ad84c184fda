//! `#[wasm_bindgen]` exports for the browser host.
//!
//! The host calls `match_init` once with its match config JSON, then
//! `match_tick` every animation frame. Input, remote payloads and lifecycle
//! calls go through the free functions below; the frame block is read
//! straight out of wasm memory via `frame_ptr`/`frame_len`.

pub mod runner;

use std::cell::RefCell;

use eightball_engine::{InputEvent, MatchConfig};
use wasm_bindgen::prelude::*;

pub use runner::MatchRunner;

thread_local! {
    static RUNNER: RefCell<Option<MatchRunner>> = const { RefCell::new(None) };
}

/// Run `f` against the runner, or return `default` before `match_init`.
fn with_runner<R>(default: R, f: impl FnOnce(&mut MatchRunner) -> R) -> R {
    RUNNER.with(|cell| match cell.borrow_mut().as_mut() {
        Some(runner) => f(runner),
        None => {
            log::warn!("match not initialized; call match_init() first");
            default
        }
    })
}

/// Configure the match. Returns false (and logs why) on a bad config.
#[wasm_bindgen]
pub fn match_init(config_json: &str) -> bool {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let runner = MatchConfig::from_json(config_json).and_then(MatchRunner::new);
    match runner {
        Ok(runner) => {
            RUNNER.with(|cell| *cell.borrow_mut() = Some(runner));
            log::info!("eightball: initialized");
            true
        }
        Err(e) => {
            log::error!("eightball: {}", e);
            false
        }
    }
}

#[wasm_bindgen]
pub fn match_tick(dt: f32) {
    with_runner((), |r| r.tick(dt));
}

#[wasm_bindgen]
pub fn pointer_down(x: f32, y: f32) {
    with_runner((), |r| r.push_input(InputEvent::PointerDown { x, y }));
}

#[wasm_bindgen]
pub fn pointer_move(x: f32, y: f32) {
    with_runner((), |r| r.push_input(InputEvent::PointerMove { x, y }));
}

#[wasm_bindgen]
pub fn pointer_up(x: f32, y: f32) {
    with_runner((), |r| r.push_input(InputEvent::PointerUp { x, y }));
}

#[wasm_bindgen]
pub fn cancel_aim() {
    with_runner((), |r| r.push_input(InputEvent::CancelAim));
}

#[wasm_bindgen]
pub fn place_cue_ball(x: f32, y: f32) {
    with_runner((), |r| r.push_input(InputEvent::PlaceCueBall { x, y }));
}

#[wasm_bindgen]
pub fn set_spin(x: f32, y: f32) {
    with_runner((), |r| r.set_spin(x, y));
}

#[wasm_bindgen]
pub fn set_difficulty(level: u32) -> bool {
    with_runner(false, |r| match r.set_difficulty(level) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("{}", e);
            false
        }
    })
}

// ---- Transport ----

/// Feed a `shot` payload from the peer. False if it was dropped.
#[wasm_bindgen]
pub fn remote_shot(json: &str) -> bool {
    with_runner(false, |r| r.remote_shot(json).is_ok())
}

/// Feed an authoritative `state` payload from the peer.
#[wasm_bindgen]
pub fn remote_state(json: &str) -> bool {
    with_runner(false, |r| r.remote_state(json).is_ok())
}

/// Outbound events since the last call, as a JSON array.
#[wasm_bindgen]
pub fn take_events() -> String {
    with_runner("[]".to_string(), |r| r.take_events())
}

// ---- Lifecycle ----

#[wasm_bindgen]
pub fn concede() -> bool {
    with_runner(false, |r| r.concede())
}

#[wasm_bindgen]
pub fn rematch() -> bool {
    with_runner(false, |r| r.rematch())
}

#[wasm_bindgen]
pub fn detach() {
    with_runner((), |r| r.detach());
    RUNNER.with(|cell| *cell.borrow_mut() = None);
}

// ---- Data accessors ----

#[wasm_bindgen]
pub fn hud_json() -> String {
    with_runner("{}".to_string(), |r| r.hud_json())
}

#[wasm_bindgen]
pub fn frame_ptr() -> *const f32 {
    with_runner(std::ptr::null(), |r| r.frame_ptr())
}

#[wasm_bindgen]
pub fn frame_len() -> u32 {
    with_runner(0, |r| r.frame_len())
}
