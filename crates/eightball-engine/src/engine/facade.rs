//! The engine facade: owns one table, one rules snapshot and the loop that
//! drives them. Hosts talk to it through typed entry points and read back
//! HUD snapshots and wire events; it never performs I/O.

use std::collections::VecDeque;

use glam::Vec2;

use crate::ai::difficulty::DifficultyProfile;
use crate::ai::planner::ShotPlanner;
use crate::api::config::MatchConfig;
use crate::api::types::{EndReason, Mode, ShotData, Side, Spin};
use crate::bridge::wire::{decode_shot, decode_state, MatchComplete, WireEvent};
use crate::core::ball::{Ball, CUE};
use crate::core::physics::{Simulation, StepStatus};
use crate::core::table::Table;
use crate::core::time::FixedTimestep;
use crate::engine::hud::{HudExtras, HudSnapshot};
use crate::engine::observer::{EngineObserver, NullObserver};
use crate::engine::schedule::Scheduled;
use crate::error::{ConfigError, ShotRejection, WireError};
use crate::input::aim::AimController;
use crate::input::queue::{InputEvent, InputQueue};
use crate::rules::referee::{check_cue_placement, finish, resolve_shot};
use crate::rules::state::{BallSnapshot, GameState};

/// Who produced a shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotSource {
    Local,
    Remote,
    Ai,
}

impl ShotSource {
    /// Local and AI shots are ours to publish; remote ones are replays.
    fn authoritative(self) -> bool {
        !matches!(self, ShotSource::Remote)
    }
}

#[derive(Debug)]
struct InFlight {
    sim: Simulation,
    shot: ShotData,
    source: ShotSource,
}

/// Remote writes that arrived while a shot was resolving.
#[derive(Debug, Clone)]
enum Inbound {
    Shot(ShotData),
    State(GameState),
}

pub struct Engine<O: EngineObserver = NullObserver> {
    observer: O,
    config: Option<MatchConfig>,
    table: Table,
    state: GameState,
    timestep: FixedTimestep,
    in_flight: Option<InFlight>,
    inbound: VecDeque<Inbound>,
    outbound: Vec<WireEvent>,
    planner: Option<ShotPlanner>,
    ai_timer: Scheduled<Side>,
    input: InputQueue,
    aim: AimController,
    spin: Spin,
    message: String,
    elapsed: f32,
    complete_sent: bool,
    /// Settled layout of the last replayed remote shot, kept until the
    /// peer's authoritative state arrives.
    last_replay: Option<Vec<BallSnapshot>>,
    desyncs: u32,
}

impl<O: EngineObserver> Engine<O> {
    /// An unconfigured engine. Call [`Engine::configure`] before use.
    pub fn new(observer: O) -> Self {
        let table = Table::standard();
        let state = GameState::new_rack(Side::P1, &table, table_ball_radius());
        Self {
            observer,
            config: None,
            table,
            state,
            timestep: FixedTimestep::new(1.0 / 240.0),
            in_flight: None,
            inbound: VecDeque::new(),
            outbound: Vec::new(),
            planner: None,
            ai_timer: Scheduled::new(),
            input: InputQueue::new(),
            aim: AimController::new(),
            spin: Spin::NONE,
            message: String::new(),
            elapsed: 0.0,
            complete_sent: false,
            last_replay: None,
            desyncs: 0,
        }
    }

    pub fn with_config(config: MatchConfig, observer: O) -> Result<Self, ConfigError> {
        let mut engine = Self::new(observer);
        engine.configure(config)?;
        Ok(engine)
    }

    /// One-time match setup.
    pub fn configure(&mut self, config: MatchConfig) -> Result<(), ConfigError> {
        if self.config.is_some() {
            if self.state.shot_count > 0 || self.in_flight.is_some() {
                return Err(ConfigError::MatchStarted);
            }
            return Err(ConfigError::AlreadyConfigured);
        }
        let profile = DifficultyProfile::for_level(config.difficulty_level, config.difficulty_tier)?;

        self.table = Table::new(&config.physics);
        self.state = GameState::new_rack(Side::P1, &self.table, config.physics.ball_radius);
        self.timestep = FixedTimestep::new(config.physics.fixed_dt);
        self.planner = config.ai_side().map(|_| {
            ShotPlanner::new(profile, config.physics.clone(), config.rules, config.seed)
        });
        self.in_flight = None;
        self.inbound.clear();
        self.outbound.clear();
        self.ai_timer.cancel();
        self.aim = AimController::new();
        self.elapsed = 0.0;
        self.complete_sent = false;
        self.last_replay = None;
        self.message = format!("{} to break", self.state.turn.label());

        log::info!(
            "match configured: mode={:?} local={} level={} ({:?})",
            config.mode,
            config.local_side.label(),
            config.difficulty_level,
            config.difficulty_tier
        );
        self.config = Some(config);
        self.publish_hud();
        self.schedule_ai();
        Ok(())
    }

    pub fn config(&self) -> Option<&MatchConfig> {
        self.config.as_ref()
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// A copy of the authoritative snapshot.
    pub fn snapshot(&self) -> GameState {
        self.state.clone()
    }

    pub fn is_shot_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn desync_count(&self) -> u32 {
        self.desyncs
    }

    /// Live ball positions: mid-shot while one is resolving, otherwise the
    /// settled layout.
    pub fn balls(&self) -> Vec<Ball> {
        match &self.in_flight {
            Some(flight) => flight.sim.balls().to_vec(),
            None => self.state.restore_balls(self.ball_radius()),
        }
    }

    pub fn hud(&self) -> HudSnapshot {
        let local = self.config.as_ref().map_or(Side::P1, |c| c.local_side);
        let time_remaining = self
            .config
            .as_ref()
            .and_then(|c| c.duration_seconds)
            .map(|d| (d - self.elapsed).max(0.0));
        let extras = HudExtras {
            shot_in_flight: self.in_flight.is_some(),
            ai_thinking: self.ai_timer.is_pending(),
            time_remaining,
            spin: self.spin,
            desyncs: self.desyncs,
        };
        HudSnapshot::build(&self.state, local, &self.message, extras)
    }

    /// Take every outbound wire event produced since the last call.
    pub fn drain_events(&mut self) -> Vec<WireEvent> {
        std::mem::take(&mut self.outbound)
    }

    // -- Shot entry points --

    pub fn apply_local_shot(&mut self, shot: ShotData) -> Result<(), ShotRejection> {
        let result = self.check_shot(&shot, ShotSource::Local);
        match result {
            Ok(()) => {
                self.start(shot, ShotSource::Local);
                Ok(())
            }
            Err(reason) => {
                self.reject(reason);
                Err(reason)
            }
        }
    }

    /// Replay the peer's shot through the same stepper. Queued if a shot is
    /// resolving or earlier writes are still waiting.
    pub fn apply_remote_shot(&mut self, shot: ShotData) -> Result<(), ShotRejection> {
        if self.config.is_none() {
            return Err(ShotRejection::NotConfigured);
        }
        if self.must_queue() {
            log::debug!("remote shot queued behind earlier writes");
            self.inbound.push_back(Inbound::Shot(shot));
            return Ok(());
        }
        match self.check_shot(&shot, ShotSource::Remote) {
            Ok(()) => {
                self.start(shot, ShotSource::Remote);
                Ok(())
            }
            Err(reason) => {
                self.reject(reason);
                Err(reason)
            }
        }
    }

    pub fn apply_remote_shot_json(&mut self, json: &str) -> Result<(), WireError> {
        let shot = decode_shot(json).map_err(|e| self.malformed("shot", e))?;
        self.apply_remote_shot(shot)?;
        Ok(())
    }

    /// Overwrite the snapshot with an authoritative one. Queued if a shot is
    /// resolving or earlier writes are still waiting.
    pub fn apply_state(&mut self, state: GameState) -> Result<(), WireError> {
        if self.config.is_none() {
            return Err(ShotRejection::NotConfigured.into());
        }
        if let Err(e) = state.validate() {
            return Err(self.malformed("state", e));
        }
        if self.must_queue() {
            log::debug!("authoritative state queued behind earlier writes");
            self.inbound.push_back(Inbound::State(state));
            return Ok(());
        }
        self.overwrite_state(state);
        Ok(())
    }

    pub fn apply_state_json(&mut self, json: &str) -> Result<(), WireError> {
        let state = decode_state(json).map_err(|e| self.malformed("state", e))?;
        self.apply_state(state)
    }

    // -- Shot preparation --

    /// Spin for the next local shot. Does not touch a shot in flight.
    pub fn set_spin(&mut self, x: f32, y: f32) {
        if !x.is_finite() || !y.is_finite() {
            log::warn!("ignoring non-finite spin ({}, {})", x, y);
            return;
        }
        self.spin = Spin::new(x, y).clamped();
        self.publish_hud();
    }

    pub fn set_ai_difficulty(&mut self, level: u32) -> Result<(), ConfigError> {
        let config = self.config.as_mut().ok_or(ConfigError::NotConfigured)?;
        let profile = DifficultyProfile::for_level(level, config.difficulty_tier)?;
        config.difficulty_level = level;
        if let Some(planner) = self.planner.as_mut() {
            planner.set_profile(profile);
        }
        log::info!("AI difficulty set to {}", level);
        Ok(())
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    // -- Loop --

    /// Advance by one host frame.
    pub fn tick(&mut self, frame_dt: f32) {
        if self.config.is_none() {
            return;
        }
        self.process_input();
        let steps = self.timestep.accumulate(frame_dt);
        let dt = self.timestep.dt();
        for _ in 0..steps {
            self.step(dt);
        }
    }

    fn step(&mut self, dt: f32) {
        if !self.state.is_over() {
            self.elapsed += dt;
        }

        if let Some(flight) = self.in_flight.as_mut() {
            if flight.sim.step() == StepStatus::Settled {
                self.settle();
            }
            return;
        }

        self.drain_inbound();
        if self.in_flight.is_some() {
            return;
        }

        if self.clock_expired() {
            self.time_up();
            return;
        }

        if let Some(side) = self.ai_timer.advance(dt) {
            self.take_ai_shot(side);
        }
    }

    /// Run any shot in flight to settle and apply every queued remote write.
    pub fn resolve_pending(&mut self) {
        loop {
            if let Some(flight) = self.in_flight.as_mut() {
                while flight.sim.step() == StepStatus::Moving {}
                self.settle();
            } else if !self.inbound.is_empty() {
                self.drain_inbound();
            } else {
                break;
            }
        }
    }

    // -- Lifecycle --

    /// `side` gives up the rack.
    pub fn concede(&mut self, side: Side) -> Result<(), ShotRejection> {
        if self.config.is_none() {
            return Err(ShotRejection::NotConfigured);
        }
        if self.state.is_over() {
            return Err(ShotRejection::GameOver);
        }
        if self.in_flight.is_some() {
            return Err(ShotRejection::ShotInFlight);
        }
        finish(&mut self.state, Some(side.opponent()), EndReason::Forfeit);
        self.message = format!("{} concedes", side.label());
        log::info!("{} conceded", side.label());
        self.publish_state();
        self.end_match();
        Ok(())
    }

    /// Rack again after a finished match. The other side breaks; stats and
    /// win streaks carry over.
    pub fn rematch(&mut self) -> Result<(), ConfigError> {
        let radius = self.config.as_ref().ok_or(ConfigError::NotConfigured)?.physics.ball_radius;
        if !self.state.is_over() {
            return Err(ConfigError::MatchStarted);
        }
        let breaker = self.state.breaker.opponent();
        let mut next = GameState::new_rack(breaker, &self.table, radius);
        next.stats = self.state.stats;
        for side in [Side::P1, Side::P2] {
            next.player_mut(side).consecutive_wins = self.state.player(side).consecutive_wins;
        }
        self.state = next;
        self.inbound.clear();
        self.ai_timer.cancel();
        self.aim = AimController::new();
        self.timestep.reset();
        self.elapsed = 0.0;
        self.complete_sent = false;
        self.last_replay = None;
        self.message = format!("Rematch: {} to break", breaker.label());
        log::info!("rematch, {} breaks", breaker.label());

        self.publish_state();
        self.publish_hud();
        self.schedule_ai();
        Ok(())
    }

    /// Stop the loop and release the table. The engine can be configured
    /// again afterwards.
    pub fn detach(&mut self) {
        self.in_flight = None;
        self.inbound.clear();
        self.ai_timer.cancel();
        self.planner = None;
        self.config = None;
        self.state.balls.clear();
        self.input.drain();
        log::info!("engine detached");
    }

    // -- Internals --

    fn ball_radius(&self) -> f32 {
        self.config
            .as_ref()
            .map_or_else(table_ball_radius, |c| c.physics.ball_radius)
    }

    fn cue_position(&self) -> Vec2 {
        self.state.ball(CUE).map_or(self.table.head_spot(), |b| b.pos)
    }

    fn check_shot(&self, shot: &ShotData, source: ShotSource) -> Result<(), ShotRejection> {
        let config = self.config.as_ref().ok_or(ShotRejection::NotConfigured)?;
        if self.state.is_over() {
            return Err(ShotRejection::GameOver);
        }
        if self.in_flight.is_some() {
            return Err(ShotRejection::ShotInFlight);
        }
        let shooter = match source {
            ShotSource::Local => config.local_side,
            ShotSource::Remote if config.mode == Mode::Practice => {
                return Err(ShotRejection::NotYourTurn);
            }
            ShotSource::Remote | ShotSource::Ai => config.local_side.opponent(),
        };
        if self.state.turn != shooter {
            return Err(ShotRejection::NotYourTurn);
        }
        if !shot.is_well_formed() {
            return Err(ShotRejection::InvalidShot);
        }
        let balls = self.state.restore_balls(config.physics.ball_radius);
        check_cue_placement(&self.state, shot, &self.table, &balls)
    }

    fn start(&mut self, shot: ShotData, source: ShotSource) {
        let Some(config) = self.config.as_ref() else {
            return;
        };
        let balls = self.state.restore_balls(config.physics.ball_radius);
        let mut sim = Simulation::new(self.table.clone(), balls, config.physics.clone());
        sim.strike(&shot);
        self.ai_timer.cancel();
        self.aim.cancel();
        if source == ShotSource::Local {
            self.aim.clear_placement();
        }
        log::debug!("{:?} shot by {} started", source, self.state.turn.label());
        self.in_flight = Some(InFlight { sim, shot, source });
        self.publish_hud();
    }

    fn settle(&mut self) {
        let Some(flight) = self.in_flight.take() else {
            return;
        };
        let Some(config) = self.config.as_ref() else {
            return;
        };
        let rules = config.rules;
        let outcome = flight.sim.outcome().clone();
        let balls = flight.sim.into_balls();
        let ruling = resolve_shot(
            &mut self.state,
            balls,
            &outcome,
            &rules,
            &self.table,
            flight.shot.power,
        );
        self.message = ruling.message;

        if flight.source.authoritative() {
            self.observer.on_shot(&flight.shot);
            self.outbound.push(WireEvent::Shot(flight.shot));
            self.publish_state();
        } else {
            self.last_replay = Some(self.state.balls.clone());
        }

        if self.state.is_over() {
            self.end_match();
        } else {
            self.publish_hud();
            self.schedule_ai();
        }
    }

    /// Inbound writes apply strictly in arrival order.
    fn must_queue(&self) -> bool {
        self.in_flight.is_some() || !self.inbound.is_empty()
    }

    fn drain_inbound(&mut self) {
        while self.in_flight.is_none() {
            let Some(next) = self.inbound.pop_front() else {
                return;
            };
            match next {
                Inbound::Shot(shot) => {
                    if let Err(reason) = self.check_shot(&shot, ShotSource::Remote) {
                        log::warn!("queued remote shot rejected: {}", reason);
                        self.reject(reason);
                    } else {
                        self.start(shot, ShotSource::Remote);
                    }
                }
                Inbound::State(state) => self.overwrite_state(state),
            }
        }
    }

    fn overwrite_state(&mut self, state: GameState) {
        let replayed = self.last_replay.take();
        if replayed.is_some_and(|balls| balls != state.balls) {
            self.desyncs += 1;
            log::warn!("desync with peer after shot {}, taking their state", state.shot_count);
            self.message = "Resynced with peer".to_string();
        } else if !state.last_shot_result.is_empty() {
            self.message = state.last_shot_result.clone();
        }
        self.complete_sent = state.is_over();
        self.state = state;
        self.ai_timer.cancel();
        self.publish_hud();
        self.schedule_ai();
    }

    fn clock_expired(&self) -> bool {
        match self.config.as_ref().and_then(|c| c.duration_seconds) {
            Some(limit) => !self.state.is_over() && self.elapsed >= limit,
            None => false,
        }
    }

    fn time_up(&mut self) {
        let p1 = self.state.score(Side::P1);
        let p2 = self.state.score(Side::P2);
        let winner = match p1.cmp(&p2) {
            std::cmp::Ordering::Greater => Some(Side::P1),
            std::cmp::Ordering::Less => Some(Side::P2),
            std::cmp::Ordering::Equal => None,
        };
        finish(&mut self.state, winner, EndReason::TimeUp);
        self.message = match winner {
            Some(side) => format!("Time! {} wins {}-{}", side.label(), p1, p2),
            None => format!("Time! Draw {}-{}", p1, p2),
        };
        log::info!("match clock expired at {:.1}s", self.elapsed);
        self.publish_state();
        self.end_match();
    }

    fn take_ai_shot(&mut self, side: Side) {
        if self.state.turn != side || self.state.is_over() {
            return;
        }
        let Some(planner) = self.planner.as_mut() else {
            return;
        };
        let shot = planner.plan(&self.state);
        match self.check_shot(&shot, ShotSource::Ai) {
            Ok(()) => self.start(shot, ShotSource::Ai),
            Err(reason) => {
                // A planner placement can only fail on a layout it did not
                // see; shoot from where the cue ball lies instead
                log::warn!("AI shot rejected ({}), retrying without placement", reason);
                let fallback = ShotData { cue_ball: None, ..shot };
                if self.check_shot(&fallback, ShotSource::Ai).is_ok() {
                    self.start(fallback, ShotSource::Ai);
                }
            }
        }
    }

    fn schedule_ai(&mut self) {
        let Some(config) = self.config.as_ref() else {
            return;
        };
        let (Some(ai), Some(planner)) = (config.ai_side(), self.planner.as_ref()) else {
            return;
        };
        if self.state.turn != ai || self.state.is_over() || self.in_flight.is_some() {
            return;
        }
        if !self.ai_timer.is_pending() {
            self.ai_timer.arm(ai, planner.profile().think_time_ms);
            self.publish_hud();
        }
    }

    fn process_input(&mut self) {
        for event in self.input.drain() {
            match event {
                InputEvent::PointerDown { x, y } => self.aim.pointer_down(Vec2::new(x, y)),
                InputEvent::PointerMove { x, y } => self.aim.pointer_move(Vec2::new(x, y)),
                InputEvent::PointerUp { x, y } => {
                    let cue = self.cue_position();
                    if let Some(shot) = self.aim.pointer_up(Vec2::new(x, y), cue, self.spin) {
                        // Rejections already surface through the HUD
                        let _ = self.apply_local_shot(shot);
                    }
                }
                InputEvent::PlaceCueBall { x, y } => {
                    if self.state.ball_in_hand {
                        self.aim.place(Vec2::new(x, y));
                    } else {
                        self.reject(ShotRejection::BallInHandViolated);
                    }
                }
                InputEvent::SetSpin { x, y } => self.set_spin(x, y),
                InputEvent::CancelAim => self.aim.cancel(),
            }
        }
    }

    fn reject(&mut self, reason: ShotRejection) {
        log::warn!("shot rejected: {}", reason);
        self.message = format!("Shot rejected: {}", reason);
        self.publish_hud();
    }

    fn malformed(&mut self, what: &str, err: WireError) -> WireError {
        log::warn!("malformed remote {}: {}", what, err);
        self.message = format!("Ignored invalid {} from peer", what);
        self.publish_hud();
        err
    }

    fn publish_hud(&mut self) {
        let hud = self.hud();
        self.observer.on_hud(&hud);
    }

    fn publish_state(&mut self) {
        self.observer.on_state(&self.state);
        self.outbound.push(WireEvent::State(self.state.clone()));
    }

    /// Emit `complete` exactly once per rack.
    fn end_match(&mut self) {
        self.ai_timer.cancel();
        if !self.complete_sent {
            self.complete_sent = true;
            if let Some(config) = self.config.as_ref() {
                let complete = MatchComplete {
                    winner_id: self.state.winner.map(|s| config.player_id(s).to_string()),
                    player1_score: self.state.score(Side::P1),
                    player2_score: self.state.score(Side::P2),
                    match_duration_seconds: self.elapsed,
                    end_reason: self.state.end_reason.unwrap_or(EndReason::Forfeit),
                };
                log::info!(
                    "match complete: winner={:?} {}-{}",
                    complete.winner_id,
                    complete.player1_score,
                    complete.player2_score
                );
                self.outbound.push(WireEvent::Complete(complete));
            }
        }
        self.publish_hud();
    }
}

fn table_ball_radius() -> f32 {
    crate::api::config::PhysicsConfig::default().ball_radius
}

impl Default for Engine<NullObserver> {
    fn default() -> Self {
        Self::new(NullObserver)
    }
}
