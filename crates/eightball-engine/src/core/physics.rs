//! Collision resolver: advances every ball by one fixed tick.
//!
//! Each tick applies cloth friction, integrates positions, captures balls
//! whose swept path crosses a pocket, resolves ball-ball contacts with an
//! equal-mass impulse along the line of centres, then reflects balls off the
//! cushions. Nothing here knows about game rules; the tick only records what
//! happened (first contact, rails, pockets) for the referee.
//!
//! No step ever adds kinetic energy: friction and restitution only remove
//! it, spin transfers are clamped to the energy present after the impulse,
//! and english only rotates a rebound.

use glam::Vec2;

use crate::api::config::PhysicsConfig;
use crate::api::types::ShotData;
use crate::core::ball::{Ball, CUE};
use crate::core::geometry::{rotate, segment_point_distance};
use crate::core::table::Table;

/// What happened during one shot, from strike to settle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShotOutcome {
    /// First object ball the cue ball touched.
    pub first_contact: Option<u8>,
    /// Balls pocketed this shot, in the order they dropped.
    pub pocketed: Vec<u8>,
    /// Cushion hits by any ball.
    pub rail_contacts: u32,
    /// Whether any ball hit a cushion after the first contact.
    pub rail_after_contact: bool,
    /// Ticks the shot took to settle.
    pub ticks: u32,
    /// The tick budget ran out and the table was force-settled.
    pub degenerate: bool,
}

impl ShotOutcome {
    pub fn potted(&self, number: u8) -> bool {
        self.pocketed.contains(&number)
    }

    pub fn cue_pocketed(&self) -> bool {
        self.potted(CUE)
    }

    /// Pocketed balls other than the cue ball.
    pub fn object_balls(&self) -> impl Iterator<Item = u8> + '_ {
        self.pocketed.iter().copied().filter(|&n| n != CUE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Moving,
    Settled,
}

/// Borrow two distinct balls mutably (`i < j`).
fn pair_mut(balls: &mut [Ball], i: usize, j: usize) -> (&mut Ball, &mut Ball) {
    let (left, right) = balls.split_at_mut(j);
    (&mut left[i], &mut right[0])
}

/// Deterministic fixed-tick table simulation.
#[derive(Debug, Clone)]
pub struct Simulation {
    table: Table,
    balls: Vec<Ball>,
    config: PhysicsConfig,
    outcome: ShotOutcome,
    /// Positions at the start of the current tick, for swept pocket checks.
    prev: Vec<Vec2>,
    follow_pending: bool,
    active: bool,
}

impl Simulation {
    pub fn new(table: Table, balls: Vec<Ball>, config: PhysicsConfig) -> Self {
        let prev = balls.iter().map(|b| b.pos).collect();
        Self {
            table,
            balls,
            config,
            outcome: ShotOutcome::default(),
            prev,
            follow_pending: false,
            active: false,
        }
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    pub fn into_balls(self) -> Vec<Ball> {
        self.balls
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn outcome(&self) -> &ShotOutcome {
        &self.outcome
    }

    /// Whether a shot is still resolving.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn kinetic_energy(&self) -> f32 {
        self.balls.iter().map(Ball::kinetic_energy).sum()
    }

    /// Strike the cue ball. A `cue_ball` placement on the shot must already
    /// have been validated by the caller.
    pub fn strike(&mut self, shot: &ShotData) {
        self.outcome = ShotOutcome::default();
        let speed = shot.power.clamp(0.0, 1.0) * self.config.max_shot_speed;
        let spin = shot.spin.clamped();
        if let Some(cue) = self.balls.iter_mut().find(|b| b.is_cue()) {
            if let Some(pos) = shot.cue_ball {
                cue.respot(pos);
            }
            cue.vel = shot.direction() * speed;
            cue.spin = spin.as_vec2();
        }
        self.follow_pending = spin.y != 0.0;
        self.active = true;
        log::debug!(
            "strike: angle={:.4} power={:.3} spin=({:.2}, {:.2})",
            shot.angle,
            shot.power,
            spin.x,
            spin.y
        );
    }

    /// Advance one fixed tick.
    pub fn step(&mut self) -> StepStatus {
        if !self.active {
            return StepStatus::Settled;
        }
        let dt = self.config.fixed_dt;
        self.outcome.ticks += 1;

        self.apply_friction(dt);
        self.integrate(dt);
        self.capture_swept();
        self.resolve_ball_contacts();
        self.resolve_rails();
        self.capture_resting();

        if self.all_at_rest() {
            self.active = false;
            return StepStatus::Settled;
        }
        if self.outcome.ticks >= self.config.max_ticks {
            self.force_settle();
            return StepStatus::Settled;
        }
        StepStatus::Moving
    }

    /// Step until the table settles (or the tick budget runs out).
    pub fn run_to_settle(&mut self) -> ShotOutcome {
        while self.step() == StepStatus::Moving {}
        self.outcome.clone()
    }

    fn apply_friction(&mut self, dt: f32) {
        let damping = (1.0 - self.table.linear_damping * dt).max(0.0);
        let decel = self.table.rolling_friction * dt;
        let settle = self.config.settle_speed;
        let spin_keep = (1.0 - self.config.spin_decay * dt).max(0.0);

        for ball in self.balls.iter_mut().filter(|b| b.on_table()) {
            let speed = ball.speed();
            if speed == 0.0 {
                continue;
            }
            let reduced = speed * damping - decel;
            if reduced <= settle {
                ball.vel = Vec2::ZERO;
            } else {
                ball.vel *= reduced / speed;
            }
            ball.spin.y *= spin_keep;
        }
    }

    fn integrate(&mut self, dt: f32) {
        for (ball, prev) in self.balls.iter_mut().zip(self.prev.iter_mut()) {
            *prev = ball.pos;
            if ball.on_table() {
                ball.pos += ball.vel * dt;
            }
        }
    }

    /// Pocket balls whose path this tick crossed a capture radius.
    fn capture_swept(&mut self) {
        for (ball, prev) in self.balls.iter_mut().zip(self.prev.iter()) {
            if ball.pocketed {
                continue;
            }
            let hit = self
                .table
                .pockets
                .iter()
                .find(|p| segment_point_distance(*prev, ball.pos, p.center) < p.radius);
            if let Some(pocket) = hit {
                ball.sink(pocket.center);
                self.outcome.pocketed.push(ball.number);
                log::debug!("ball {} pocketed", ball.number);
            }
        }
    }

    /// Pocket balls pushed into a capture radius by contact corrections.
    fn capture_resting(&mut self) {
        for ball in self.balls.iter_mut().filter(|b| b.on_table()) {
            if let Some(index) = self.table.pocket_at(ball.pos) {
                ball.sink(self.table.pockets[index].center);
                self.outcome.pocketed.push(ball.number);
                log::debug!("ball {} dropped into pocket {}", ball.number, index);
            }
        }
    }

    fn resolve_ball_contacts(&mut self) {
        let restitution = self.config.ball_restitution;
        let follow_transfer = self.config.follow_transfer;
        let count = self.balls.len();

        for i in 0..count {
            for j in (i + 1)..count {
                let (a, b) = pair_mut(&mut self.balls, i, j);
                if a.pocketed || b.pocketed {
                    continue;
                }
                if a.vel == Vec2::ZERO && b.vel == Vec2::ZERO {
                    continue;
                }
                let delta = b.pos - a.pos;
                let min_dist = a.radius + b.radius;
                let dist_sq = delta.length_squared();
                if dist_sq >= min_dist * min_dist {
                    continue;
                }

                let dist = dist_sq.sqrt();
                let normal = if dist > 1e-9 {
                    delta / dist
                } else {
                    (a.vel - b.vel).normalize_or(Vec2::X)
                };

                // Separate the pair equally along the normal
                let separation = normal * ((min_dist - dist) * 0.5);
                a.pos -= separation;
                b.pos += separation;

                if self.outcome.first_contact.is_none() {
                    if a.is_cue() {
                        self.outcome.first_contact = Some(b.number);
                    } else if b.is_cue() {
                        self.outcome.first_contact = Some(a.number);
                    }
                }

                let v_along_normal = (a.vel - b.vel).dot(normal);
                if v_along_normal <= 0.0 {
                    continue;
                }

                // Equal masses: exchange the normal component, tangential kept
                let impulse = normal * (v_along_normal * (1.0 + restitution) * 0.5);
                a.vel -= impulse;
                b.vel += impulse;

                if self.follow_pending && (a.is_cue() || b.is_cue()) {
                    self.follow_pending = false;
                    let (cue, object, push) = if a.is_cue() {
                        (a, b, impulse)
                    } else {
                        (b, a, -impulse)
                    };
                    apply_follow(cue, object, push, follow_transfer);
                }
            }
        }
    }

    fn resolve_rails(&mut self) {
        let restitution = self.table.rail_restitution;
        let english_angle = self.config.english_angle;

        for ball in self.balls.iter_mut().filter(|b| b.on_table()) {
            for rail in &self.table.rails {
                let Some(d) = rail.distance(ball.pos) else {
                    continue;
                };
                if d >= ball.radius {
                    continue;
                }
                ball.pos += rail.normal * (ball.radius - d);

                let v_into = ball.vel.dot(rail.normal);
                if v_into >= 0.0 {
                    continue;
                }
                ball.vel -= rail.normal * (v_into * (1.0 + restitution));

                if ball.is_cue() && ball.spin.x != 0.0 {
                    let deflected = rotate(ball.vel, -ball.spin.x * english_angle);
                    // English bends the rebound but never sends it back into the cushion
                    if deflected.dot(rail.normal) > 0.0 {
                        ball.vel = deflected;
                    }
                    ball.spin.x *= 0.5;
                }

                self.outcome.rail_contacts += 1;
                if self.outcome.first_contact.is_some() {
                    self.outcome.rail_after_contact = true;
                }
            }
        }
    }

    fn all_at_rest(&mut self) -> bool {
        let settle = self.config.settle_speed;
        if self
            .balls
            .iter()
            .any(|b| b.on_table() && b.speed() >= settle)
        {
            return false;
        }
        for ball in &mut self.balls {
            ball.vel = Vec2::ZERO;
        }
        true
    }

    fn force_settle(&mut self) {
        log::warn!(
            "shot exceeded {} ticks, force-settling the table",
            self.config.max_ticks
        );
        for ball in &mut self.balls {
            ball.vel = Vec2::ZERO;
            ball.spin = Vec2::ZERO;
        }
        self.outcome.degenerate = true;
        self.active = false;
    }
}

/// Follow/draw: hand part of the object ball's new momentum back to the cue
/// ball along the push direction, then clamp the pair to the energy it had
/// right after the impulse.
fn apply_follow(cue: &mut Ball, object: &mut Ball, push: Vec2, follow_transfer: f32) {
    let energy_cap = cue.kinetic_energy() + object.kinetic_energy();
    let s = (cue.spin.y * follow_transfer).clamp(-1.0, 1.0);
    let keep = (1.0 - s * s).max(0.0).sqrt();

    object.vel -= push * (1.0 - keep);
    cue.vel += push * s;
    cue.spin.y = 0.0;

    let energy = cue.kinetic_energy() + object.kinetic_energy();
    if energy > energy_cap && energy > 0.0 {
        let scale = (energy_cap / energy).sqrt();
        cue.vel *= scale;
        object.vel *= scale;
    }
}

/// Dry-run a shot from a copy of `balls`. Returns the settled balls and the outcome.
pub fn simulate(
    table: &Table,
    balls: &[Ball],
    config: &PhysicsConfig,
    shot: &ShotData,
) -> (Vec<Ball>, ShotOutcome) {
    let mut sim = Simulation::new(table.clone(), balls.to_vec(), config.clone());
    sim.strike(shot);
    let outcome = sim.run_to_settle();
    (sim.into_balls(), outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::Spin;
    use crate::core::ball::racked_balls;
    use crate::core::rng::Rng;
    use std::f32::consts::FRAC_PI_4;

    const R: f32 = 0.0112;

    fn table_with(balls: &[(u8, Vec2)]) -> (Table, Vec<Ball>) {
        let table = Table::standard();
        let balls = balls.iter().map(|&(n, pos)| Ball::new(n, pos, R)).collect();
        (table, balls)
    }

    fn rack() -> (Table, Vec<Ball>) {
        let table = Table::standard();
        let balls = racked_balls(table.head_spot(), table.foot_spot(), R);
        (table, balls)
    }

    #[test]
    fn straight_shot_pots_into_corner() {
        // Cue, object and the top-right corner pocket all lie on y = x - 0.5
        let (table, balls) = table_with(&[(0, Vec2::new(0.7, 0.2)), (3, Vec2::new(0.9, 0.4))]);
        let shot = ShotData::new(FRAC_PI_4, 0.4);
        let (after, outcome) = simulate(&table, &balls, &PhysicsConfig::default(), &shot);

        assert_eq!(outcome.first_contact, Some(3));
        assert_eq!(outcome.pocketed, vec![3]);
        assert!(!outcome.cue_pocketed());
        assert!(!outcome.degenerate);
        assert!(after[1].pocketed);
        assert!(after[0].on_table());
    }

    #[test]
    fn zero_power_settles_immediately() {
        let (table, balls) = rack();
        let (after, outcome) =
            simulate(&table, &balls, &PhysicsConfig::default(), &ShotData::new(0.0, 0.0));
        assert_eq!(outcome.ticks, 1);
        assert_eq!(outcome.first_contact, None);
        assert_eq!(after, balls);
    }

    #[test]
    fn energy_never_increases() {
        let (table, balls) = rack();
        let mut rng = Rng::new(11);
        for _ in 0..4 {
            let angle = rng.range(-0.05, 0.05);
            let spin = Spin::new(rng.range(-1.0, 1.0), rng.range(-1.0, 1.0));
            let mut sim = Simulation::new(table.clone(), balls.clone(), PhysicsConfig::default());
            sim.strike(&ShotData::new(angle, 1.0).with_spin(spin));
            let mut last = sim.kinetic_energy();
            while sim.step() == StepStatus::Moving {
                let now = sim.kinetic_energy();
                assert!(
                    now <= last * (1.0 + 1e-5) + 1e-9,
                    "energy rose from {} to {} at tick {}",
                    last,
                    now,
                    sim.outcome().ticks
                );
                last = now;
            }
        }
    }

    #[test]
    fn balls_stay_on_the_table() {
        let (table, balls) = rack();
        let mut rng = Rng::new(5);
        let eps = 1e-4;
        for _ in 0..4 {
            let angle = rng.range(0.0, std::f32::consts::TAU);
            let mut sim = Simulation::new(table.clone(), balls.clone(), PhysicsConfig::default());
            sim.strike(&ShotData::new(angle, 1.0));
            loop {
                for ball in sim.balls() {
                    let margin = if ball.pocketed { 0.0 } else { ball.radius };
                    assert!(
                        ball.pos.x >= margin - eps
                            && ball.pos.x <= table.width - margin + eps
                            && ball.pos.y >= margin - eps
                            && ball.pos.y <= table.height - margin + eps,
                        "ball {} escaped to {:?}",
                        ball.number,
                        ball.pos
                    );
                }
                if sim.step() == StepStatus::Settled {
                    break;
                }
            }
        }
    }

    #[test]
    fn replay_is_bit_identical() {
        let (table, balls) = rack();
        let shot = ShotData::new(0.01, 0.95).with_spin(Spin::new(0.3, -0.4));
        let config = PhysicsConfig::default();
        let (a, outcome_a) = simulate(&table, &balls, &config, &shot);
        let (b, outcome_b) = simulate(&table, &balls, &config, &shot);
        assert_eq!(outcome_a, outcome_b);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.pos.x.to_bits(), y.pos.x.to_bits());
            assert_eq!(x.pos.y.to_bits(), y.pos.y.to_bits());
            assert_eq!(x.pocketed, y.pocketed);
        }
    }

    #[test]
    fn tick_budget_force_settles() {
        let (table, balls) = rack();
        let config = PhysicsConfig {
            max_ticks: 10,
            ..PhysicsConfig::default()
        };
        let (after, outcome) = simulate(&table, &balls, &config, &ShotData::new(0.0, 1.0));
        assert!(outcome.degenerate);
        assert_eq!(outcome.ticks, 10);
        assert!(after.iter().all(|b| b.vel == Vec2::ZERO));
    }

    #[test]
    fn cushion_rebound_loses_speed() {
        let (table, balls) = table_with(&[(0, Vec2::new(0.5, 0.15))]);
        let mut sim = Simulation::new(table, balls, PhysicsConfig::default());
        sim.strike(&ShotData::new(-std::f32::consts::FRAC_PI_2, 0.3));
        let mut before_hit = 0.0;
        while sim.outcome().rail_contacts == 0 {
            before_hit = sim.balls()[0].speed();
            assert_eq!(sim.step(), StepStatus::Moving);
        }
        let cue = &sim.balls()[0];
        assert!(cue.vel.y > 0.0, "cue should bounce back, vel={:?}", cue.vel);
        assert!(cue.speed() < before_hit);
        assert!(!sim.outcome().rail_after_contact);
    }

    #[test]
    fn follow_runs_through_and_draw_comes_back() {
        let setup = [(0, Vec2::new(0.3, 0.25)), (5, Vec2::new(0.5, 0.25))];
        let config = PhysicsConfig::default();

        let (table, balls) = table_with(&setup);
        let follow = ShotData::new(0.0, 0.3).with_spin(Spin::new(0.0, 1.0));
        let (after_follow, _) = simulate(&table, &balls, &config, &follow);

        let draw = ShotData::new(0.0, 0.3).with_spin(Spin::new(0.0, -1.0));
        let (after_draw, _) = simulate(&table, &balls, &config, &draw);

        let contact_x = 0.5 - 2.0 * R;
        assert!(after_follow[0].pos.x > contact_x + 0.05, "follow cue at {:?}", after_follow[0].pos);
        assert!(after_draw[0].pos.x < contact_x - 0.05, "draw cue at {:?}", after_draw[0].pos);
    }

    #[test]
    fn english_bends_the_rebound() {
        let config = PhysicsConfig::default();
        let (table, balls) = table_with(&[(0, Vec2::new(0.5, 0.15))]);
        let plain = ShotData::new(-std::f32::consts::FRAC_PI_2, 0.3);
        let side = plain.with_spin(Spin::new(1.0, 0.0));
        let (a, _) = simulate(&table, &balls, &config, &plain);
        let (b, _) = simulate(&table, &balls, &config, &side);
        assert!((a[0].pos.x - 0.5).abs() < 1e-4);
        assert!((b[0].pos.x - 0.5).abs() > 0.01, "english had no effect: {:?}", b[0].pos);
    }
}
