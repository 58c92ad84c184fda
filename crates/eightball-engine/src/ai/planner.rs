//! Shot planner: dry-simulates candidate shots and picks the best one.
//!
//! Candidates are a deterministic function of the table. A planner that
//! searches `n` trials evaluates exactly the first `n` candidates of the same
//! list, so a stronger planner never does worse than a weaker one by its own
//! score. Execution noise is drawn from the planner's own rng after the
//! choice is made.

use std::cmp::Ordering;
use std::f32::consts::TAU;

use glam::Vec2;

use crate::ai::difficulty::DifficultyProfile;
use crate::api::config::{PhysicsConfig, RuleConfig};
use crate::api::types::{ShotData, Spin, Target};
use crate::core::ball::{Ball, CUE, EIGHT};
use crate::core::geometry::{cut_angle, ghost_ball, path_clear};
use crate::core::physics::simulate;
use crate::core::rng::{fnv1a, Rng};
use crate::core::table::Table;
use crate::rules::referee::{resolve_shot, Foul};
use crate::rules::state::GameState;

const WIN_SCORE: f32 = 10_000.0;
const POT_SCORE: f32 = 1_000.0;
const FOUL_SCORE: f32 = -500.0;
const FOUL_SEVERITY_SCORE: f32 = -50.0;
const LEAVE_SCORE: f32 = 20.0;
const MAX_LEAVE_LINES: u32 = 5;
/// Spin error at zero skill, per axis.
const SPIN_NOISE: f32 = 0.3;

/// Lines cut thinner than this are not attempted.
const MAX_CUT: f32 = 1.4;
/// Lines counted as "open" when scoring the leave.
const LEAVE_CUT: f32 = 1.2;
/// Distances behind the ghost ball tried when placing the cue ball in hand.
const PLACEMENT_DISTANCES: [f32; 3] = [0.12, 0.06, 0.03];
/// Candidates evaluated for a break; they differ only by tiny aim offsets.
const BREAK_CANDIDATES: usize = 8;

/// A potting line: strike `object` so it runs into `pocket`.
#[derive(Debug, Clone, Copy)]
struct Line {
    cue: Vec2,
    placed: bool,
    angle: f32,
    power: f32,
    prior: f32,
}

impl Line {
    fn shot(&self, power: f32, spin: Spin) -> ShotData {
        let shot = ShotData::new(self.angle, power.clamp(0.05, 1.0)).with_spin(spin);
        if self.placed {
            shot.with_cue_ball(self.cue)
        } else {
            shot
        }
    }
}

/// A dry-simulated candidate and the planner's opinion of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub shot: ShotData,
    pub score: f32,
    pub foul: Option<Foul>,
    pub pots: u32,
    pub wins: bool,
    pub loses: bool,
}

#[derive(Debug, Clone)]
pub struct ShotPlanner {
    profile: DifficultyProfile,
    physics: PhysicsConfig,
    rules: RuleConfig,
    table: Table,
    rng: Rng,
}

impl ShotPlanner {
    pub fn new(profile: DifficultyProfile, physics: PhysicsConfig, rules: RuleConfig, seed: u64) -> Self {
        let table = Table::new(&physics);
        Self {
            profile,
            physics,
            rules,
            table,
            rng: Rng::new(seed),
        }
    }

    pub fn profile(&self) -> &DifficultyProfile {
        &self.profile
    }

    pub fn set_profile(&mut self, profile: DifficultyProfile) {
        self.profile = profile;
    }

    /// Choose a shot for the side to move and perturb it by the profile's
    /// execution noise.
    pub fn plan(&mut self, state: &GameState) -> ShotData {
        let best = self.choose(state);
        let shot = self.perturb(best.shot);
        log::debug!(
            "planner (level {} {:?}): score={:.1} pots={} foul={:?} angle={:.4}->{:.4} power={:.3}->{:.3}",
            self.profile.level,
            self.profile.tier,
            best.score,
            best.pots,
            best.foul,
            best.shot.angle,
            shot.angle,
            best.shot.power,
            shot.power
        );
        shot
    }

    /// Best candidate by score, ties going to the earlier candidate.
    /// Never fails: with nothing legal on offer the least-bad foul wins.
    pub fn choose(&self, state: &GameState) -> Evaluation {
        let balls = state.restore_balls(self.physics.ball_radius);
        let mut best: Option<Evaluation> = None;
        for shot in self.candidates(state) {
            let eval = self.evaluate(state, &balls, shot);
            let better = match &best {
                Some(current) => eval.score.total_cmp(&current.score) == Ordering::Greater,
                None => true,
            };
            if better {
                best = Some(eval);
            }
        }
        best.unwrap_or_else(|| self.evaluate(state, &balls, ShotData::new(0.0, 0.5)))
    }

    /// Apply aim, power and spin noise to a chosen shot.
    pub fn perturb(&mut self, shot: ShotData) -> ShotData {
        let angle = shot.angle + self.rng.gaussian() * self.profile.aim_noise;
        let power = shot.power * (1.0 + self.rng.gaussian() * self.profile.power_noise);
        let spin_error = SPIN_NOISE * (1.0 - self.profile.skill_multiplier).max(0.0);
        let spin = Spin::new(
            shot.spin.x + self.rng.gaussian() * spin_error,
            shot.spin.y + self.rng.gaussian() * spin_error,
        );
        ShotData {
            angle,
            power: power.clamp(0.05, 1.0),
            spin: spin.clamped(),
            ..shot
        }
    }

    /// Dry-run `shot` from the snapshot and score the result. The score
    /// depends only on the outcome, never on the profile.
    pub fn evaluate(&self, state: &GameState, balls: &[Ball], shot: ShotData) -> Evaluation {
        let shooter = state.turn;
        let (after, outcome) = simulate(&self.table, balls, &self.physics, &shot);
        let mut next = state.clone();
        let ruling = resolve_shot(&mut next, after, &outcome, &self.rules, &self.table, shot.power);

        let wins = ruling.end.is_some_and(|e| e.winner == shooter);
        let loses = ruling.end.is_some_and(|e| e.winner != shooter);
        let score = if wins {
            WIN_SCORE
        } else if loses {
            -WIN_SCORE
        } else if let Some(foul) = ruling.foul {
            FOUL_SCORE + FOUL_SEVERITY_SCORE * foul.severity() as f32
        } else {
            let lines = open_lines(&next, &self.table, self.physics.ball_radius).min(MAX_LEAVE_LINES);
            let leave = LEAVE_SCORE * lines as f32;
            let sign = if next.turn == shooter { 1.0 } else { -1.0 };
            POT_SCORE * ruling.legal_pots as f32 + sign * leave
        };

        Evaluation {
            shot,
            score,
            foul: ruling.foul,
            pots: ruling.legal_pots,
            wins,
            loses,
        }
    }

    /// The first `trial_shots` candidates for the side to move.
    pub fn candidates(&self, state: &GameState) -> Vec<ShotData> {
        let count = self.profile.trial_shots.max(1) as usize;
        let balls = state.restore_balls(self.physics.ball_radius);
        let mut rng = Rng::new(table_seed(state));

        if state.is_break() {
            return break_candidates(&balls, &mut rng, count.min(BREAK_CANDIDATES));
        }

        let lines = potting_lines(state, &self.table, &balls);
        let mut out = Vec::with_capacity(count);
        if lines.is_empty() {
            fill_safeties(state, &balls, &mut out, count);
            return out;
        }

        let variants: [fn(&Line) -> ShotData; 4] = [
            |l| l.shot(l.power, Spin::NONE),
            |l| l.shot(l.power * 1.25, Spin::NONE),
            |l| l.shot(l.power * 0.85, Spin::new(0.0, -0.5)),
            |l| l.shot(l.power, Spin::new(0.0, 0.4)),
        ];
        'variants: for variant in variants {
            for line in &lines {
                if out.len() >= count {
                    break 'variants;
                }
                out.push(variant(line));
            }
        }

        let mut k = 0;
        while out.len() < count {
            let line = &lines[k % lines.len()];
            // Speed and spin jitter only; the aim stays on the line
            let spin = Spin::new(rng.range(-0.3, 0.3), rng.range(-0.5, 0.5));
            out.push(line.shot(line.power * rng.range(0.8, 1.2), spin));
            k += 1;
        }
        out
    }
}

/// Seed for candidate jitter, derived from the table so every planner
/// sees the same candidate list for the same position.
fn table_seed(state: &GameState) -> u64 {
    let words = state
        .balls
        .iter()
        .flat_map(|b| [b.pos.x.to_bits(), b.pos.y.to_bits(), b.pocketed as u32])
        .chain([state.turn.index() as u32, state.shot_count]);
    fnv1a(words)
}

fn break_candidates(balls: &[Ball], rng: &mut Rng, count: usize) -> Vec<ShotData> {
    let Some(cue) = balls.iter().find(|b| b.is_cue()) else {
        return vec![ShotData::new(0.0, 1.0)];
    };
    let apex = balls
        .iter()
        .filter(|b| !b.is_cue() && b.on_table())
        .min_by(|a, b| a.pos.distance(cue.pos).total_cmp(&b.pos.distance(cue.pos)))
        .map_or(cue.pos + Vec2::X, |b| b.pos);
    let base = ShotData::toward(apex - cue.pos, 1.0);
    (0..count)
        .map(|i| {
            let mut shot = base;
            if i > 0 {
                shot.angle += rng.range(-0.01, 0.01);
            }
            shot
        })
        .collect()
}

/// Object balls the side to move may aim at.
fn legal_objects(state: &GameState, balls: &[Ball]) -> Vec<u8> {
    let target = state.player(state.turn).target;
    let legal: Vec<u8> = balls
        .iter()
        .filter(|b| b.on_table() && target.accepts(b.number))
        .map(|b| b.number)
        .collect();
    if !legal.is_empty() {
        return legal;
    }
    balls
        .iter()
        .filter(|b| b.on_table() && b.number != CUE && (b.number != EIGHT || target == Target::Eight))
        .map(|b| b.number)
        .collect()
}

/// Every clear (ball, pocket) line, best prior first.
fn potting_lines(state: &GameState, table: &Table, balls: &[Ball]) -> Vec<Line> {
    let Some(cue) = balls.iter().find(|b| b.is_cue()) else {
        return Vec::new();
    };
    let r = cue.radius;
    let mut lines = Vec::new();

    for number in legal_objects(state, balls) {
        let object = balls[number as usize].pos;
        for pocket in &table.pockets {
            if !path_clear(object, pocket.center, r, balls, &[number, CUE]) {
                continue;
            }
            let ghost = ghost_ball(object, pocket.center, r);
            let Some((cue_pos, placed)) = cue_position(state, table, balls, cue.pos, ghost, object) else {
                continue;
            };
            if !path_clear(cue_pos, ghost, r, balls, &[number, CUE]) {
                continue;
            }
            let cut = cut_angle(cue_pos, ghost, object, pocket.center);
            if cut > MAX_CUT {
                continue;
            }
            let travel = cue_pos.distance(ghost) + object.distance(pocket.center) / cut.cos().max(0.3);
            let aim = ghost - cue_pos;
            lines.push(Line {
                cue: cue_pos,
                placed,
                angle: aim.y.atan2(aim.x),
                power: (0.2 + 0.5 * travel).clamp(0.15, 1.0),
                prior: cut.cos() / (1.0 + travel),
            });
        }
    }

    // Stable sort keeps ball and pocket order among equal priors
    lines.sort_by(|a, b| b.prior.total_cmp(&a.prior));
    lines
}

/// Where the cue ball shoots from: its resting spot, or with ball in hand a
/// free spot straight behind the ghost ball.
fn cue_position(
    state: &GameState,
    table: &Table,
    balls: &[Ball],
    resting: Vec2,
    ghost: Vec2,
    object: Vec2,
) -> Option<(Vec2, bool)> {
    if !state.ball_in_hand {
        return Some((resting, false));
    }
    let back = (ghost - object).normalize_or_zero();
    if back == Vec2::ZERO {
        return None;
    }
    PLACEMENT_DISTANCES
        .iter()
        .map(|d| ghost + back * *d)
        .find(|p| table.is_free_spot(*p, balls[CUE as usize].radius, balls, CUE))
        .map(|p| (p, true))
}

/// Direct hits at every legal ball, then evenly spread angles. Used when
/// no potting line is open.
fn fill_safeties(state: &GameState, balls: &[Ball], out: &mut Vec<ShotData>, count: usize) {
    let Some(cue) = balls.iter().find(|b| b.is_cue()) else {
        out.push(ShotData::new(0.0, 0.5));
        return;
    };
    for number in legal_objects(state, balls) {
        if out.len() >= count {
            return;
        }
        out.push(ShotData::toward(balls[number as usize].pos - cue.pos, 0.4));
    }
    let mut i = 0;
    while out.len() < count {
        out.push(ShotData::new(i as f32 * TAU / 16.0, 0.5));
        i += 1;
    }
}

/// Clear potting lines for the side to move in `state`, as seen from the
/// cue ball (or from anywhere, with ball in hand).
fn open_lines(state: &GameState, table: &Table, ball_radius: f32) -> u32 {
    if state.is_over() {
        return 0;
    }
    let balls = state.restore_balls(ball_radius);
    let Some(cue) = balls.iter().find(|b| b.is_cue() && b.on_table()) else {
        return 0;
    };
    let mut lines = 0;
    for number in legal_objects(state, &balls) {
        let object = balls[number as usize].pos;
        for pocket in &table.pockets {
            if !path_clear(object, pocket.center, ball_radius, &balls, &[number, CUE]) {
                continue;
            }
            if state.ball_in_hand {
                lines += 1;
                continue;
            }
            let ghost = ghost_ball(object, pocket.center, ball_radius);
            if path_clear(cue.pos, ghost, ball_radius, &balls, &[number, CUE])
                && cut_angle(cue.pos, ghost, object, pocket.center) <= LEAVE_CUT
            {
                lines += 1;
            }
        }
    }
    lines
}
