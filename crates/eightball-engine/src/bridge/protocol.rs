/// Shared frame buffer layout.
/// Must stay in sync with the host's `protocol.ts`.
///
/// Layout (all values in f32 / 4 bytes):
/// ```text
/// [HudFrame: HUD_FLOATS floats]
/// [Balls: BALL_COUNT × BALL_FLOATS floats]
/// ```
///
/// The presentation layer reads this block every frame. It is a copy of
/// engine state, never a live reference.
use bytemuck::{Pod, Zeroable};

use crate::api::types::{Side, Target};
use crate::core::ball::{Ball, BALL_COUNT};
use crate::engine::hud::HudSnapshot;
use crate::rules::state::{Phase, ShotKind};

/// Protocol version written into every frame.
pub const PROTOCOL_VERSION: f32 = 1.0;

/// Floats per ball: x, y, pocketed (wire format, never changes).
pub const BALL_FLOATS: usize = 3;

/// HUD fields as floats. Enumerations are written as small integers,
/// "none" values as -1.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct HudFrame {
    pub protocol_version: f32,
    pub frame_counter: f32,
    pub phase: f32,
    pub turn: f32,
    pub local_side: f32,
    pub p1_target: f32,
    pub p2_target: f32,
    pub p1_score: f32,
    pub p2_score: f32,
    pub p1_remaining: f32,
    pub p2_remaining: f32,
    pub foul: f32,
    pub ball_in_hand: f32,
    pub current_run: f32,
    pub total_shots: f32,
    pub longest_run: f32,
    pub last_shot_power: f32,
    pub last_shot_type: f32,
    pub winner: f32,
    pub shot_in_flight: f32,
    pub ai_thinking: f32,
    pub time_remaining: f32,
    pub spin_x: f32,
    pub spin_y: f32,
}

impl HudFrame {
    pub const FLOATS: usize = std::mem::size_of::<HudFrame>() / 4;

    pub fn from_snapshot(hud: &HudSnapshot, frame_counter: u32) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            frame_counter: frame_counter as f32,
            phase: phase_code(hud.phase),
            turn: side_code(hud.turn),
            local_side: side_code(hud.local_side),
            p1_target: target_code(hud.players.p1.target),
            p2_target: target_code(hud.players.p2.target),
            p1_score: hud.players.p1.score as f32,
            p2_score: hud.players.p2.score as f32,
            p1_remaining: hud.players.p1.remaining as f32,
            p2_remaining: hud.players.p2.remaining as f32,
            foul: flag(hud.foul),
            ball_in_hand: flag(hud.ball_in_hand),
            current_run: hud.current_run as f32,
            total_shots: hud.stats.total_shots as f32,
            longest_run: hud.stats.longest_run as f32,
            last_shot_power: hud.last_shot_power,
            last_shot_type: kind_code(hud.last_shot_type),
            winner: hud.winner.map_or(-1.0, side_code),
            shot_in_flight: flag(hud.shot_in_flight),
            ai_thinking: flag(hud.ai_thinking),
            time_remaining: hud.time_remaining.unwrap_or(-1.0),
            spin_x: hud.spin.x,
            spin_y: hud.spin.y,
        }
    }
}

/// One ball in the frame buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct BallFrame {
    pub x: f32,
    pub y: f32,
    pub pocketed: f32,
}

impl From<&Ball> for BallFrame {
    fn from(ball: &Ball) -> Self {
        Self {
            x: ball.pos.x,
            y: ball.pos.y,
            pocketed: flag(ball.pocketed),
        }
    }
}

/// Offset (in floats) where ball data begins.
pub const BALL_DATA_OFFSET: usize = HudFrame::FLOATS;
/// Total frame size in floats.
pub const FRAME_FLOATS: usize = BALL_DATA_OFFSET + BALL_COUNT * BALL_FLOATS;

/// Write one frame into `out`, which is resized to `FRAME_FLOATS`.
pub fn write_frame(out: &mut Vec<f32>, hud: &HudFrame, balls: &[Ball]) {
    out.clear();
    out.extend_from_slice(bytemuck::cast_slice(std::slice::from_ref(hud)));
    let mut frames = [BallFrame::default(); BALL_COUNT];
    for (slot, ball) in frames.iter_mut().zip(balls) {
        *slot = BallFrame::from(ball);
    }
    out.extend_from_slice(bytemuck::cast_slice(&frames));
}

fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn side_code(side: Side) -> f32 {
    side.index() as f32
}

fn target_code(target: Target) -> f32 {
    match target {
        Target::Any => 0.0,
        Target::Solids => 1.0,
        Target::Stripes => 2.0,
        Target::Eight => 3.0,
    }
}

fn phase_code(phase: Phase) -> f32 {
    match phase {
        Phase::Break => 0.0,
        Phase::OpenTable => 1.0,
        Phase::GroupsAssigned => 2.0,
        Phase::EightBallPhase => 3.0,
        Phase::GameOver => 4.0,
    }
}

fn kind_code(kind: ShotKind) -> f32 {
    match kind {
        ShotKind::None => 0.0,
        ShotKind::Break => 1.0,
        ShotKind::Pot => 2.0,
        ShotKind::Miss => 3.0,
        ShotKind::Foul => 4.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ball::racked_balls;
    use glam::Vec2;

    #[test]
    fn hud_frame_is_all_floats() {
        assert_eq!(HudFrame::FLOATS * 4, std::mem::size_of::<HudFrame>());
        assert_eq!(HudFrame::FLOATS, 24);
        assert_eq!(FRAME_FLOATS, 24 + 16 * 3);
    }

    #[test]
    fn frame_layout_is_contiguous() {
        let mut balls = racked_balls(Vec2::new(0.25, 0.25), Vec2::new(0.75, 0.25), 0.0112);
        balls[5].pocketed = true;
        let hud = HudFrame {
            protocol_version: PROTOCOL_VERSION,
            turn: 1.0,
            winner: -1.0,
            ..HudFrame::default()
        };
        let mut out = Vec::new();
        write_frame(&mut out, &hud, &balls);

        assert_eq!(out.len(), FRAME_FLOATS);
        assert_eq!(out[0], PROTOCOL_VERSION);
        assert_eq!(out[3], 1.0);
        let ball5 = BALL_DATA_OFFSET + 5 * BALL_FLOATS;
        assert_eq!(out[ball5], balls[5].pos.x);
        assert_eq!(out[ball5 + 1], balls[5].pos.y);
        assert_eq!(out[ball5 + 2], 1.0);
        assert_eq!(out[BALL_DATA_OFFSET + 2], 0.0);
    }
}
