//! Small vector helpers shared by the resolver and the planner.

use glam::Vec2;

use crate::core::ball::Ball;

/// Distance from `point` to the segment `p1`-`p2`.
/// Used for swept pocket capture and for line-of-sight checks.
pub fn segment_point_distance(p1: Vec2, p2: Vec2, point: Vec2) -> f32 {
    let line = p2 - p1;
    let len_sq = line.length_squared();
    if len_sq < 1e-12 {
        return p1.distance(point);
    }
    // Project point onto line, clamped to segment
    let t = ((point - p1).dot(line) / len_sq).clamp(0.0, 1.0);
    let projection = p1 + line * t;
    projection.distance(point)
}

/// Where the cue ball's centre must be at contact to send `object`
/// straight toward `target`.
pub fn ghost_ball(object: Vec2, target: Vec2, radius: f32) -> Vec2 {
    let dir = (target - object).normalize_or_zero();
    object - dir * (2.0 * radius)
}

/// Angle in radians between the cue's travel and the object ball's travel.
/// Zero for a straight-in shot.
pub fn cut_angle(cue: Vec2, ghost: Vec2, object: Vec2, target: Vec2) -> f32 {
    let travel = (ghost - cue).normalize_or_zero();
    let object_path = (target - object).normalize_or_zero();
    travel.dot(object_path).clamp(-1.0, 1.0).acos()
}

/// Rotate `v` by `angle` radians.
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

/// True when a ball of `radius` can travel from `from` to `to` without
/// touching any table ball other than those in `ignore`.
pub fn path_clear(from: Vec2, to: Vec2, radius: f32, balls: &[Ball], ignore: &[u8]) -> bool {
    balls
        .iter()
        .filter(|b| b.on_table() && !ignore.contains(&b.number))
        .all(|b| segment_point_distance(from, to, b.pos) >= radius + b.radius)
}
