//! Drag-to-shoot: press anywhere, pull back away from the target, release.
//! The cue ball travels from the pointer back through the cue ball; power
//! grows with the pull distance.

use glam::Vec2;

use crate::api::types::{ShotData, Spin};

/// Pull distance (table units) that gives full power.
pub const FULL_POWER_PULL: f32 = 0.4;
/// Releases shorter than this cancel the shot.
pub const MIN_PULL: f32 = 0.01;

#[derive(Debug, Clone, Default)]
pub struct AimController {
    aiming: bool,
    current: Vec2,
    placement: Option<Vec2>,
}

impl AimController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pointer_down(&mut self, at: Vec2) {
        self.aiming = true;
        self.current = at;
    }

    pub fn pointer_move(&mut self, at: Vec2) {
        if self.aiming {
            self.current = at;
        }
    }

    pub fn cancel(&mut self) {
        self.aiming = false;
    }

    /// Remember a ball-in-hand placement for the next shot.
    pub fn place(&mut self, at: Vec2) {
        self.placement = Some(at);
    }

    pub fn clear_placement(&mut self) {
        self.placement = None;
    }

    /// Shot direction and power for the current drag, if any.
    pub fn preview(&self, cue: Vec2) -> Option<(Vec2, f32)> {
        if !self.aiming {
            return None;
        }
        let origin = self.placement.unwrap_or(cue);
        let pull = origin.distance(self.current);
        if pull < MIN_PULL {
            return None;
        }
        let dir = (origin - self.current) / pull;
        Some((dir, (pull / FULL_POWER_PULL).min(1.0)))
    }

    /// Finish the drag. Returns the shot, or `None` if the pull was too short.
    pub fn pointer_up(&mut self, at: Vec2, cue: Vec2, spin: Spin) -> Option<ShotData> {
        if !self.aiming {
            return None;
        }
        self.current = at;
        let preview = self.preview(cue);
        self.aiming = false;
        let (dir, power) = preview?;
        let shot = ShotData::toward(dir, power).with_spin(spin);
        Some(match self.placement {
            Some(pos) => shot.with_cue_ball(pos),
            None => shot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_back_shoots_forward() {
        let cue = Vec2::new(0.25, 0.25);
        let mut aim = AimController::new();
        aim.pointer_down(Vec2::new(0.3, 0.3));
        aim.pointer_move(Vec2::new(0.05, 0.25));
        let shot = aim.pointer_up(Vec2::new(0.05, 0.25), cue, Spin::NONE).unwrap();
        assert!(shot.angle.abs() < 1e-6, "angle {}", shot.angle);
        assert!((shot.power - 0.5).abs() < 1e-5, "power {}", shot.power);
        assert!(aim.preview(cue).is_none(), "still aiming after release");
    }

    #[test]
    fn power_is_capped() {
        let cue = Vec2::new(0.5, 0.25);
        let mut aim = AimController::new();
        aim.pointer_down(Vec2::new(0.5, 0.0));
        let shot = aim.pointer_up(Vec2::new(0.5, -0.5), cue, Spin::new(0.2, 0.0)).unwrap();
        assert_eq!(shot.power, 1.0);
        assert_eq!(shot.spin, Spin::new(0.2, 0.0));
        let dir = shot.direction();
        assert!((dir.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn short_pull_cancels() {
        let cue = Vec2::new(0.5, 0.25);
        let mut aim = AimController::new();
        aim.pointer_down(cue);
        assert!(aim.pointer_up(cue + Vec2::new(0.005, 0.0), cue, Spin::NONE).is_none());
        assert!(aim.pointer_up(cue, cue, Spin::NONE).is_none());
    }

    #[test]
    fn placement_rides_along() {
        let mut aim = AimController::new();
        aim.place(Vec2::new(0.2, 0.2));
        aim.pointer_down(Vec2::new(0.1, 0.2));
        let shot = aim.pointer_up(Vec2::new(0.1, 0.2), Vec2::new(0.7, 0.1), Spin::NONE).unwrap();
        assert_eq!(shot.cue_ball, Some(Vec2::new(0.2, 0.2)));
        assert!(shot.angle.abs() < 1e-6);
    }
}
