use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::ball::{BallGroup, CUE, EIGHT};

/// One of the two seats at the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    P1,
    P2,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::P1 => Side::P2,
            Side::P2 => Side::P1,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Side::P1 => 0,
            Side::P2 => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::P1 => "P1",
            Side::P2 => "P2",
        }
    }
}

/// Practice plays against the built-in AI; match plays against a remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Practice,
    Match,
}

/// What a player is currently allowed to pocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    #[serde(rename = "ANY")]
    Any,
    #[serde(rename = "SOLIDS")]
    Solids,
    #[serde(rename = "STRIPES")]
    Stripes,
    #[serde(rename = "8")]
    Eight,
}

impl Target {
    /// Whether pocketing `number` counts toward this target.
    /// An open table accepts every object ball except the 8.
    pub fn accepts(self, number: u8) -> bool {
        match self {
            Target::Any => number != CUE && number != EIGHT,
            Target::Solids => BallGroup::of(number) == BallGroup::Solid,
            Target::Stripes => BallGroup::of(number) == BallGroup::Stripe,
            Target::Eight => number == EIGHT,
        }
    }

    /// The group the other player receives once this one is assigned.
    pub fn counterpart(self) -> Target {
        match self {
            Target::Solids => Target::Stripes,
            Target::Stripes => Target::Solids,
            other => other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Target::Any => "ANY",
            Target::Solids => "SOLIDS",
            Target::Stripes => "STRIPES",
            Target::Eight => "8",
        }
    }
}

/// A pair of values, one per side. Serializes as `{"p1": .., "p2": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerSide<T> {
    pub p1: T,
    pub p2: T,
}

impl<T> PerSide<T> {
    pub fn new(p1: T, p2: T) -> Self {
        Self { p1, p2 }
    }

    pub fn get(&self, side: Side) -> &T {
        match side {
            Side::P1 => &self.p1,
            Side::P2 => &self.p2,
        }
    }

    pub fn get_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::P1 => &mut self.p1,
            Side::P2 => &mut self.p2,
        }
    }
}

/// Cue tip offset on the ball face, each axis in [-1, 1].
/// `x` is side english, `y` is follow (positive) or draw (negative).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Spin {
    pub x: f32,
    pub y: f32,
}

impl Spin {
    pub const NONE: Spin = Spin { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(-1.0, 1.0),
            y: self.y.clamp(-1.0, 1.0),
        }
    }

    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// A single cue strike. Produced once per shot (pointer input, AI planner or
/// a remote peer) and replayed deterministically by the physics stepper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotData {
    /// Aim direction in radians, measured from +x toward +y.
    pub angle: f32,
    /// Fraction of the maximum shot speed, in [0, 1].
    pub power: f32,
    #[serde(default)]
    pub spin: Spin,
    /// Cue-ball position at contact. Differs from the resting position only
    /// when the shooter places the ball with ball in hand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cue_ball: Option<Vec2>,
}

impl ShotData {
    pub fn new(angle: f32, power: f32) -> Self {
        Self {
            angle,
            power,
            spin: Spin::NONE,
            cue_ball: None,
        }
    }

    /// Shot along `direction` (need not be normalized).
    pub fn toward(direction: Vec2, power: f32) -> Self {
        Self::new(direction.y.atan2(direction.x), power)
    }

    pub fn with_spin(mut self, spin: Spin) -> Self {
        self.spin = spin;
        self
    }

    pub fn with_cue_ball(mut self, pos: Vec2) -> Self {
        self.cue_ball = Some(pos);
        self
    }

    pub fn direction(&self) -> Vec2 {
        Vec2::from_angle(self.angle)
    }

    /// Finite values, power in [0, 1] and spin on the ball face.
    pub fn is_well_formed(&self) -> bool {
        let finite = self.angle.is_finite()
            && self.power.is_finite()
            && self.spin.x.is_finite()
            && self.spin.y.is_finite()
            && self.cue_ball.map_or(true, |p| p.is_finite());
        finite
            && (0.0..=1.0).contains(&self.power)
            && self.spin.x.abs() <= 1.0
            && self.spin.y.abs() <= 1.0
    }
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    /// The 8 was legally pocketed after the shooter's group was cleared.
    EightBallPotted,
    /// The 8 went down early or on a foul.
    IllegalEightBall,
    /// The match clock ran out between shots.
    TimeUp,
    /// A side conceded.
    Forfeit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_and_target_wire_names() {
        assert_eq!(serde_json::to_string(&Side::P2).unwrap(), "\"p2\"");
        assert_eq!(serde_json::to_string(&Target::Eight).unwrap(), "\"8\"");
        assert_eq!(serde_json::to_string(&Target::Solids).unwrap(), "\"SOLIDS\"");
        let t: Target = serde_json::from_str("\"STRIPES\"").unwrap();
        assert_eq!(t, Target::Stripes);
    }

    #[test]
    fn open_table_accepts_everything_but_the_eight() {
        assert!(Target::Any.accepts(3));
        assert!(Target::Any.accepts(12));
        assert!(!Target::Any.accepts(EIGHT));
        assert!(!Target::Any.accepts(CUE));
        assert!(Target::Solids.accepts(7));
        assert!(!Target::Solids.accepts(9));
        assert!(Target::Eight.accepts(8));
    }

    #[test]
    fn shot_validation() {
        assert!(ShotData::new(0.3, 0.5).is_well_formed());
        assert!(!ShotData::new(0.3, 1.5).is_well_formed());
        assert!(!ShotData::new(f32::NAN, 0.5).is_well_formed());
        assert!(!ShotData::new(0.0, 0.5)
            .with_spin(Spin::new(0.0, -1.2))
            .is_well_formed());
    }

    #[test]
    fn shot_json_uses_camel_case() {
        let shot = ShotData::new(1.0, 0.25).with_cue_ball(Vec2::new(0.2, 0.3));
        let json = serde_json::to_string(&shot).unwrap();
        assert!(json.contains("\"cueBall\""), "json was {}", json);
        let back: ShotData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, shot);
    }

    #[test]
    fn toward_points_along_direction() {
        let shot = ShotData::toward(Vec2::new(0.0, 2.0), 0.5);
        let dir = shot.direction();
        assert!(dir.x.abs() < 1e-6 && (dir.y - 1.0).abs() < 1e-6);
    }
}
