//! Table geometry: playing field, cushions and pockets.

use glam::Vec2;

use crate::api::config::PhysicsConfig;
use crate::core::ball::Ball;

/// Playing-field length (x), in table units.
pub const TABLE_LENGTH: f32 = 1.0;
/// Playing-field width (y), in table units.
pub const TABLE_WIDTH: f32 = 0.5;

/// A pocket: balls whose centre passes within `radius` of `center` drop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pocket {
    pub center: Vec2,
    pub radius: f32,
}

/// A straight cushion. `normal` points into the playing field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rail {
    pub start: Vec2,
    pub end: Vec2,
    pub normal: Vec2,
}

impl Rail {
    fn new(start: Vec2, end: Vec2, normal: Vec2) -> Self {
        Self { start, end, normal }
    }

    /// Signed distance of `point` from the cushion line, positive on the
    /// field side, or `None` if `point` is beyond the cushion's ends.
    pub fn distance(&self, point: Vec2) -> Option<f32> {
        let along = self.end - self.start;
        let t = (point - self.start).dot(along) / along.length_squared();
        if !(0.0..=1.0).contains(&t) {
            return None;
        }
        Some((point - self.start).dot(self.normal))
    }
}

/// The table. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub width: f32,
    pub height: f32,
    pub rails: [Rail; 4],
    pub pockets: [Pocket; 6],
    /// Constant rolling deceleration from the cloth.
    pub rolling_friction: f32,
    /// Velocity-proportional damping per second.
    pub linear_damping: f32,
    pub rail_restitution: f32,
}

impl Table {
    pub fn new(config: &PhysicsConfig) -> Self {
        let (w, h) = (TABLE_LENGTH, TABLE_WIDTH);
        let corner = config.corner_pocket_radius;
        let side = config.side_pocket_radius;
        Self {
            width: w,
            height: h,
            rails: [
                Rail::new(Vec2::new(0.0, 0.0), Vec2::new(w, 0.0), Vec2::Y),
                Rail::new(Vec2::new(0.0, h), Vec2::new(w, h), Vec2::NEG_Y),
                Rail::new(Vec2::new(0.0, 0.0), Vec2::new(0.0, h), Vec2::X),
                Rail::new(Vec2::new(w, 0.0), Vec2::new(w, h), Vec2::NEG_X),
            ],
            pockets: [
                // Corner pockets
                Pocket { center: Vec2::new(0.0, 0.0), radius: corner },
                Pocket { center: Vec2::new(w, 0.0), radius: corner },
                Pocket { center: Vec2::new(0.0, h), radius: corner },
                Pocket { center: Vec2::new(w, h), radius: corner },
                // Side pockets (middle of the long cushions)
                Pocket { center: Vec2::new(w / 2.0, 0.0), radius: side },
                Pocket { center: Vec2::new(w / 2.0, h), radius: side },
            ],
            rolling_friction: config.rolling_friction,
            linear_damping: config.linear_damping,
            rail_restitution: config.rail_restitution,
        }
    }

    pub fn standard() -> Self {
        Self::new(&PhysicsConfig::default())
    }

    /// Cue-ball starting spot, a quarter of the way up the table.
    pub fn head_spot(&self) -> Vec2 {
        Vec2::new(self.width * 0.25, self.height * 0.5)
    }

    /// Rack apex, three quarters of the way up the table.
    pub fn foot_spot(&self) -> Vec2 {
        Vec2::new(self.width * 0.75, self.height * 0.5)
    }

    /// Whether a ball of `radius` centred at `pos` lies fully on the cloth.
    pub fn contains(&self, pos: Vec2, radius: f32) -> bool {
        pos.x >= radius
            && pos.x <= self.width - radius
            && pos.y >= radius
            && pos.y <= self.height - radius
    }

    /// Index of the pocket whose capture radius contains `pos`.
    pub fn pocket_at(&self, pos: Vec2) -> Option<usize> {
        self.pockets
            .iter()
            .position(|p| p.center.distance(pos) < p.radius)
    }

    /// Whether `pos` is a legal resting spot for a ball: on the cloth,
    /// clear of every pocket and not touching any other table ball.
    pub fn is_free_spot(&self, pos: Vec2, radius: f32, balls: &[Ball], ignore: u8) -> bool {
        self.contains(pos, radius)
            && self.pocket_at(pos).is_none()
            && balls
                .iter()
                .filter(|b| b.on_table() && b.number != ignore)
                .all(|b| b.pos.distance(pos) >= radius + b.radius)
    }

    /// The free spot nearest to `preferred`, searched along the long axis
    /// toward the head cushion first. Falls back to `preferred`.
    pub fn nearest_free_spot(&self, preferred: Vec2, radius: f32, balls: &[Ball], ignore: u8) -> Vec2 {
        let step = radius * 2.05;
        let max_steps = (self.width / step) as i32;
        for i in 0..=max_steps {
            for sign in [-1.0, 1.0] {
                let candidate = preferred + Vec2::new(sign * i as f32 * step, 0.0);
                if self.is_free_spot(candidate, radius, balls, ignore) {
                    return candidate;
                }
            }
        }
        preferred
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rails_face_inward() {
        let table = Table::standard();
        let centre = Vec2::new(0.5, 0.25);
        for rail in &table.rails {
            let d = rail.distance(centre).unwrap();
            assert!(d > 0.0, "rail {:?} faces away from centre", rail);
        }
    }

    #[test]
    fn rail_distance_outside_extent() {
        let table = Table::standard();
        assert!(table.rails[0].distance(Vec2::new(1.5, 0.1)).is_none());
    }

    #[test]
    fn corner_is_a_pocket() {
        let table = Table::standard();
        let r = 0.0112;
        assert_eq!(table.pocket_at(Vec2::new(r, r)), Some(0));
        assert_eq!(table.pocket_at(Vec2::new(0.5, r)), Some(4));
        assert_eq!(table.pocket_at(Vec2::new(0.5, 0.25)), None);
    }

    #[test]
    fn free_spot_checks_balls_and_pockets() {
        let table = Table::standard();
        let r = 0.0112;
        let balls = vec![Ball::new(3, Vec2::new(0.3, 0.25), r)];
        assert!(!table.is_free_spot(Vec2::new(0.31, 0.25), r, &balls, 0));
        assert!(table.is_free_spot(Vec2::new(0.31, 0.25), r, &balls, 3));
        assert!(!table.is_free_spot(Vec2::new(0.01, 0.01), r, &balls, 0));
        assert!(!table.is_free_spot(Vec2::new(-0.1, 0.25), r, &balls, 0));
        assert!(table.is_free_spot(table.head_spot(), r, &balls, 0));
    }

    #[test]
    fn nearest_free_spot_steps_around_blockers() {
        let table = Table::standard();
        let r = 0.0112;
        let balls = vec![Ball::new(3, table.head_spot(), r)];
        let spot = table.nearest_free_spot(table.head_spot(), r, &balls, 0);
        assert!(table.is_free_spot(spot, r, &balls, 0));
        assert!(spot.distance(table.head_spot()) <= 2.1 * r);
    }
}
