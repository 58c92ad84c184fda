//! Pool balls: identity, groups and the rack layout.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Ball number of the cue ball.
pub const CUE: u8 = 0;
/// Ball number of the 8-ball.
pub const EIGHT: u8 = 8;
/// Cue ball plus fifteen numbered balls.
pub const BALL_COUNT: usize = 16;

/// Ball group: solids (1-7), the 8, stripes (9-15).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BallGroup {
    Cue,
    Solid,
    Eight,
    Stripe,
}

impl BallGroup {
    pub fn of(number: u8) -> Self {
        match number {
            CUE => BallGroup::Cue,
            1..=7 => BallGroup::Solid,
            EIGHT => BallGroup::Eight,
            _ => BallGroup::Stripe,
        }
    }
}

/// A ball on (or in) the table. Owned by the simulation and mutated only
/// inside a physics tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    pub number: u8,
    pub group: BallGroup,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub pocketed: bool,
    /// Remaining english (x) and follow/draw (y) carried by the cue ball.
    pub spin: Vec2,
}

impl Ball {
    pub fn new(number: u8, pos: Vec2, radius: f32) -> Self {
        Self {
            number,
            group: BallGroup::of(number),
            pos,
            vel: Vec2::ZERO,
            radius,
            pocketed: false,
            spin: Vec2::ZERO,
        }
    }

    pub fn is_cue(&self) -> bool {
        self.number == CUE
    }

    pub fn on_table(&self) -> bool {
        !self.pocketed
    }

    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    /// Kinetic energy with unit mass (all balls weigh the same).
    pub fn kinetic_energy(&self) -> f32 {
        0.5 * self.vel.length_squared()
    }

    /// Stop the ball and drop it into a pocket.
    pub fn sink(&mut self, at: Vec2) {
        self.pocketed = true;
        self.pos = at;
        self.vel = Vec2::ZERO;
        self.spin = Vec2::ZERO;
    }

    /// Put the ball back on the table at rest.
    pub fn respot(&mut self, at: Vec2) {
        self.pocketed = false;
        self.pos = at;
        self.vel = Vec2::ZERO;
        self.spin = Vec2::ZERO;
    }
}

/// Standard 8-ball triangle rack layout.
/// Returns positions of balls 1..=15 (index = number - 1).
/// The apex points LEFT toward the cue ball, rows spread RIGHT.
///
/// Standard layout (viewed from above, cue ball on left):
/// ```text
///  1          <- apex (row 0)
///  9   2      <- row 1
///  3   8  10  <- row 2
/// 11  4  5  12 <- row 3
///  6 13 14  7 15 <- row 4
/// ```
pub fn rack_positions(apex: Vec2, ball_radius: f32) -> [Vec2; 15] {
    // Slight gap so racked balls never start overlapped
    let gap = ball_radius * 2.0 * 1.001;
    let row_offset = gap * (3.0f32).sqrt() / 2.0;

    let mut positions = [Vec2::ZERO; 15];

    // (ball_number, row, vertical_offset)
    let layout: [(u8, usize, f32); 15] = [
        (1, 0, 0.0),
        (9, 1, -0.5), (2, 1, 0.5),
        (3, 2, -1.0), (8, 2, 0.0), (10, 2, 1.0),
        (11, 3, -1.5), (4, 3, -0.5), (5, 3, 0.5), (12, 3, 1.5),
        (6, 4, -2.0), (13, 4, -1.0), (14, 4, 0.0), (7, 4, 1.0), (15, 4, 2.0),
    ];

    for (ball_num, row, v_offset) in layout {
        let x = apex.x + (row as f32) * row_offset;
        let y = apex.y + v_offset * gap;
        positions[(ball_num - 1) as usize] = Vec2::new(x, y);
    }

    positions
}

/// Full ball set ready to break: cue ball at `cue_spot`, rack apex at `apex`.
/// The returned vector is indexed by ball number.
pub fn racked_balls(cue_spot: Vec2, apex: Vec2, ball_radius: f32) -> Vec<Ball> {
    let mut balls = Vec::with_capacity(BALL_COUNT);
    balls.push(Ball::new(CUE, cue_spot, ball_radius));
    for (i, pos) in rack_positions(apex, ball_radius).iter().enumerate() {
        balls.push(Ball::new(i as u8 + 1, *pos, ball_radius));
    }
    balls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_follow_numbers() {
        assert_eq!(BallGroup::of(0), BallGroup::Cue);
        assert_eq!(BallGroup::of(1), BallGroup::Solid);
        assert_eq!(BallGroup::of(7), BallGroup::Solid);
        assert_eq!(BallGroup::of(8), BallGroup::Eight);
        assert_eq!(BallGroup::of(9), BallGroup::Stripe);
        assert_eq!(BallGroup::of(15), BallGroup::Stripe);
    }

    #[test]
    fn rack_has_no_overlaps() {
        let r = 0.0112;
        let positions = rack_positions(Vec2::new(0.75, 0.25), r);
        for i in 0..15 {
            for j in (i + 1)..15 {
                let d = positions[i].distance(positions[j]);
                assert!(d >= 2.0 * r, "balls {} and {} overlap: {}", i + 1, j + 1, d);
            }
        }
    }

    #[test]
    fn eight_sits_in_the_middle_of_row_three() {
        let apex = Vec2::new(0.75, 0.25);
        let positions = rack_positions(apex, 0.0112);
        let eight = positions[7];
        assert!((eight.y - apex.y).abs() < 1e-6);
        assert!(eight.x > apex.x);
    }

    #[test]
    fn racked_set_is_indexed_by_number() {
        let balls = racked_balls(Vec2::new(0.25, 0.25), Vec2::new(0.75, 0.25), 0.0112);
        assert_eq!(balls.len(), BALL_COUNT);
        for (i, ball) in balls.iter().enumerate() {
            assert_eq!(ball.number as usize, i);
            assert!(ball.on_table());
        }
        assert!(balls[0].is_cue());
    }

    #[test]
    fn sink_and_respot() {
        let mut ball = Ball::new(3, Vec2::new(0.5, 0.2), 0.0112);
        ball.vel = Vec2::new(1.0, 0.0);
        ball.sink(Vec2::ZERO);
        assert!(ball.pocketed);
        assert_eq!(ball.kinetic_energy(), 0.0);
        ball.respot(Vec2::new(0.3, 0.3));
        assert!(ball.on_table());
        assert_eq!(ball.pos, Vec2::new(0.3, 0.3));
    }
}
