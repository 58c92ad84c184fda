//! The authoritative, serializable match snapshot.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::api::types::{EndReason, PerSide, Side, Target};
use crate::core::ball::{racked_balls, Ball, BallGroup, BALL_COUNT, EIGHT};
use crate::core::table::Table;
use crate::error::WireError;

/// Balls per group.
pub const GROUP_SIZE: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Break,
    OpenTable,
    GroupsAssigned,
    EightBallPhase,
    GameOver,
}

/// Classification of the last shot, for HUD feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShotKind {
    #[default]
    None,
    Break,
    Pot,
    Miss,
    Foul,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub target: Target,
    pub pocketed: u32,
    pub remaining: u32,
    pub consecutive_wins: u32,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            target: Target::Any,
            pocketed: 0,
            remaining: GROUP_SIZE,
            consecutive_wins: 0,
        }
    }
}

/// Aggregates that survive a rematch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStats {
    pub total_shots: u32,
    pub longest_run: u32,
    pub fouls: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallSnapshot {
    pub number: u8,
    pub pos: Vec2,
    pub pocketed: bool,
}

impl From<&Ball> for BallSnapshot {
    fn from(ball: &Ball) -> Self {
        Self {
            number: ball.number,
            pos: ball.pos,
            pocketed: ball.pocketed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub phase: Phase,
    pub turn: Side,
    /// Who broke this rack.
    pub breaker: Side,
    pub players: PerSide<PlayerState>,
    pub shot_count: u32,
    pub foul: bool,
    pub ball_in_hand: bool,
    pub winner: Option<Side>,
    pub end_reason: Option<EndReason>,
    pub current_run: u32,
    pub stats: MatchStats,
    pub last_shot_result: String,
    pub last_shot_power: f32,
    pub last_shot_type: ShotKind,
    /// Settled ball layout, indexed by ball number.
    pub balls: Vec<BallSnapshot>,
}

impl GameState {
    /// A fresh rack with `breaker` to shoot.
    pub fn new_rack(breaker: Side, table: &Table, ball_radius: f32) -> Self {
        let balls = racked_balls(table.head_spot(), table.foot_spot(), ball_radius);
        Self {
            phase: Phase::Break,
            turn: breaker,
            breaker,
            players: PerSide::default(),
            shot_count: 0,
            foul: false,
            ball_in_hand: false,
            winner: None,
            end_reason: None,
            current_run: 0,
            stats: MatchStats::default(),
            last_shot_result: String::new(),
            last_shot_power: 0.0,
            last_shot_type: ShotKind::None,
            balls: balls.iter().map(BallSnapshot::from).collect(),
        }
    }

    pub fn player(&self, side: Side) -> &PlayerState {
        self.players.get(side)
    }

    pub fn player_mut(&mut self, side: Side) -> &mut PlayerState {
        self.players.get_mut(side)
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn is_break(&self) -> bool {
        self.shot_count == 0
    }

    pub fn score(&self, side: Side) -> u32 {
        self.player(side).pocketed
    }

    pub fn ball(&self, number: u8) -> Option<&BallSnapshot> {
        self.balls.iter().find(|b| b.number == number)
    }

    /// Whether `number` is still on the table.
    pub fn on_table(&self, number: u8) -> bool {
        self.ball(number).is_some_and(|b| !b.pocketed)
    }

    /// Rebuild simulation balls, at rest, from the snapshot.
    pub fn restore_balls(&self, ball_radius: f32) -> Vec<Ball> {
        self.balls
            .iter()
            .map(|s| {
                let mut ball = Ball::new(s.number, s.pos, ball_radius);
                ball.pocketed = s.pocketed;
                ball
            })
            .collect()
    }

    pub fn capture_balls(&mut self, balls: &[Ball]) {
        self.balls = balls.iter().map(BallSnapshot::from).collect();
    }

    fn group_on_table(&self, group: BallGroup) -> u32 {
        self.balls
            .iter()
            .filter(|b| !b.pocketed && BallGroup::of(b.number) == group)
            .count() as u32
    }

    /// Move players whose group is cleared onto the 8, then recompute the
    /// per-player pocketed and remaining counts from the ball layout.
    pub fn refresh_counts(&mut self) {
        let solids = self.group_on_table(BallGroup::Solid);
        let stripes = self.group_on_table(BallGroup::Stripe);
        let eight_down = !self.on_table(EIGHT);
        let winner = self.winner;

        for side in [Side::P1, Side::P2] {
            let player = self.players.get_mut(side);
            let on_table = match player.target {
                Target::Solids => Some(solids),
                Target::Stripes => Some(stripes),
                _ => None,
            };
            if on_table == Some(0) {
                player.target = Target::Eight;
            }
            let (remaining, pocketed) = match player.target {
                Target::Any => (GROUP_SIZE, 0),
                Target::Solids => (solids, GROUP_SIZE - solids),
                Target::Stripes => (stripes, GROUP_SIZE - stripes),
                Target::Eight => {
                    let bonus = (eight_down && winner == Some(side)) as u32;
                    ((!eight_down) as u32, GROUP_SIZE + bonus)
                }
            };
            player.remaining = remaining;
            player.pocketed = pocketed;
        }
    }

    /// The phase implied by the rest of the snapshot.
    pub fn derive_phase(&self) -> Phase {
        if self.end_reason.is_some() {
            return Phase::GameOver;
        }
        if self.shot_count == 0 {
            return Phase::Break;
        }
        let targets = [self.players.p1.target, self.players.p2.target];
        if targets.contains(&Target::Any) {
            Phase::OpenTable
        } else if targets.contains(&Target::Eight) {
            Phase::EightBallPhase
        } else {
            Phase::GroupsAssigned
        }
    }

    /// Check a snapshot received from outside before trusting it.
    pub fn validate(&self) -> Result<(), WireError> {
        if self.balls.len() != BALL_COUNT {
            return Err(WireError::invalid(format!(
                "expected {} balls, found {}",
                BALL_COUNT,
                self.balls.len()
            )));
        }
        for (n, ball) in self.balls.iter().enumerate() {
            if ball.number as usize != n {
                return Err(WireError::invalid(format!(
                    "ball {} found in slot {}",
                    ball.number, n
                )));
            }
            if !ball.pos.is_finite() {
                return Err(WireError::invalid(format!("ball {} has a non-finite position", n)));
            }
        }

        let (a, b) = (self.players.p1.target, self.players.p2.target);
        let targets_ok = match (a, b) {
            (Target::Any, Target::Any) => true,
            (Target::Any, _) | (_, Target::Any) => false,
            (Target::Solids, Target::Solids) | (Target::Stripes, Target::Stripes) => false,
            _ => true,
        };
        if !targets_ok {
            return Err(WireError::invalid(format!(
                "inconsistent targets {} / {}",
                a.label(),
                b.label()
            )));
        }

        if self.winner.is_some() && self.end_reason.is_none() {
            return Err(WireError::invalid("winner set without an end reason"));
        }
        if self.phase != self.derive_phase() {
            return Err(WireError::invalid(format!(
                "phase {:?} does not match the snapshot",
                self.phase
            )));
        }
        if !self.last_shot_power.is_finite() {
            return Err(WireError::invalid("non-finite shot power"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: f32 = 0.0112;

    fn fresh() -> GameState {
        GameState::new_rack(Side::P1, &Table::standard(), R)
    }

    fn pocket(state: &mut GameState, numbers: &[u8]) {
        for ball in state.balls.iter_mut() {
            if numbers.contains(&ball.number) {
                ball.pocketed = true;
            }
        }
    }

    #[test]
    fn fresh_rack_is_valid() {
        let state = fresh();
        assert_eq!(state.phase, Phase::Break);
        assert_eq!(state.balls.len(), BALL_COUNT);
        assert!(state.validate().is_ok());
        assert_eq!(state.player(Side::P2).remaining, GROUP_SIZE);
    }

    #[test]
    fn serde_round_trip_is_idempotent() {
        let mut state = fresh();
        state.shot_count = 4;
        state.players.p1.target = Target::Solids;
        state.players.p2.target = Target::Stripes;
        state.balls[3].pos = Vec2::new(0.123_456_7, 0.333_333_3);
        pocket(&mut state, &[1, 2, 9]);
        state.refresh_counts();
        state.phase = state.derive_phase();
        state.last_shot_result = "P1 pots 2".into();
        state.last_shot_power = 0.61;

        let first = serde_json::to_string(&state).unwrap();
        let back: GameState = serde_json::from_str(&first).unwrap();
        let second = serde_json::to_string(&back).unwrap();
        assert_eq!(first, second);
        assert_eq!(back, state);
    }

    #[test]
    fn wire_names() {
        let json = serde_json::to_string(&fresh()).unwrap();
        assert!(json.contains("\"phase\":\"BREAK\""), "json was {}", json);
        assert!(json.contains("\"ballInHand\":false"));
        assert!(json.contains("\"winner\":null"));
        assert!(json.contains("\"target\":\"ANY\""));
    }

    #[test]
    fn counts_follow_targets() {
        let mut state = fresh();
        state.shot_count = 3;
        state.players.p1.target = Target::Solids;
        state.players.p2.target = Target::Stripes;
        pocket(&mut state, &[1, 2, 3, 9]);
        state.refresh_counts();
        assert_eq!(state.player(Side::P1).remaining, 4);
        assert_eq!(state.player(Side::P1).pocketed, 3);
        assert_eq!(state.player(Side::P2).remaining, 6);
        assert_eq!(state.score(Side::P2), 1);
    }

    #[test]
    fn cleared_group_moves_to_the_eight() {
        let mut state = fresh();
        state.shot_count = 9;
        state.players.p1.target = Target::Solids;
        state.players.p2.target = Target::Stripes;
        pocket(&mut state, &[1, 2, 3, 4, 5, 6, 7]);
        state.refresh_counts();
        assert_eq!(state.player(Side::P1).target, Target::Eight);
        assert_eq!(state.player(Side::P1).remaining, 1);
        assert_eq!(state.player(Side::P1).pocketed, GROUP_SIZE);
        assert_eq!(state.derive_phase(), Phase::EightBallPhase);
    }

    #[test]
    fn validate_rejects_bad_snapshots() {
        let mut state = fresh();
        state.players.p1.target = Target::Solids;
        assert!(state.validate().is_err());

        let mut state = fresh();
        state.balls[4].number = 3;
        assert!(state.validate().is_err());

        let mut state = fresh();
        state.balls[2].pos.x = f32::NAN;
        assert!(state.validate().is_err());

        let mut state = fresh();
        state.balls.pop();
        assert!(state.validate().is_err());

        let mut state = fresh();
        state.phase = Phase::GameOver;
        assert!(state.validate().is_err());
    }

    #[test]
    fn restore_round_trips_positions() {
        let mut state = fresh();
        pocket(&mut state, &[12]);
        let balls = state.restore_balls(R);
        assert!(balls[12].pocketed);
        let mut copy = state.clone();
        copy.capture_balls(&balls);
        assert_eq!(copy.balls, state.balls);
    }
}
