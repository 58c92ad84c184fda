//! 8-ball referee: turns a settled shot into a ruling and applies it.

use std::fmt;

use glam::Vec2;

use crate::api::config::RuleConfig;
use crate::api::types::{EndReason, ShotData, Side, Target};
use crate::core::ball::{Ball, BallGroup, CUE, EIGHT};
use crate::core::physics::ShotOutcome;
use crate::core::table::Table;
use crate::error::ShotRejection;
use crate::rules::state::{GameState, ShotKind};

/// How close a declared cue position must be to the resting one to count
/// as "not moved".
const PLACEMENT_TOLERANCE: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Foul {
    /// The cue ball went down.
    Scratch,
    /// The cue ball touched nothing.
    NoContact,
    /// The first ball touched was not one the shooter may play.
    WrongBallFirst { hit: u8 },
    /// Nothing was pocketed and no ball reached a cushion after contact.
    NoRail,
    /// The 8 went down before the shooter's group was cleared.
    EarlyEight,
    /// The shot never settled and was stopped by the tick budget.
    Degenerate,
}

impl Foul {
    /// Used by the planner to rank unavoidable fouls.
    pub fn severity(self) -> u32 {
        match self {
            Foul::EarlyEight => 10,
            Foul::Scratch => 4,
            Foul::NoContact => 3,
            Foul::WrongBallFirst { .. } => 2,
            Foul::NoRail | Foul::Degenerate => 1,
        }
    }
}

impl fmt::Display for Foul {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Foul::Scratch => write!(f, "scratch"),
            Foul::NoContact => write!(f, "no ball hit"),
            Foul::WrongBallFirst { hit } => write!(f, "wrong ball first ({})", hit),
            Foul::NoRail => write!(f, "no rail after contact"),
            Foul::EarlyEight => write!(f, "8-ball pocketed early"),
            Foul::Degenerate => write!(f, "shot did not settle"),
        }
    }
}

/// Terminal result of a shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameEnd {
    pub winner: Side,
    pub reason: EndReason,
}

/// The referee's verdict on one settled shot.
#[derive(Debug, Clone, PartialEq)]
pub struct Ruling {
    pub shooter: Side,
    pub foul: Option<Foul>,
    /// Group given to the shooter by this shot.
    pub assigned: Option<Target>,
    /// Balls the shooter legally pocketed toward their target.
    pub legal_pots: u32,
    pub keeps_turn: bool,
    /// The 8 came off the table on a break and must be spotted again.
    pub respot_eight: bool,
    pub end: Option<GameEnd>,
    pub kind: ShotKind,
    pub message: String,
}

impl Ruling {
    pub fn next_turn(&self) -> Side {
        if self.keeps_turn {
            self.shooter
        } else {
            self.shooter.opponent()
        }
    }
}

fn first_contact_legal(target: Target, hit: u8, rules: &RuleConfig) -> bool {
    match target {
        Target::Any => hit != EIGHT || !rules.eight_first_on_open_table_is_foul,
        other => other.accepts(hit),
    }
}

/// The single group pocketed, if every object ball in `pots` belongs to it.
fn single_group(pots: &[u8]) -> Option<Target> {
    let first = BallGroup::of(*pots.first()?);
    if !pots.iter().all(|&n| BallGroup::of(n) == first) {
        return None;
    }
    match first {
        BallGroup::Solid => Some(Target::Solids),
        BallGroup::Stripe => Some(Target::Stripes),
        _ => None,
    }
}

/// Judge a settled shot against the snapshot taken before it. Pure.
pub fn adjudicate(state: &GameState, outcome: &ShotOutcome, rules: &RuleConfig) -> Ruling {
    let shooter = state.turn;
    let target = state.player(shooter).target;
    let is_break = state.is_break();
    let shooter_name = shooter.label();

    let mut foul = if outcome.degenerate {
        Some(Foul::Degenerate)
    } else if outcome.cue_pocketed() {
        Some(Foul::Scratch)
    } else {
        match outcome.first_contact {
            None => Some(Foul::NoContact),
            Some(hit) if !first_contact_legal(target, hit, rules) => {
                Some(Foul::WrongBallFirst { hit })
            }
            Some(_) if outcome.pocketed.is_empty() && !outcome.rail_after_contact => {
                Some(Foul::NoRail)
            }
            Some(_) => None,
        }
    };

    let eight_down = outcome.potted(EIGHT);
    let respot_eight = eight_down && is_break && !rules.eight_on_break_loses;

    let mut end = None;
    if eight_down && !respot_eight {
        if target == Target::Eight && foul.is_none() {
            end = Some(GameEnd {
                winner: shooter,
                reason: EndReason::EightBallPotted,
            });
        } else {
            foul.get_or_insert(Foul::EarlyEight);
            end = Some(GameEnd {
                winner: shooter.opponent(),
                reason: EndReason::IllegalEightBall,
            });
        }
    }

    let pots: Vec<u8> = outcome.object_balls().filter(|&n| n != EIGHT).collect();
    let mut assigned = None;
    if foul.is_none() && target == Target::Any && (!is_break || rules.assign_groups_on_break) {
        assigned = single_group(&pots);
    }
    let effective = assigned.unwrap_or(target);
    let legal_pots = if foul.is_some() {
        0
    } else {
        pots.iter().filter(|&&n| effective.accepts(n)).count() as u32
    };
    let keeps_turn = end.is_none() && foul.is_none() && legal_pots > 0;

    let kind = if foul.is_some() {
        ShotKind::Foul
    } else if is_break {
        ShotKind::Break
    } else if keeps_turn || end.is_some() {
        ShotKind::Pot
    } else {
        ShotKind::Miss
    };

    let message = match (end, foul) {
        (Some(GameEnd { winner, reason: EndReason::EightBallPotted }), _) => {
            format!("{} pots the 8 and wins", winner.label())
        }
        (Some(GameEnd { winner, .. }), Some(f)) => {
            format!("Foul: {}. {} loses, {} wins", f, shooter_name, winner.label())
        }
        (Some(GameEnd { winner, .. }), None) => format!("{} wins", winner.label()),
        (None, Some(f)) => format!(
            "Foul: {}. {} has ball in hand",
            f,
            shooter.opponent().label()
        ),
        (None, None) => match (assigned, keeps_turn) {
            (Some(group), _) => format!("{} takes {}", shooter_name, group.label()),
            (None, true) => format!("{} pots {} and shoots again", shooter_name, legal_pots),
            (None, false) if respot_eight => {
                format!("8 spotted. {} to shoot", shooter.opponent().label())
            }
            (None, false) => format!("{} to shoot", shooter.opponent().label()),
        },
    };

    Ruling {
        shooter,
        foul,
        assigned,
        legal_pots,
        keeps_turn,
        respot_eight,
        end,
        kind,
        message,
    }
}

/// Apply a ruling to the snapshot. `balls` is the settled layout after any
/// respotting.
pub fn apply_ruling(state: &mut GameState, ruling: &Ruling, balls: &[Ball], power: f32) {
    let shooter = ruling.shooter;
    state.capture_balls(balls);
    state.shot_count += 1;
    state.stats.total_shots += 1;
    state.last_shot_power = power;
    state.last_shot_type = ruling.kind;
    state.last_shot_result = ruling.message.clone();

    if let Some(group) = ruling.assigned {
        state.player_mut(shooter).target = group;
        state.player_mut(shooter.opponent()).target = group.counterpart();
    }

    state.foul = ruling.foul.is_some();
    state.ball_in_hand = ruling.foul.is_some() && ruling.end.is_none();
    if state.foul {
        state.stats.fouls += 1;
    }

    if ruling.keeps_turn {
        state.current_run += ruling.legal_pots;
        state.stats.longest_run = state.stats.longest_run.max(state.current_run);
    } else {
        state.current_run = 0;
        state.turn = shooter.opponent();
    }

    if let Some(end) = ruling.end {
        finish(state, Some(end.winner), end.reason);
    }
    state.refresh_counts();
    state.phase = state.derive_phase();
}

/// End the match. `None` is a draw.
pub fn finish(state: &mut GameState, winner: Option<Side>, reason: EndReason) {
    state.winner = winner;
    state.end_reason = Some(reason);
    state.ball_in_hand = false;
    if let Some(winner) = winner {
        state.player_mut(winner).consecutive_wins += 1;
        state.player_mut(winner.opponent()).consecutive_wins = 0;
    }
    state.refresh_counts();
    state.phase = state.derive_phase();
}

/// Full settle pipeline: judge the shot, respot the cue ball (after a
/// scratch) and the 8 (after a break, if allowed), then update the snapshot.
pub fn resolve_shot(
    state: &mut GameState,
    mut balls: Vec<Ball>,
    outcome: &ShotOutcome,
    rules: &RuleConfig,
    table: &Table,
    power: f32,
) -> Ruling {
    let ruling = adjudicate(state, outcome, rules);

    if ruling.respot_eight {
        respot(&mut balls, EIGHT, table.foot_spot(), table);
    }
    if outcome.cue_pocketed() {
        respot(&mut balls, CUE, table.head_spot(), table);
    }

    log::debug!(
        "shot {} by {}: foul={:?} pots={:?} keeps_turn={}",
        state.shot_count + 1,
        ruling.shooter.label(),
        ruling.foul,
        outcome.pocketed,
        ruling.keeps_turn
    );
    apply_ruling(state, &ruling, &balls, power);
    if let Some(end) = ruling.end {
        log::info!("rack over: {} wins ({:?})", end.winner.label(), end.reason);
    }
    ruling
}

fn respot(balls: &mut [Ball], number: u8, preferred: Vec2, table: &Table) {
    let Some(index) = balls.iter().position(|b| b.number == number) else {
        return;
    };
    let radius = balls[index].radius;
    let spot = table.nearest_free_spot(preferred, radius, balls, number);
    balls[index].respot(spot);
}

/// Validate the cue-ball position declared by a shot. Moving the cue ball
/// needs ball in hand and a free spot on the cloth.
pub fn check_cue_placement(
    state: &GameState,
    shot: &ShotData,
    table: &Table,
    balls: &[Ball],
) -> Result<(), ShotRejection> {
    let Some(pos) = shot.cue_ball else {
        return Ok(());
    };
    let Some(cue) = balls.iter().find(|b| b.is_cue()) else {
        return Err(ShotRejection::InvalidPlacement);
    };
    if cue.on_table() && cue.pos.distance(pos) <= PLACEMENT_TOLERANCE {
        return Ok(());
    }
    if !state.ball_in_hand {
        return Err(ShotRejection::BallInHandViolated);
    }
    if !table.is_free_spot(pos, cue.radius, balls, CUE) {
        return Err(ShotRejection::InvalidPlacement);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::state::Phase;

    const R: f32 = 0.0112;

    fn setup() -> (Table, GameState) {
        let table = Table::standard();
        let state = GameState::new_rack(Side::P1, &table, R);
        (table, state)
    }

    /// A state after the break with groups assigned (P1 solids).
    fn assigned(down: &[u8]) -> (Table, GameState) {
        let (table, mut state) = setup();
        state.shot_count = 5;
        state.players.p1.target = Target::Solids;
        state.players.p2.target = Target::Stripes;
        for ball in state.balls.iter_mut() {
            if down.contains(&ball.number) {
                ball.pocketed = true;
            }
        }
        state.refresh_counts();
        state.phase = state.derive_phase();
        (table, state)
    }

    fn outcome(first: Option<u8>, pocketed: &[u8], rail: bool) -> ShotOutcome {
        ShotOutcome {
            first_contact: first,
            pocketed: pocketed.to_vec(),
            rail_contacts: rail as u32,
            rail_after_contact: rail,
            ticks: 100,
            degenerate: false,
        }
    }

    fn settle(state: &mut GameState, table: &Table, out: &ShotOutcome) -> Ruling {
        let mut balls = state.restore_balls(R);
        for n in &out.pocketed {
            balls[*n as usize].sink(Vec2::ZERO);
        }
        resolve_shot(state, balls, out, &RuleConfig::default(), table, 0.8)
    }

    #[test]
    fn break_pocketing_only_solids_assigns_groups() {
        let (table, mut state) = setup();
        let ruling = settle(&mut state, &table, &outcome(Some(1), &[2, 5], true));
        assert_eq!(ruling.foul, None);
        assert_eq!(state.player(Side::P1).target, Target::Solids);
        assert_eq!(state.player(Side::P2).target, Target::Stripes);
        assert_eq!(state.turn, Side::P1);
        assert_eq!(state.phase, Phase::GroupsAssigned);
        assert_eq!(state.last_shot_type, ShotKind::Break);
        assert_eq!(state.player(Side::P1).pocketed, 2);
    }

    #[test]
    fn break_stays_open_when_configured() {
        let (table, mut state) = setup();
        let rules = RuleConfig {
            assign_groups_on_break: false,
            ..RuleConfig::default()
        };
        let out = outcome(Some(1), &[2, 5], true);
        let mut balls = state.restore_balls(R);
        balls[2].sink(Vec2::ZERO);
        balls[5].sink(Vec2::ZERO);
        resolve_shot(&mut state, balls, &out, &rules, &table, 1.0);
        assert_eq!(state.player(Side::P1).target, Target::Any);
        assert_eq!(state.turn, Side::P1);
        assert_eq!(state.phase, Phase::OpenTable);
    }

    #[test]
    fn scratch_gives_ball_in_hand_and_keeps_groups() {
        let (table, mut state) = assigned(&[1, 9]);
        let ruling = settle(&mut state, &table, &outcome(Some(2), &[0, 3], true));
        assert_eq!(ruling.foul, Some(Foul::Scratch));
        assert!(state.foul);
        assert!(state.ball_in_hand);
        assert_eq!(state.turn, Side::P2);
        assert_eq!(state.player(Side::P1).target, Target::Solids);
        assert_eq!(state.player(Side::P2).target, Target::Stripes);
        assert_eq!(state.current_run, 0);
        // Cue ball is back on the cloth
        let cue = state.ball(CUE).unwrap();
        assert!(!cue.pocketed);
        assert!(table.contains(cue.pos, R));
    }

    #[test]
    fn early_eight_loses() {
        let (table, mut state) = assigned(&[1, 2, 3, 4, 5]);
        assert_eq!(state.player(Side::P1).remaining, 2);
        let ruling = settle(&mut state, &table, &outcome(Some(6), &[8], true));
        assert_eq!(ruling.foul, Some(Foul::EarlyEight));
        assert_eq!(state.winner, Some(Side::P2));
        assert_eq!(state.end_reason, Some(EndReason::IllegalEightBall));
        assert_eq!(state.phase, Phase::GameOver);
        assert_eq!(state.player(Side::P2).consecutive_wins, 1);
    }

    #[test]
    fn legal_eight_wins() {
        let (table, mut state) = assigned(&[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(state.player(Side::P1).target, Target::Eight);
        let ruling = settle(&mut state, &table, &outcome(Some(8), &[8], true));
        assert_eq!(ruling.foul, None);
        assert_eq!(state.winner, Some(Side::P1));
        assert_eq!(state.end_reason, Some(EndReason::EightBallPotted));
        assert_eq!(state.score(Side::P1), 8);
        assert!(!state.ball_in_hand);
    }

    #[test]
    fn scratch_on_the_eight_loses() {
        let (table, mut state) = assigned(&[1, 2, 3, 4, 5, 6, 7]);
        let ruling = settle(&mut state, &table, &outcome(Some(8), &[8, 0], true));
        assert_eq!(ruling.foul, Some(Foul::Scratch));
        assert_eq!(state.winner, Some(Side::P2));
        assert_eq!(state.end_reason, Some(EndReason::IllegalEightBall));
    }

    #[test]
    fn eight_on_the_break_loses_by_default() {
        let (table, mut state) = setup();
        settle(&mut state, &table, &outcome(Some(1), &[8], true));
        assert_eq!(state.winner, Some(Side::P2));
    }

    #[test]
    fn eight_on_the_break_can_be_spotted() {
        let (table, mut state) = setup();
        let rules = RuleConfig {
            eight_on_break_loses: false,
            ..RuleConfig::default()
        };
        let out = outcome(Some(1), &[8], true);
        let mut balls = state.restore_balls(R);
        balls[8].sink(Vec2::ZERO);
        let ruling = resolve_shot(&mut state, balls, &out, &rules, &table, 1.0);
        assert!(ruling.respot_eight);
        assert_eq!(state.winner, None);
        assert!(state.on_table(EIGHT));
        assert_eq!(state.turn, Side::P2);
    }

    #[test]
    fn wrong_ball_first_is_a_foul() {
        let (table, mut state) = assigned(&[]);
        let ruling = settle(&mut state, &table, &outcome(Some(12), &[3], true));
        assert_eq!(ruling.foul, Some(Foul::WrongBallFirst { hit: 12 }));
        assert_eq!(ruling.legal_pots, 0);
        assert_eq!(state.turn, Side::P2);
        assert!(state.ball_in_hand);
    }

    #[test]
    fn eight_first_on_open_table() {
        let (table, mut state) = setup();
        state.shot_count = 1;
        state.phase = state.derive_phase();
        let ruling = settle(&mut state, &table, &outcome(Some(8), &[], true));
        assert_eq!(ruling.foul, Some(Foul::WrongBallFirst { hit: 8 }));
    }

    #[test]
    fn no_rail_and_no_contact() {
        let (table, mut state) = assigned(&[]);
        let ruling = adjudicate(&state, &outcome(Some(2), &[], false), &RuleConfig::default());
        assert_eq!(ruling.foul, Some(Foul::NoRail));
        let ruling = adjudicate(&state, &outcome(None, &[], true), &RuleConfig::default());
        assert_eq!(ruling.foul, Some(Foul::NoContact));
        // A clean miss passes the turn without a foul
        let ruling = settle(&mut state, &table, &outcome(Some(2), &[], true));
        assert_eq!(ruling.foul, None);
        assert_eq!(ruling.kind, ShotKind::Miss);
        assert_eq!(state.turn, Side::P2);
        assert!(!state.ball_in_hand);
    }

    #[test]
    fn degenerate_shot_is_a_foul_without_assignment() {
        let (table, mut state) = setup();
        state.shot_count = 2;
        state.phase = state.derive_phase();
        let mut out = outcome(Some(3), &[3], true);
        out.degenerate = true;
        let ruling = settle(&mut state, &table, &out);
        assert_eq!(ruling.foul, Some(Foul::Degenerate));
        assert_eq!(ruling.assigned, None);
        assert_eq!(state.player(Side::P1).target, Target::Any);
        assert_eq!(state.turn, Side::P2);
    }

    #[test]
    fn mixed_pots_keep_the_table_open_and_the_turn() {
        let (table, mut state) = setup();
        state.shot_count = 1;
        let ruling = settle(&mut state, &table, &outcome(Some(4), &[4, 11], true));
        assert_eq!(ruling.assigned, None);
        assert!(ruling.keeps_turn);
        assert_eq!(state.turn, Side::P1);
        assert_eq!(state.current_run, 2);
        assert_eq!(state.stats.longest_run, 2);
    }

    #[test]
    fn potting_an_opponent_ball_only_passes_the_turn() {
        let (table, mut state) = assigned(&[]);
        let ruling = settle(&mut state, &table, &outcome(Some(3), &[10], true));
        assert_eq!(ruling.foul, None);
        assert!(!ruling.keeps_turn);
        assert_eq!(state.turn, Side::P2);
        assert_eq!(state.score(Side::P2), 1);
    }

    #[test]
    fn placement_needs_ball_in_hand() {
        let (table, mut state) = assigned(&[]);
        let balls = state.restore_balls(R);
        let resting = balls[0].pos;
        let moved = ShotData::new(0.0, 0.5).with_cue_ball(Vec2::new(0.2, 0.1));

        assert_eq!(check_cue_placement(&state, &ShotData::new(0.0, 0.5), &table, &balls), Ok(()));
        assert_eq!(
            check_cue_placement(&state, &ShotData::new(0.0, 0.5).with_cue_ball(resting), &table, &balls),
            Ok(())
        );
        assert_eq!(
            check_cue_placement(&state, &moved, &table, &balls),
            Err(ShotRejection::BallInHandViolated)
        );

        state.ball_in_hand = true;
        assert_eq!(check_cue_placement(&state, &moved, &table, &balls), Ok(()));
        let on_ball = ShotData::new(0.0, 0.5).with_cue_ball(balls[1].pos);
        assert_eq!(
            check_cue_placement(&state, &on_ball, &table, &balls),
            Err(ShotRejection::InvalidPlacement)
        );
        let in_pocket = ShotData::new(0.0, 0.5).with_cue_ball(Vec2::new(0.015, 0.015));
        assert_eq!(
            check_cue_placement(&state, &in_pocket, &table, &balls),
            Err(ShotRejection::InvalidPlacement)
        );
    }
}
