use serde::Serialize;

use crate::api::types::{PerSide, Side, Spin, Target};
use crate::rules::state::{GameState, MatchStats, Phase, ShotKind};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HudPlayer {
    pub target: Target,
    pub score: u32,
    pub remaining: u32,
    pub consecutive_wins: u32,
}

/// What the presentation layer shows. Built fresh from engine state on
/// every change; never sent over the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HudSnapshot {
    pub phase: Phase,
    pub turn: Side,
    pub local_side: Side,
    pub players: PerSide<HudPlayer>,
    pub message: String,
    pub foul: bool,
    pub ball_in_hand: bool,
    pub current_run: u32,
    pub stats: MatchStats,
    pub last_shot_result: String,
    pub last_shot_power: f32,
    pub last_shot_type: ShotKind,
    pub winner: Option<Side>,
    pub shot_in_flight: bool,
    pub ai_thinking: bool,
    /// Seconds left on the match clock, if there is one.
    pub time_remaining: Option<f32>,
    /// Spin the local player has dialled in for their next shot.
    pub spin: Spin,
    pub desyncs: u32,
}

/// Engine-side state the HUD shows next to the game snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct HudExtras {
    pub shot_in_flight: bool,
    pub ai_thinking: bool,
    pub time_remaining: Option<f32>,
    pub spin: Spin,
    pub desyncs: u32,
}

impl HudSnapshot {
    pub fn build(state: &GameState, local_side: Side, message: &str, extras: HudExtras) -> Self {
        let player = |side: Side| {
            let p = state.player(side);
            HudPlayer {
                target: p.target,
                score: state.score(side),
                remaining: p.remaining,
                consecutive_wins: p.consecutive_wins,
            }
        };
        Self {
            phase: state.phase,
            turn: state.turn,
            local_side,
            players: PerSide::new(player(Side::P1), player(Side::P2)),
            message: message.to_string(),
            foul: state.foul,
            ball_in_hand: state.ball_in_hand,
            current_run: state.current_run,
            stats: state.stats,
            last_shot_result: state.last_shot_result.clone(),
            last_shot_power: state.last_shot_power,
            last_shot_type: state.last_shot_type,
            winner: state.winner,
            shot_in_flight: extras.shot_in_flight,
            ai_thinking: extras.ai_thinking,
            time_remaining: extras.time_remaining,
            spin: extras.spin,
            desyncs: extras.desyncs,
        }
    }
}
