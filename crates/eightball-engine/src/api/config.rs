use serde::{Deserialize, Serialize};

use crate::ai::difficulty::DifficultyTier;
use crate::api::types::{Mode, Side};
use crate::error::ConfigError;

/// Physics constants for the table simulation.
///
/// Units: the playing field is 1.0 long (x) by 0.5 wide (y), measured
/// cushion nose to cushion nose. Velocities are in table-lengths per second
/// and accelerations in table-lengths per second squared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhysicsConfig {
    /// Fixed tick length in seconds (default: 1/240, four ticks per 60 Hz frame).
    pub fixed_dt: f32,
    /// Safety cutoff: a shot still moving after this many ticks is force-settled.
    pub max_ticks: u32,
    /// Speeds below this are zeroed; the shot settles once every ball is at rest.
    pub settle_speed: f32,
    /// Ball radius (57 mm on a 2.54 m table).
    pub ball_radius: f32,
    /// Capture radius around corner pocket centres.
    pub corner_pocket_radius: f32,
    /// Capture radius around side pocket centres.
    pub side_pocket_radius: f32,
    /// Ball-ball coefficient of restitution.
    pub ball_restitution: f32,
    /// Ball-cushion coefficient of restitution.
    pub rail_restitution: f32,
    /// Constant rolling deceleration from the cloth.
    pub rolling_friction: f32,
    /// Velocity-proportional damping per second.
    pub linear_damping: f32,
    /// Cue-ball speed at power 1.0.
    pub max_shot_speed: f32,
    /// Share of the object ball's speed handed back to the cue ball at full follow/draw.
    pub follow_transfer: f32,
    /// Rebound deflection off a cushion at full side english, in radians.
    pub english_angle: f32,
    /// Fraction of follow/draw lost per second of travel before the first contact.
    pub spin_decay: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 240.0,
            max_ticks: 240 * 40,
            settle_speed: 0.002,
            ball_radius: 0.0112,
            corner_pocket_radius: 0.045,
            side_pocket_radius: 0.038,
            ball_restitution: 0.95,
            rail_restitution: 0.8,
            rolling_friction: 0.18,
            linear_damping: 0.5,
            max_shot_speed: 3.2,
            follow_transfer: 0.5,
            english_angle: 0.35,
            spin_decay: 0.4,
        }
    }
}

/// House rules that differ between common 8-ball variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleConfig {
    /// Assign groups when a clean break pockets balls of a single group.
    /// When false the table always stays open after the break.
    pub assign_groups_on_break: bool,
    /// Pocketing the 8 on the break loses the rack.
    pub eight_on_break_loses: bool,
    /// On an open table, hitting the 8 first is a foul.
    pub eight_first_on_open_table_is_foul: bool,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            assign_groups_on_break: true,
            eight_on_break_loses: true,
            eight_first_on_open_table_is_foul: true,
        }
    }
}

fn default_tier() -> DifficultyTier {
    DifficultyTier::Practice
}

fn default_player(side: Side) -> String {
    side.label().to_lowercase()
}

fn default_p1() -> String {
    default_player(Side::P1)
}

fn default_p2() -> String {
    default_player(Side::P2)
}

/// Default seed for the AI's execution noise.
pub const DEFAULT_SEED: u64 = 0x8BA1_1F00D;

fn default_seed() -> u64 {
    DEFAULT_SEED
}

/// Match metadata supplied by the host once, at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchConfig {
    pub mode: Mode,
    pub difficulty_level: u32,
    #[serde(default = "default_tier")]
    pub difficulty_tier: DifficultyTier,
    pub local_side: Side,
    #[serde(default = "default_p1")]
    pub player1_id: String,
    #[serde(default = "default_p2")]
    pub player2_id: String,
    /// Match clock. `None` plays until the 8 decides it.
    #[serde(default)]
    pub duration_seconds: Option<f32>,
    /// Seed for the AI's execution noise.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub rules: RuleConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
}

impl MatchConfig {
    pub fn new(mode: Mode, difficulty_level: u32, local_side: Side) -> Self {
        Self {
            mode,
            difficulty_level,
            difficulty_tier: default_tier(),
            local_side,
            player1_id: default_p1(),
            player2_id: default_p2(),
            duration_seconds: None,
            seed: default_seed(),
            rules: RuleConfig::default(),
            physics: PhysicsConfig::default(),
        }
    }

    pub fn practice(difficulty_level: u32) -> Self {
        Self::new(Mode::Practice, difficulty_level, Side::P1)
    }

    pub fn with_tier(mut self, tier: DifficultyTier) -> Self {
        self.difficulty_tier = tier;
        self
    }

    pub fn with_players(mut self, player1: impl Into<String>, player2: impl Into<String>) -> Self {
        self.player1_id = player1.into();
        self.player2_id = player2.into();
        self
    }

    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_rules(mut self, rules: RuleConfig) -> Self {
        self.rules = rules;
        self
    }

    /// Parse a config from the host's JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))
    }

    pub fn player_id(&self, side: Side) -> &str {
        match side {
            Side::P1 => &self.player1_id,
            Side::P2 => &self.player2_id,
        }
    }

    /// The side the built-in AI plays, if any.
    pub fn ai_side(&self) -> Option<Side> {
        match self.mode {
            Mode::Practice => Some(self.local_side.opponent()),
            Mode::Match => None,
        }
    }
}
