//! Difficulty curves for the AI opponent.
//!
//! Every value is a pure function of `(level, tier)`. Levels outside a
//! tier's range are clamped by the curve functions; only
//! [`DifficultyProfile::for_level`] rejects them.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest aim perturbation (radians, one standard deviation) at zero accuracy.
pub const MAX_AIM_NOISE: f32 = 0.08;
/// Largest relative power perturbation (one standard deviation) at zero accuracy.
pub const MAX_POWER_NOISE: f32 = 0.35;

/// The three difficulty scales the host can pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DifficultyTier {
    /// Levels 1-5, linear.
    Classic,
    /// Levels 1-100, linear.
    Practice,
    /// Levels 1-110, convex: the top levels are close to perfect.
    AiBrain,
}

impl DifficultyTier {
    pub fn levels(self) -> (u32, u32) {
        match self {
            DifficultyTier::Classic => (1, 5),
            DifficultyTier::Practice => (1, 100),
            DifficultyTier::AiBrain => (1, 110),
        }
    }

    pub fn contains(self, level: u32) -> bool {
        let (min, max) = self.levels();
        (min..=max).contains(&level)
    }
}

/// Position of `level` along its tier's curve, in [0, 1].
pub fn progress(level: u32, tier: DifficultyTier) -> f32 {
    let (min, max) = tier.levels();
    let linear = (level.clamp(min, max) - min) as f32 / (max - min) as f32;
    match tier {
        DifficultyTier::Classic | DifficultyTier::Practice => linear,
        DifficultyTier::AiBrain => linear * linear,
    }
}

/// Fraction of execution noise removed, in [0.5, 1).
pub fn accuracy_for(level: u32, tier: DifficultyTier) -> f32 {
    let t = progress(level, tier);
    match tier {
        DifficultyTier::Classic => 0.55 + 0.40 * t,
        DifficultyTier::Practice => 0.50 + 0.48 * t,
        DifficultyTier::AiBrain => 0.50 + 0.499 * t,
    }
}

/// Number of candidate shots dry-simulated before choosing.
pub fn trial_shots_for(level: u32, tier: DifficultyTier) -> u32 {
    let t = progress(level, tier);
    match tier {
        DifficultyTier::Classic => 4 + (16.0 * t).round() as u32,
        DifficultyTier::Practice => 4 + (76.0 * t).round() as u32,
        DifficultyTier::AiBrain => 8 + (392.0 * t).round() as u32,
    }
}

/// Artificial delay before the AI commits its shot.
pub fn think_time_ms_for(level: u32, tier: DifficultyTier) -> u32 {
    let t = progress(level, tier);
    let ms = match tier {
        DifficultyTier::Classic => 1800.0 - 1200.0 * t,
        DifficultyTier::Practice => 2000.0 - 1600.0 * t,
        DifficultyTier::AiBrain => 2200.0 - 1900.0 * t,
    };
    ms.round() as u32
}

/// How cleanly the AI delivers the spin it chose. 1.0 is exact.
pub fn skill_multiplier_for(level: u32, tier: DifficultyTier) -> f32 {
    let t = progress(level, tier);
    match tier {
        DifficultyTier::Classic => 0.2 + 0.8 * t,
        DifficultyTier::Practice | DifficultyTier::AiBrain => 0.1 + 0.9 * t,
    }
}

pub fn aim_noise_for(level: u32, tier: DifficultyTier) -> f32 {
    MAX_AIM_NOISE * (1.0 - accuracy_for(level, tier))
}

pub fn power_noise_for(level: u32, tier: DifficultyTier) -> f32 {
    MAX_POWER_NOISE * (1.0 - accuracy_for(level, tier))
}

/// Everything the planner needs to know about its own strength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyProfile {
    pub level: u32,
    pub tier: DifficultyTier,
    pub accuracy: f32,
    pub trial_shots: u32,
    pub think_time_ms: u32,
    pub skill_multiplier: f32,
    pub aim_noise: f32,
    pub power_noise: f32,
}

impl DifficultyProfile {
    pub fn for_level(level: u32, tier: DifficultyTier) -> Result<Self, ConfigError> {
        if !tier.contains(level) {
            let (min, max) = tier.levels();
            return Err(ConfigError::InvalidDifficulty {
                level,
                tier,
                min,
                max,
            });
        }
        Ok(Self {
            level,
            tier,
            accuracy: accuracy_for(level, tier),
            trial_shots: trial_shots_for(level, tier),
            think_time_ms: think_time_ms_for(level, tier),
            skill_multiplier: skill_multiplier_for(level, tier),
            aim_noise: aim_noise_for(level, tier),
            power_noise: power_noise_for(level, tier),
        })
    }

    /// A noiseless profile that searches `trial_shots` candidates.
    pub fn perfect(trial_shots: u32) -> Self {
        Self {
            level: 0,
            tier: DifficultyTier::AiBrain,
            accuracy: 1.0,
            trial_shots: trial_shots.max(1),
            think_time_ms: 0,
            skill_multiplier: 1.0,
            aim_noise: 0.0,
            power_noise: 0.0,
        }
    }
}
