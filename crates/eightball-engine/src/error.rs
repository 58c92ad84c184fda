use thiserror::Error;

use crate::ai::difficulty::DifficultyTier;

/// Misuse of the configuration surface. These are the only hard failures
/// the engine reports to its host.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("engine is already configured")]
    AlreadyConfigured,

    #[error("match has already started")]
    MatchStarted,

    #[error("engine is not configured")]
    NotConfigured,

    #[error("difficulty level {level} is outside the {tier:?} range {min}..={max}")]
    InvalidDifficulty {
        level: u32,
        tier: DifficultyTier,
        min: u32,
        max: u32,
    },

    #[error("invalid match config: {0}")]
    Malformed(String),
}

/// Why a shot request was refused. No state is mutated when one of these
/// is returned.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ShotRejection {
    #[error("engine is not configured")]
    NotConfigured,

    #[error("the match is over")]
    GameOver,

    #[error("it is not this side's turn")]
    NotYourTurn,

    #[error("a shot is already in flight")]
    ShotInFlight,

    #[error("cue ball can only be moved with ball in hand")]
    BallInHandViolated,

    #[error("cue ball placement is not on a free spot of the table")]
    InvalidPlacement,

    #[error("shot parameters are out of range")]
    InvalidShot,
}

/// A malformed or inconsistent payload arriving from the transport.
#[derive(Error, Debug)]
pub enum WireError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid payload: {0}")]
    Invalid(String),

    #[error("unexpected event type: expected {expected}, found {found}")]
    UnexpectedEvent {
        expected: &'static str,
        found: &'static str,
    },

    #[error("shot rejected: {0}")]
    Rejected(#[from] ShotRejection),
}

impl WireError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        WireError::Invalid(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_readable() {
        let err = ConfigError::InvalidDifficulty {
            level: 7,
            tier: DifficultyTier::Classic,
            min: 1,
            max: 5,
        };
        assert_eq!(
            err.to_string(),
            "difficulty level 7 is outside the Classic range 1..=5"
        );
        assert_eq!(ShotRejection::ShotInFlight.to_string(), "a shot is already in flight");
    }

    #[test]
    fn json_errors_convert() {
        let err: WireError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, WireError::Malformed(_)));
    }
}
