//! Events exchanged with the host's transport, as JSON.
//!
//! Envelope: `{"type": "shot" | "state" | "complete", "payload": ...}`.
//! Inbound payloads are validated before the engine sees them.

use serde::{Deserialize, Serialize};

use crate::api::types::{EndReason, ShotData};
use crate::error::WireError;
use crate::rules::state::GameState;

/// Sent once when a match reaches its end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchComplete {
    /// `None` for a drawn match.
    pub winner_id: Option<String>,
    pub player1_score: u32,
    pub player2_score: u32,
    pub match_duration_seconds: f32,
    pub end_reason: EndReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum WireEvent {
    Shot(ShotData),
    State(GameState),
    Complete(MatchComplete),
}

impl WireEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            WireEvent::Shot(_) => "shot",
            WireEvent::State(_) => "state",
            WireEvent::Complete(_) => "complete",
        }
    }

    pub fn encode(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and validate an envelope.
    pub fn decode(json: &str) -> Result<Self, WireError> {
        let event: WireEvent = serde_json::from_str(json)?;
        event.validate()?;
        Ok(event)
    }

    fn validate(&self) -> Result<(), WireError> {
        match self {
            WireEvent::Shot(shot) => validate_shot(shot),
            WireEvent::State(state) => state.validate(),
            WireEvent::Complete(_) => Ok(()),
        }
    }
}

fn validate_shot(shot: &ShotData) -> Result<(), WireError> {
    if shot.is_well_formed() {
        Ok(())
    } else {
        Err(WireError::invalid(format!("shot out of range: {:?}", shot)))
    }
}

fn is_envelope(json: &str) -> Result<bool, WireError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    Ok(value.get("type").is_some() && value.get("payload").is_some())
}

/// Decode a shot, either bare or wrapped in a `shot` envelope.
pub fn decode_shot(json: &str) -> Result<ShotData, WireError> {
    if is_envelope(json)? {
        return match WireEvent::decode(json)? {
            WireEvent::Shot(shot) => Ok(shot),
            other => Err(WireError::UnexpectedEvent {
                expected: "shot",
                found: other.kind(),
            }),
        };
    }
    let shot: ShotData = serde_json::from_str(json)?;
    validate_shot(&shot)?;
    Ok(shot)
}

/// Decode a game state, either bare or wrapped in a `state` envelope.
pub fn decode_state(json: &str) -> Result<GameState, WireError> {
    if is_envelope(json)? {
        return match WireEvent::decode(json)? {
            WireEvent::State(state) => Ok(state),
            other => Err(WireError::UnexpectedEvent {
                expected: "state",
                found: other.kind(),
            }),
        };
    }
    let state: GameState = serde_json::from_str(json)?;
    state.validate()?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{Side, Spin};
    use crate::core::table::Table;

    #[test]
    fn envelope_shape() {
        let event = WireEvent::Shot(ShotData::new(0.5, 0.7).with_spin(Spin::new(0.1, -0.2)));
        let json = event.encode().unwrap();
        assert!(json.starts_with("{\"type\":\"shot\",\"payload\":{"), "json was {}", json);
        assert_eq!(WireEvent::decode(&json).unwrap(), event);
    }

    #[test]
    fn complete_payload_fields() {
        let event = WireEvent::Complete(MatchComplete {
            winner_id: Some("alice".into()),
            player1_score: 8,
            player2_score: 3,
            match_duration_seconds: 312.5,
            end_reason: EndReason::EightBallPotted,
        });
        let json = event.encode().unwrap();
        for field in ["winnerId", "player1Score", "player2Score", "matchDurationSeconds", "eightBallPotted"] {
            assert!(json.contains(field), "missing {} in {}", field, json);
        }
    }

    #[test]
    fn bare_and_wrapped_shots_decode() {
        let bare = decode_shot(r#"{"angle":1.0,"power":0.5}"#).unwrap();
        assert_eq!(bare, ShotData::new(1.0, 0.5));
        let wrapped = decode_shot(r#"{"type":"shot","payload":{"angle":1.0,"power":0.5}}"#).unwrap();
        assert_eq!(wrapped, bare);
    }

    #[test]
    fn bad_payloads_are_rejected() {
        assert!(matches!(decode_shot("{not json"), Err(WireError::Malformed(_))));
        assert!(matches!(
            decode_shot(r#"{"angle":1.0,"power":4.0}"#),
            Err(WireError::Invalid(_))
        ));

        let state = GameState::new_rack(Side::P1, &Table::standard(), 0.0112);
        let json = WireEvent::State(state).encode().unwrap();
        assert!(matches!(
            decode_shot(&json),
            Err(WireError::UnexpectedEvent { expected: "shot", found: "state" })
        ));
    }

    #[test]
    fn state_is_validated_on_decode() {
        let mut state = GameState::new_rack(Side::P1, &Table::standard(), 0.0112);
        assert!(decode_state(&serde_json::to_string(&state).unwrap()).is_ok());
        state.balls.truncate(10);
        let json = serde_json::to_string(&state).unwrap();
        assert!(matches!(decode_state(&json), Err(WireError::Invalid(_))));
    }
}
