//! JSON messages exchanged over the live session socket.
//!
//! Inbound, clients send exactly one kind of message:
//!
//! ```json
//! { "type": "crisis_response", "userId": 7, "simulationId": 3, "decision": "isolate", "phase": 1 }
//! ```
//!
//! Outbound, peers receive only the decision value:
//!
//! ```json
//! { "type": "crisis_update", "data": "isolate" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::WireError;

/// Discriminator of the inbound decision message.
pub const DECISION_EVENT_TYPE: &str = "crisis_response";

/// Discriminator of the outbound relay message.
pub const DECISION_UPDATE_TYPE: &str = "crisis_update";

/// A participant's decision during one phase of a crisis simulation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionEvent {
    pub user_id: i64,
    pub simulation_id: i64,
    pub decision: String,
    pub phase: u32,
}

/// A successfully classified inbound frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// A `crisis_response` message.
    Decision(DecisionEvent),
    /// Any other discriminator. Carries the discriminator for logging.
    Unrecognized(String),
}

/// Classify a text frame.
///
/// Frames that are not a JSON object with a string `type` are errors. A
/// `type` other than [`DECISION_EVENT_TYPE`] is [`Inbound::Unrecognized`],
/// which callers ignore.
pub fn parse_inbound(text: &str) -> Result<Inbound, WireError> {
    let value: Value = serde_json::from_str(text).map_err(WireError::InvalidJson)?;
    let Value::Object(map) = value else {
        return Err(WireError::NotAnObject);
    };
    let kind = match map.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        _ => return Err(WireError::MissingDiscriminator),
    };
    if kind != DECISION_EVENT_TYPE {
        return Ok(Inbound::Unrecognized(kind));
    }
    let event = serde_json::from_value(Value::Object(map))
        .map_err(|source| WireError::InvalidPayload { kind, source })?;
    Ok(Inbound::Decision(event))
}

/// Messages the server pushes to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// Relay of another participant's decision.
    #[serde(rename = "crisis_update")]
    DecisionUpdate {
        /// The decision value, without sender or phase.
        data: String,
    },
}

impl OutboundMessage {
    /// Build the relay message for a decision.
    pub fn decision_update(event: &DecisionEvent) -> Self {
        Self::DecisionUpdate {
            data: event.decision.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decision_json() -> String {
        json!({
            "type": "crisis_response",
            "userId": 7,
            "simulationId": 3,
            "decision": "isolate affected hosts",
            "phase": 1
        })
        .to_string()
    }

    #[test]
    fn parses_decision() {
        let inbound = parse_inbound(&decision_json()).unwrap();
        assert_eq!(
            inbound,
            Inbound::Decision(DecisionEvent {
                user_id: 7,
                simulation_id: 3,
                decision: "isolate affected hosts".into(),
                phase: 1,
            })
        );
    }

    #[test]
    fn unknown_type_is_unrecognized() {
        let inbound = parse_inbound(r#"{"type":"chat","text":"hi"}"#).unwrap();
        assert_eq!(inbound, Inbound::Unrecognized("chat".into()));
    }

    #[test]
    fn non_json_is_invalid() {
        let err = parse_inbound("definitely not json").unwrap_err();
        assert!(matches!(err, WireError::InvalidJson(_)));
    }

    #[test]
    fn empty_frame_is_invalid() {
        assert!(matches!(parse_inbound(""), Err(WireError::InvalidJson(_))));
    }

    #[test]
    fn array_is_not_an_object() {
        assert!(matches!(parse_inbound("[1,2,3]"), Err(WireError::NotAnObject)));
    }

    #[test]
    fn missing_type_is_rejected() {
        let err = parse_inbound(r#"{"userId":1,"decision":"x"}"#).unwrap_err();
        assert!(matches!(err, WireError::MissingDiscriminator));
    }

    #[test]
    fn non_string_type_is_rejected() {
        let err = parse_inbound(r#"{"type":42}"#).unwrap_err();
        assert!(matches!(err, WireError::MissingDiscriminator));
    }

    #[test]
    fn decision_missing_field_is_invalid_payload() {
        let err = parse_inbound(r#"{"type":"crisis_response","userId":1,"simulationId":2,"phase":0}"#)
            .unwrap_err();
        match err {
            WireError::InvalidPayload { kind, .. } => assert_eq!(kind, "crisis_response"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn negative_phase_is_invalid_payload() {
        let text = r#"{"type":"crisis_response","userId":1,"simulationId":2,"decision":"x","phase":-1}"#;
        assert!(matches!(
            parse_inbound(text),
            Err(WireError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn decision_update_carries_only_the_decision() {
        let event = DecisionEvent {
            user_id: 9,
            simulation_id: 4,
            decision: "notify legal".into(),
            phase: 2,
        };
        let json = OutboundMessage::decision_update(&event).to_json().unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, json!({"type": "crisis_update", "data": "notify legal"}));
    }

    #[test]
    fn outbound_parses_back() {
        let msg: OutboundMessage =
            serde_json::from_str(r#"{"type":"crisis_update","data":"escalate"}"#).unwrap();
        assert_eq!(
            msg,
            OutboundMessage::DecisionUpdate {
                data: "escalate".into()
            }
        );
    }
}
