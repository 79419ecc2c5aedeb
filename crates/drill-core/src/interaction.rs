//! Audit records created from participant activity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::wire::DecisionEvent;

/// What kind of activity an interaction records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionAction {
    /// A decision submitted during a live crisis simulation.
    CrisisDecision,
}

impl InteractionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CrisisDecision => "crisis_decision",
        }
    }
}

impl fmt::Display for InteractionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crisis_decision" => Ok(Self::CrisisDecision),
            other => Err(format!("unknown interaction action: {other}")),
        }
    }
}

/// An interaction waiting to be persisted. The store assigns id and timestamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInteraction {
    pub user_id: i64,
    pub simulation_id: i64,
    pub action: InteractionAction,
    pub details: Value,
}

impl NewInteraction {
    /// Audit entry for a crisis decision: `details = { decision, phase }`.
    pub fn from_decision(event: &DecisionEvent) -> Self {
        Self {
            user_id: event.user_id,
            simulation_id: event.simulation_id,
            action: InteractionAction::CrisisDecision,
            details: json!({
                "decision": event.decision,
                "phase": event.phase,
            }),
        }
    }
}

/// A persisted interaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub id: i64,
    pub user_id: i64,
    pub simulation_id: i64,
    pub action: InteractionAction,
    pub details: Value,
    /// RFC 3339, UTC, assigned by the store.
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_string_forms_agree() {
        let action = InteractionAction::CrisisDecision;
        assert_eq!(action.as_str(), "crisis_decision");
        assert_eq!(action.to_string(), "crisis_decision");
        assert_eq!(
            serde_json::to_value(action).unwrap(),
            Value::String("crisis_decision".into())
        );
        assert_eq!("crisis_decision".parse::<InteractionAction>(), Ok(action));
    }

    #[test]
    fn unknown_action_fails_to_parse() {
        assert!("phishing_click".parse::<InteractionAction>().is_err());
    }

    #[test]
    fn from_decision_embeds_decision_and_phase() {
        let event = DecisionEvent {
            user_id: 12,
            simulation_id: 5,
            decision: "pay ransom".into(),
            phase: 3,
        };
        let entry = NewInteraction::from_decision(&event);
        assert_eq!(entry.user_id, 12);
        assert_eq!(entry.simulation_id, 5);
        assert_eq!(entry.action, InteractionAction::CrisisDecision);
        assert_eq!(entry.details, json!({"decision": "pay ransom", "phase": 3}));
    }

    #[test]
    fn record_serializes_camel_case() {
        let record = InteractionRecord {
            id: 1,
            user_id: 2,
            simulation_id: 3,
            action: InteractionAction::CrisisDecision,
            details: json!({"decision": "x", "phase": 0}),
            created_at: "2026-10-16T09:00:00+00:00".into(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["userId"], 2);
        assert_eq!(value["simulationId"], 3);
        assert_eq!(value["action"], "crisis_decision");
        assert_eq!(value["createdAt"], "2026-10-16T09:00:00+00:00");
    }
}
