//! Crisis scenarios handed to participants at simulation start.

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Category of crisis being rehearsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Ransomware,
    DataBreach,
    PhishingCampaign,
    InsiderThreat,
    Ddos,
    SupplyChain,
}

impl ScenarioKind {
    /// Human-readable label used in prompts and titles.
    pub fn label(self) -> &'static str {
        match self {
            Self::Ransomware => "ransomware attack",
            Self::DataBreach => "data breach",
            Self::PhishingCampaign => "phishing campaign",
            Self::InsiderThreat => "insider threat",
            Self::Ddos => "distributed denial-of-service attack",
            Self::SupplyChain => "supply chain compromise",
        }
    }
}

/// Difficulty tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Basic,
    #[default]
    Intermediate,
    Advanced,
}

impl Complexity {
    /// Number of phases a scenario of this tier should have.
    pub fn phase_count(self) -> usize {
        match self {
            Self::Basic => 3,
            Self::Intermediate => 4,
            Self::Advanced => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

/// Request for a new scenario.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRequest {
    pub scenario_type: ScenarioKind,
    #[serde(default)]
    pub complexity: Complexity,
}

/// One option a participant may pick during a phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOption {
    pub id: String,
    pub label: String,
}

/// One stage of the unfolding crisis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioPhase {
    pub title: String,
    pub description: String,
    pub options: Vec<DecisionOption>,
}

/// A complete multi-phase scenario.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub title: String,
    pub narrative: String,
    pub phases: Vec<ScenarioPhase>,
}

impl Scenario {
    /// Every scenario needs at least one phase and every phase needs options.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.phases.is_empty() {
            return Err(ValidationError::EmptyScenario);
        }
        if let Some(index) = self.phases.iter().position(|p| p.options.is_empty()) {
            return Err(ValidationError::PhaseWithoutOptions { index });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(options: usize) -> ScenarioPhase {
        ScenarioPhase {
            title: "Detection".into(),
            description: "Alerts fire".into(),
            options: (0..options)
                .map(|i| DecisionOption {
                    id: format!("opt_{i}"),
                    label: format!("Option {i}"),
                })
                .collect(),
        }
    }

    #[test]
    fn valid_scenario_passes() {
        let scenario = Scenario {
            title: "t".into(),
            narrative: "n".into(),
            phases: vec![phase(2), phase(3)],
        };
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn empty_scenario_rejected() {
        let scenario = Scenario {
            title: "t".into(),
            narrative: "n".into(),
            phases: vec![],
        };
        assert_eq!(scenario.validate(), Err(ValidationError::EmptyScenario));
    }

    #[test]
    fn phase_without_options_rejected() {
        let scenario = Scenario {
            title: "t".into(),
            narrative: "n".into(),
            phases: vec![phase(2), phase(0)],
        };
        assert_eq!(
            scenario.validate(),
            Err(ValidationError::PhaseWithoutOptions { index: 1 })
        );
    }

    #[test]
    fn request_defaults_complexity() {
        let req: ScenarioRequest = serde_json::from_str(r#"{"scenarioType":"data_breach"}"#).unwrap();
        assert_eq!(req.scenario_type, ScenarioKind::DataBreach);
        assert_eq!(req.complexity, Complexity::Intermediate);
    }

    #[test]
    fn phase_count_grows_with_complexity() {
        assert!(Complexity::Basic.phase_count() < Complexity::Intermediate.phase_count());
        assert!(Complexity::Intermediate.phase_count() < Complexity::Advanced.phase_count());
    }
}
