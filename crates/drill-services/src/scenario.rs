//! Scenario generation.
//!
//! One request per simulation start. The LLM generator makes a single
//! non-streaming call and does not retry; failures surface to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use drill_core::scenario::{DecisionOption, Scenario, ScenarioPhase, ScenarioRequest};

use crate::error::ServiceError;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const SYSTEM_PROMPT: &str = "You design cybersecurity crisis tabletop exercises. \
Reply with a single JSON object and nothing else, shaped as \
{\"title\": string, \"narrative\": string, \"phases\": [{\"title\": string, \
\"description\": string, \"options\": [{\"id\": string, \"label\": string}]}]}.";

/// Produces a static multi-phase scenario for a simulation.
#[async_trait]
pub trait ScenarioGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &ScenarioRequest) -> Result<Scenario, ServiceError>;
}

/// Connection details for [`LlmScenarioGenerator`].
#[derive(Clone, Debug)]
pub struct LlmScenarioConfig {
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub api_key: SecretString,
}

/// Generates scenarios through an Anthropic-style messages endpoint.
pub struct LlmScenarioGenerator {
    client: Client,
    config: LlmScenarioConfig,
}

impl LlmScenarioGenerator {
    pub fn new(config: LlmScenarioConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn prompt(request: &ScenarioRequest) -> String {
        format!(
            "Create a {} difficulty tabletop exercise about a {}. \
             Use exactly {} phases, each with 3 or 4 response options.",
            request.complexity.as_str(),
            request.scenario_type.label(),
            request.complexity.phase_count(),
        )
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl ScenarioGenerator for LlmScenarioGenerator {
    fn name(&self) -> &str {
        "llm"
    }

    #[instrument(skip(self), fields(model = %self.config.model))]
    async fn generate(&self, request: &ScenarioRequest) -> Result<Scenario, ServiceError> {
        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "system": SYSTEM_PROMPT,
            "messages": [{ "role": "user", "content": Self::prompt(request) }],
        });

        let resp = self
            .client
            .post(&self.config.api_url)
            .header("x-api-key", self.config.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(status, body));
        }

        let message: MessagesResponse = resp.json().await?;
        let text: String = message
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();
        debug!(chars = text.len(), "scenario response received");

        parse_scenario(&text)
    }
}

/// Extract and validate the scenario object from model output.
///
/// Tolerates surrounding prose or code fences by taking the outermost `{...}`.
pub fn parse_scenario(text: &str) -> Result<Scenario, ServiceError> {
    let start = text.find('{');
    let end = text.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => {
            return Err(ServiceError::InvalidResponse(
                "no JSON object in model output".into(),
            ))
        }
    };
    let scenario: Scenario = serde_json::from_str(json)
        .map_err(|e| ServiceError::InvalidResponse(format!("scenario JSON: {e}")))?;
    scenario.validate()?;
    Ok(scenario)
}

/// Deterministic offline scenarios, used when no API key is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinScenarioGenerator;

const BUILTIN_PHASES: [(&str, &str); 5] = [
    ("Detection", "Monitoring raises an alert that something is wrong."),
    ("Triage", "The scope of the incident starts to become clear."),
    ("Containment", "The incident is spreading and decisions are needed fast."),
    ("Communication", "Leadership, staff and regulators want answers."),
    ("Recovery", "Systems must be restored and lessons captured."),
];

const BUILTIN_OPTIONS: [(&str, &str); 3] = [
    ("escalate", "Escalate to the incident response team"),
    ("contain", "Isolate the affected systems"),
    ("monitor", "Keep monitoring and gather more evidence"),
];

#[async_trait]
impl ScenarioGenerator for BuiltinScenarioGenerator {
    fn name(&self) -> &str {
        "builtin"
    }

    async fn generate(&self, request: &ScenarioRequest) -> Result<Scenario, ServiceError> {
        let label = request.scenario_type.label();
        let phases = BUILTIN_PHASES
            .iter()
            .take(request.complexity.phase_count())
            .map(|(title, description)| ScenarioPhase {
                title: (*title).to_string(),
                description: format!("{description} ({label})"),
                options: BUILTIN_OPTIONS
                    .iter()
                    .map(|(id, text)| DecisionOption {
                        id: (*id).to_string(),
                        label: (*text).to_string(),
                    })
                    .collect(),
            })
            .collect();

        let scenario = Scenario {
            title: format!("Tabletop exercise: {label}"),
            narrative: format!(
                "Your organisation is facing a {label}. Work through each phase as a team."
            ),
            phases,
        };
        scenario.validate()?;
        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use drill_core::scenario::{Complexity, ScenarioKind};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn request(complexity: Complexity) -> ScenarioRequest {
        ScenarioRequest {
            scenario_type: ScenarioKind::Ransomware,
            complexity,
        }
    }

    fn scenario_json() -> serde_json::Value {
        json!({
            "title": "Locked out",
            "narrative": "File servers are encrypted.",
            "phases": [
                {"title": "Detection", "description": "Ransom note found",
                 "options": [{"id": "a", "label": "Isolate"}, {"id": "b", "label": "Pay"}]}
            ]
        })
    }

    fn generator(server: &MockServer) -> LlmScenarioGenerator {
        LlmScenarioGenerator::new(LlmScenarioConfig {
            api_url: format!("{}/v1/messages", server.uri()),
            model: "test-model".into(),
            max_tokens: 1024,
            timeout: Duration::from_secs(5),
            api_key: SecretString::from("sk-test"),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn llm_generator_parses_text_block() {
        let server = MockServer::start().await;
        let text = format!("Here you go:\n```json\n{}\n```", scenario_json());
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": text}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let scenario = generator(&server)
            .generate(&request(Complexity::Basic))
            .await
            .unwrap();
        assert_eq!(scenario.title, "Locked out");
        assert_eq!(scenario.phases[0].options.len(), 2);
    }

    #[tokio::test]
    async fn llm_generator_maps_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
            .mount(&server)
            .await;

        let err = generator(&server)
            .generate(&request(Complexity::Basic))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn llm_generator_does_not_retry_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let err = generator(&server)
            .generate(&request(Complexity::Advanced))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Upstream { status: 500, .. }));
    }

    #[tokio::test]
    async fn llm_generator_rejects_empty_scenario() {
        let server = MockServer::start().await;
        let text = json!({"title": "t", "narrative": "n", "phases": []}).to_string();
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": text}]
            })))
            .mount(&server)
            .await;

        let err = generator(&server)
            .generate(&request(Complexity::Basic))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn parse_scenario_without_json_fails() {
        assert!(matches!(
            parse_scenario("I cannot help with that."),
            Err(ServiceError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn builtin_phase_count_follows_complexity() {
        let generator = BuiltinScenarioGenerator;
        for complexity in [Complexity::Basic, Complexity::Intermediate, Complexity::Advanced] {
            let scenario = generator.generate(&request(complexity)).await.unwrap();
            assert_eq!(scenario.phases.len(), complexity.phase_count());
            assert!(scenario.validate().is_ok());
        }
    }

    #[tokio::test]
    async fn builtin_is_deterministic() {
        let generator = BuiltinScenarioGenerator;
        let a = generator.generate(&request(Complexity::Basic)).await.unwrap();
        let b = generator.generate(&request(Complexity::Basic)).await.unwrap();
        assert_eq!(a, b);
        assert!(a.title.contains("ransomware"));
    }
}
