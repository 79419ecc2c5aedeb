//! HTTP-backed collaborators of the live session server: the LLM scenario
//! generator and the mail relay notifier. Each sits behind a trait with an
//! offline implementation for tests and unconfigured deployments.

#![deny(unsafe_code)]

pub mod error;
pub mod notify;
pub mod scenario;

pub use error::ServiceError;
pub use notify::{DisabledNotifier, MailRelayConfig, MailRelayNotifier, Notifier};
pub use scenario::{
    BuiltinScenarioGenerator, LlmScenarioConfig, LlmScenarioGenerator, ScenarioGenerator,
};
