//! Error types for wire parsing and payload validation.

use thiserror::Error;

/// Reasons an inbound socket frame could not be turned into a message.
#[derive(Debug, Error)]
pub enum WireError {
    /// The frame was not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    /// Valid JSON, but not an object.
    #[error("message is not a JSON object")]
    NotAnObject,
    /// No string `type` field.
    #[error("message has no `type` discriminator")]
    MissingDiscriminator,
    /// A known message kind whose fields did not match its schema.
    #[error("invalid `{kind}` payload: {source}")]
    InvalidPayload {
        /// Discriminator value of the rejected message.
        kind: String,
        /// Underlying field error.
        #[source]
        source: serde_json::Error,
    },
    /// A binary frame that was not UTF-8.
    #[error("binary frame is not valid UTF-8")]
    NonUtf8,
}

impl WireError {
    /// Short classification string for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "invalid_json",
            Self::NotAnObject => "not_an_object",
            Self::MissingDiscriminator => "missing_discriminator",
            Self::InvalidPayload { .. } => "invalid_payload",
            Self::NonUtf8 => "non_utf8",
        }
    }
}

/// Payload validation failures for scenarios and outgoing mail.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("scenario has no phases")]
    EmptyScenario,
    #[error("scenario phase {index} has no decision options")]
    PhaseWithoutOptions { index: usize },
    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),
    #[error("email subject is empty")]
    EmptySubject,
}
