//! Credentials read from the environment only.
//!
//! Secrets are wrapped in [`SecretString`] so they are redacted in `Debug`
//! output and zeroized on drop.

use secrecy::SecretString;

/// API key for the scenario-generation model.
pub const SCENARIO_API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Bearer token for the mail relay.
pub const MAIL_RELAY_TOKEN_VAR: &str = "DRILL_MAIL_RELAY_TOKEN";

/// Secrets available to the process.
#[derive(Clone, Default)]
pub struct Secrets {
    pub scenario_api_key: Option<SecretString>,
    pub mail_relay_token: Option<SecretString>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("scenario_api_key", &self.scenario_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("mail_relay_token", &self.mail_relay_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Secrets {
    /// Read secrets from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read secrets from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(SecretString::from)
        };
        Self {
            scenario_api_key: read(SCENARIO_API_KEY_VAR),
            mail_relay_token: read(MAIL_RELAY_TOKEN_VAR),
        }
    }
}
