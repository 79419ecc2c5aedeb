//! Outgoing mail. One relay call per message; no queueing, no retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{info, instrument};

use drill_core::notify::EmailMessage;

use crate::error::ServiceError;

/// Sends one email and reports success or failure.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), ServiceError>;
}

#[derive(Clone, Debug)]
pub struct MailRelayConfig {
    pub relay_url: String,
    pub from_address: String,
    pub timeout: Duration,
    pub token: Option<SecretString>,
}

/// Posts messages as JSON to an HTTP mail relay.
pub struct MailRelayNotifier {
    client: Client,
    config: MailRelayConfig,
}

impl MailRelayNotifier {
    pub fn new(config: MailRelayConfig) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Notifier for MailRelayNotifier {
    #[instrument(skip_all, fields(to = %message.to))]
    async fn send(&self, message: &EmailMessage) -> Result<(), ServiceError> {
        message.validate()?;

        let mut req = self.client.post(&self.config.relay_url).json(&json!({
            "from": self.config.from_address,
            "to": message.to,
            "subject": message.subject,
            "html": message.body,
        }));
        if let Some(token) = &self.config.token {
            req = req.bearer_auth(token.expose_secret());
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(status, body));
        }

        info!("email delivered to relay");
        Ok(())
    }
}

/// Used when mail is turned off in settings.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, _message: &EmailMessage) -> Result<(), ServiceError> {
        Err(ServiceError::Disabled("mail"))
    }
}
