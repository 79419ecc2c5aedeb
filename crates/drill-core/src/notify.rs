//! Outgoing mail (simulated phishing lures and alerts).

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    /// HTML body.
    pub body: String,
}

impl EmailMessage {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !looks_like_address(&self.to) {
            return Err(ValidationError::InvalidRecipient(self.to.clone()));
        }
        if self.subject.trim().is_empty() {
            return Err(ValidationError::EmptySubject);
        }
        Ok(())
    }
}

fn looks_like_address(addr: &str) -> bool {
    let Some((local, domain)) = addr.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !addr.chars().any(char::is_whitespace)
}
