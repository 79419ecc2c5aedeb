use drill_core::ValidationError;

/// Failures of an external collaborator call.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} is disabled")]
    Disabled(&'static str),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("rate limited by upstream")]
    RateLimited,

    #[error("upstream rejected request: {0}")]
    InvalidRequest(String),

    #[error("upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ServiceError {
    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(body),
            429 => Self::RateLimited,
            400..=499 => Self::InvalidRequest(format!("status {status}: {body}")),
            _ => Self::Upstream { status, body },
        }
    }

    /// Short machine-readable category, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Disabled(_) => "disabled",
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::RateLimited => "rate_limited",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Upstream { .. } => "upstream_error",
            Self::Network(_) => "network_error",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Validation(_) => "validation_failed",
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_mapping() {
        assert!(matches!(
            ServiceError::from_status(401, "no".into()),
            ServiceError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            ServiceError::from_status(403, "no".into()),
            ServiceError::AuthenticationFailed(_)
        ));
        assert!(matches!(ServiceError::from_status(429, String::new()), ServiceError::RateLimited));
        assert!(matches!(
            ServiceError::from_status(422, "bad".into()),
            ServiceError::InvalidRequest(_)
        ));
        assert!(matches!(
            ServiceError::from_status(503, "down".into()),
            ServiceError::Upstream { status: 503, .. }
        ));
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(ServiceError::Disabled("mail").kind(), "disabled");
        assert_eq!(ServiceError::Validation(ValidationError::EmptySubject).kind(), "validation_failed");
        assert_eq!(ServiceError::Disabled("mail").to_string(), "mail is disabled");
    }
}
