//! Typed error hierarchy for worksim.
//!
//! Two enums cover the two failure domains:
//! - `GenerationError`: fatal problems that abort a generation run
//! - `ContentError`: remote text-service failures, always recovered from by
//!   falling back to templates

use thiserror::Error;

/// Errors that abort a generation run. There is no partial recovery: the
/// phases that already committed stay in the store, the rest are absent.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("No users found; generate users before tasks")]
    NoUsers,

    #[error("No teams found; generate teams before memberships")]
    NoTeams,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Store error: {0}")]
    Store(#[source] anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures of the remote text-generation service.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("No API key configured for the remote content service")]
    MissingApiKey,

    #[error("Remote content request timed out")]
    Timeout,

    #[error("Remote content service returned status {code}")]
    Status { code: u16 },

    #[error("Remote content request failed: {0}")]
    Transport(String),

    #[error("Remote content service returned an empty completion")]
    EmptyCompletion,

    #[error("Malformed response from remote content service: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ContentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ContentError::Timeout
        } else if let Some(status) = err.status() {
            ContentError::Status {
                code: status.as_u16(),
            }
        } else if err.is_decode() {
            ContentError::Malformed(err.to_string())
        } else {
            ContentError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_error_no_users_is_matchable() {
        let err = GenerationError::NoUsers;
        assert!(matches!(err, GenerationError::NoUsers));
        assert!(err.to_string().contains("generate users"));
    }

    #[test]
    fn invalid_config_carries_message() {
        let err = GenerationError::InvalidConfig("users must be at least 1".into());
        match &err {
            GenerationError::InvalidConfig(msg) => assert!(msg.contains("users")),
            _ => panic!("Expected InvalidConfig"),
        }
    }

    #[test]
    fn generation_error_converts_from_anyhow() {
        let err: GenerationError = anyhow::anyhow!("disk full").into();
        assert!(matches!(err, GenerationError::Other(_)));
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn content_error_status_carries_code() {
        let err = ContentError::Status { code: 429 };
        match &err {
            ContentError::Status { code } => assert_eq!(*code, 429),
            _ => panic!("Expected Status"),
        }
        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&GenerationError::NoTeams);
        assert_std_error(&ContentError::Timeout);
    }
}
