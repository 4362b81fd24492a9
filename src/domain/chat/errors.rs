//! Errors of the publish use case.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ValidationError};

/// Failures surfaced by the publish path.
///
/// Delivery-side failures (a dead subscriber) never appear here: they are
/// handled inside the owning stream session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// The request is malformed or no author could be determined.
    #[error("{0}")]
    InvalidRequest(String),

    /// The message was valid but the publisher could not accept it.
    #[error("publish failed: {0}")]
    PublishFailed(String),
}

impl ChatError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        ChatError::InvalidRequest(reason.into())
    }
}

impl From<ValidationError> for ChatError {
    fn from(err: ValidationError) -> Self {
        ChatError::InvalidRequest(err.to_string())
    }
}

impl From<DomainError> for ChatError {
    fn from(err: DomainError) -> Self {
        ChatError::PublishFailed(err.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    #[test]
    fn validation_error_becomes_invalid_request() {
        let err: ChatError = ValidationError::empty_field("body").into();
        assert_eq!(
            err,
            ChatError::InvalidRequest("Field 'body' cannot be empty".to_string())
        );
    }

    #[test]
    fn domain_error_becomes_publish_failed() {
        let err: ChatError = DomainError::new(ErrorCode::PubSubError, "down").into();
        assert_eq!(err.to_string(), "publish failed: down");
    }
}
