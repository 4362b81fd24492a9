//! HTTP error mapping for chat endpoints.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::domain::chat::ChatError;

/// Error returned by chat handlers. Rendered as a short plain-text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatApiError {
    InvalidRequest(String),
    MethodNotAllowed,
    PublishFailed(String),
}

impl ChatApiError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        ChatApiError::InvalidRequest(reason.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ChatApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ChatApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ChatApiError::PublishFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<ChatError> for ChatApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::InvalidRequest(reason) => ChatApiError::InvalidRequest(reason),
            ChatError::PublishFailed(reason) => ChatApiError::PublishFailed(reason),
        }
    }
}

impl IntoResponse for ChatApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ChatApiError::InvalidRequest(reason) => reason,
            ChatApiError::MethodNotAllowed => "method not allowed".to_string(),
            ChatApiError::PublishFailed(reason) => {
                tracing::error!(reason = %reason, "Publish unavailable");
                format!("message could not be delivered: {}", reason)
            }
        };
        (status, body).into_response()
    }
}
