//! Chat client: consumes the listen stream and posts messages.
//!
//! - `StreamConsumer` - Reconnecting reader of `GET /api/listen`
//! - `PublishAction` - One-at-a-time submit to `POST /api/send`
//! - `FrameStream` - Frames out of a chunked byte stream

mod consumer;
mod error;
mod frames;
mod publish;
mod status;

pub use consumer::{MessageRenderer, StreamConsumer};
pub use error::ClientError;
pub use frames::FrameStream;
pub use publish::{PublishAction, SkipReason, SubmitOutcome};
pub use status::ConnectionStatus;

use std::time::Duration;

/// Default delay between a lost stream and the next attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default timeout of a publish request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the server, e.g. `http://127.0.0.1:8080`
    pub server_url: String,
    /// Display name sent in the name cookie
    pub author: String,
    pub retry_delay: Duration,
    /// Applies to publish requests only; the listen stream has no deadline
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            author: author.into(),
            retry_delay: DEFAULT_RETRY_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Absolute URL of a server path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = ClientConfig::new("http://localhost:8080/", "alice");
        assert_eq!(config.endpoint("/api/listen"), "http://localhost:8080/api/listen");
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::new("http://localhost:8080", "alice");
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }
}
