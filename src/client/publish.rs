//! One-at-a-time message submission.

use reqwest::header::{HeaderValue, COOKIE};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::chat::Author;
use crate::domain::foundation::ValidationError;

use super::error::ClientError;
use super::ClientConfig;

/// Why a submit did not send anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The input was empty or whitespace.
    EmptyBody,
    /// Another submit has not finished yet.
    InFlight,
}

/// Result of [`PublishAction::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The server accepted the message.
    Sent,
    /// The server refused it; `reason` is the response body.
    Rejected { status: u16, reason: String },
    /// The request did not complete.
    Failed(String),
    Skipped(SkipReason),
}

/// Posts messages as one author, never more than one at a time.
pub struct PublishAction {
    http: reqwest::Client,
    send_url: String,
    cookie: HeaderValue,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the submit ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PublishAction {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let author = Author::new(&config.author)?;
        let cookie = HeaderValue::from_bytes(format!("name={}", author).as_bytes()).map_err(|_| {
            ValidationError::invalid_format("author", "cannot be sent in a cookie")
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            send_url: config.endpoint("/api/send"),
            cookie,
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Send the text in `input`.
    ///
    /// On a real attempt `input` is cleared before the request goes out.
    /// Skipped submits leave it untouched. No retries.
    pub async fn submit(&self, input: &mut String) -> SubmitOutcome {
        if input.trim().is_empty() {
            return SubmitOutcome::Skipped(SkipReason::EmptyBody);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return SubmitOutcome::Skipped(SkipReason::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let text = std::mem::take(input);
        let outcome = self.post(&text).await;
        match &outcome {
            SubmitOutcome::Sent => tracing::debug!("Message sent"),
            SubmitOutcome::Rejected { status, reason } => {
                tracing::warn!(status, reason = %reason, "Message rejected")
            }
            SubmitOutcome::Failed(reason) => tracing::warn!(reason = %reason, "Send failed"),
            SubmitOutcome::Skipped(_) => {}
        }
        outcome
    }

    async fn post(&self, text: &str) -> SubmitOutcome {
        let result = self
            .http
            .post(&self.send_url)
            .header(COOKIE, self.cookie.clone())
            .json(&serde_json::json!({ "body": text }))
            .send()
            .await;

        match result {
            Err(e) => SubmitOutcome::Failed(e.to_string()),
            Ok(response) if response.status().is_success() => SubmitOutcome::Sent,
            Ok(response) => {
                let status = response.status().as_u16();
                let reason = response.text().await.unwrap_or_default();
                SubmitOutcome::Rejected { status, reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action() -> PublishAction {
        PublishAction::new(&ClientConfig::new("http://127.0.0.1:1", "alice")).unwrap()
    }

    #[tokio::test]
    async fn blank_input_is_skipped_and_kept() {
        let mut input = "   ".to_string();
        assert_eq!(
            action().submit(&mut input).await,
            SubmitOutcome::Skipped(SkipReason::EmptyBody)
        );
        assert_eq!(input, "   ");
    }

    #[test]
    fn invalid_author_is_rejected_up_front() {
        let result = PublishAction::new(&ClientConfig::new("http://127.0.0.1:1", "a;b"));
        assert!(matches!(result, Err(ClientError::InvalidAuthor(_))));
    }

    #[tokio::test]
    async fn transport_failure_clears_input_and_flag() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let action = PublishAction::new(&ClientConfig::new(format!("http://{}", addr), "alice"))
            .unwrap();
        let mut input = "hello".to_string();

        let outcome = action.submit(&mut input).await;

        assert!(matches!(outcome, SubmitOutcome::Failed(_)));
        assert!(input.is_empty());
        assert!(!action.is_in_flight());
    }
}
