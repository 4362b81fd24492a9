//! Reconnecting consumer of the listen stream.

use reqwest::header::ACCEPT;
use std::time::Duration;
use tokio::sync::watch;

use crate::domain::chat::ChatMessage;
use crate::domain::foundation::StateMachine;
use crate::domain::stream::{Frame, NDJSON_CONTENT_TYPE};

use super::error::ClientError;
use super::frames::FrameStream;
use super::status::ConnectionStatus;
use super::ClientConfig;

/// Receives every message read from the stream, in order.
pub trait MessageRenderer {
    fn render(&mut self, message: &ChatMessage);
}

impl<F> MessageRenderer for F
where
    F: FnMut(&ChatMessage),
{
    fn render(&mut self, message: &ChatMessage) {
        self(message)
    }
}

/// Keeps a listen stream open, reconnecting after every loss.
///
/// Messages published while disconnected are not recovered.
pub struct StreamConsumer {
    http: reqwest::Client,
    listen_url: String,
    retry_delay: Duration,
    status: watch::Sender<ConnectionStatus>,
}

impl StreamConsumer {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()?;
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);

        Ok(Self {
            http,
            listen_url: config.endpoint("/api/listen"),
            retry_delay: config.retry_delay,
            status,
        })
    }

    /// Watch the connection status indicator.
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    pub fn current_status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Consume the stream forever: connect, read until it ends or fails,
    /// wait `retry_delay`, repeat.
    pub async fn run<R>(&self, renderer: &mut R)
    where
        R: MessageRenderer + ?Sized,
    {
        loop {
            match self.connect_once(renderer).await {
                Ok(()) => tracing::info!("Stream ended, reconnecting"),
                Err(e) => tracing::warn!(error = %e, "Stream lost, reconnecting"),
            }
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    /// One connection lifetime: `Connecting`, `Connected` once the response
    /// head arrives, `Disconnected` when the body ends or fails.
    pub async fn connect_once<R>(&self, renderer: &mut R) -> Result<(), ClientError>
    where
        R: MessageRenderer + ?Sized,
    {
        self.set_status(ConnectionStatus::Connecting);
        let result = self.read_stream(renderer).await;
        self.set_status(ConnectionStatus::Disconnected);
        result
    }

    async fn read_stream<R>(&self, renderer: &mut R) -> Result<(), ClientError>
    where
        R: MessageRenderer + ?Sized,
    {
        let response = self
            .http
            .get(&self.listen_url)
            .header(ACCEPT, NDJSON_CONTENT_TYPE)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status));
        }

        self.set_status(ConnectionStatus::Connected);
        tracing::info!(url = %self.listen_url, "Connected to stream");

        let mut frames = FrameStream::new(Box::pin(response.bytes_stream()));
        while let Some(frame) = frames.next_frame().await {
            match frame? {
                Frame::Message(message) => renderer.render(&message),
                Frame::Keepalive => tracing::trace!("keepalive"),
            }
        }
        Ok(())
    }

    fn set_status(&self, next: ConnectionStatus) {
        let current = *self.status.borrow();
        if current == next {
            return;
        }
        if !current.can_transition_to(&next) {
            tracing::debug!(from = %current, to = %next, "Unexpected status change");
        }
        self.status.send_replace(next);
    }
}
