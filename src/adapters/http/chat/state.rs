//! Shared state of the chat HTTP adapter.

use std::sync::Arc;

use crate::adapters::broadcast::BroadcastBus;
use crate::adapters::pages::StaticPageRenderer;
use crate::application::handlers::{PostMessageHandler, StreamSettings};
use crate::config::{AppConfig, ValidationError};
use crate::domain::chat::ChannelName;
use crate::ports::{MessagePublisher, PageRenderer};

/// Shared application state containing all dependencies.
///
/// Cloned for each request; everything inside is cheap to clone.
#[derive(Clone)]
pub struct ChatAppState {
    /// Local bus that listen streams subscribe to.
    pub bus: BroadcastBus,
    /// Where accepted messages go: the bus itself, or Redis fan-out.
    pub publisher: Arc<dyn MessagePublisher>,
    pub pages: Arc<dyn PageRenderer>,
    pub channel: ChannelName,
    pub stream: StreamSettings,
    /// Frames queued per listen response before writes start to wait.
    pub outbound_buffer: usize,
    pub trust_client_author: bool,
}

impl ChatAppState {
    /// Single-instance state publishing straight into `bus`, with defaults.
    pub fn local(bus: BroadcastBus) -> Self {
        Self {
            publisher: Arc::new(bus.clone()),
            bus,
            pages: Arc::new(StaticPageRenderer::default()),
            channel: ChannelName::default(),
            stream: StreamSettings::default(),
            outbound_buffer: 16,
            trust_client_author: false,
        }
    }

    /// State configured from `config`, publishing through `publisher`.
    pub fn from_config(
        bus: BroadcastBus,
        publisher: Arc<dyn MessagePublisher>,
        config: &AppConfig,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            bus,
            publisher,
            pages: Arc::new(StaticPageRenderer::default()),
            channel: config.stream.channel_name()?,
            stream: config.stream.session_settings(),
            outbound_buffer: config.stream.outbound_buffer,
            trust_client_author: config.features.trust_client_author,
        })
    }

    pub fn with_trust_client_author(mut self, trust: bool) -> Self {
        self.trust_client_author = trust;
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn MessagePublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Create handlers on demand from the shared state.
    pub fn post_message_handler(&self) -> PostMessageHandler {
        PostMessageHandler::new(self.channel.clone(), self.publisher.clone())
    }
}
