//! PostMessageHandler - Command handler for publishing a chat message.

use std::sync::Arc;

use crate::domain::chat::{Author, ChannelName, ChatError, ChatMessage, MessageBody};
use crate::ports::MessagePublisher;

/// Command to publish a message.
///
/// `author` is already resolved by the caller (session cookie, or the
/// client-supplied name when that is trusted). `None` means nobody could
/// be identified.
#[derive(Debug, Clone, Default)]
pub struct PostMessageCommand {
    pub author: Option<String>,
    pub body: Option<String>,
}

/// Handler for posting messages to the configured channel.
pub struct PostMessageHandler {
    channel: ChannelName,
    publisher: Arc<dyn MessagePublisher>,
}

impl PostMessageHandler {
    pub fn new(channel: ChannelName, publisher: Arc<dyn MessagePublisher>) -> Self {
        Self { channel, publisher }
    }

    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    /// Validate, stamp and publish a message exactly once.
    pub async fn handle(&self, cmd: PostMessageCommand) -> Result<ChatMessage, ChatError> {
        let author = cmd
            .author
            .ok_or_else(|| ChatError::invalid_request("sign in before posting"))?;
        let author = Author::new(author)?;

        let body = cmd
            .body
            .ok_or_else(|| ChatError::invalid_request("missing message body"))?;
        let body = MessageBody::new(body)?;

        let message = ChatMessage::new(author, body);

        if let Err(e) = self.publisher.publish(&self.channel, message.clone()).await {
            tracing::error!(
                publisher = self.publisher.name(),
                error = %e,
                "Failed to publish message"
            );
            return Err(e.into());
        }

        tracing::info!(
            message_id = %message.id(),
            channel = %self.channel,
            author = %message.author(),
            "Message published"
        );

        Ok(message)
    }
}
