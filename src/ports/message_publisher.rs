//! MessagePublisher port - Interface for publishing chat messages.
//!
//! This port defines how the publish use case hands a message to the
//! broadcast medium without knowing whether delivery is process-local
//! (in-memory bus) or cluster-wide (Redis fan-out).

use async_trait::async_trait;

use crate::domain::chat::{ChannelName, ChatMessage};
use crate::domain::foundation::DomainError;

/// Port for publishing chat messages to a channel.
///
/// Implementations must ensure:
/// - Publishing never fails because of subscriber state (no subscribers,
///   slow subscribers and dead subscribers are all fine)
/// - Publishing never waits on an individual subscriber
/// - Errors are returned only for infrastructure failures of the medium
///   itself
///
/// # Example
///
/// ```ignore
/// let message = ChatMessage::new(author, body);
/// publisher.publish(&ChannelName::default(), message).await?;
/// ```
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish a message to every current subscriber of `channel`.
    async fn publish(&self, channel: &ChannelName, message: ChatMessage)
        -> Result<(), DomainError>;

    /// Publisher name for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that trait is object-safe
    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn MessagePublisher) {}

    #[allow(dead_code)]
    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn message_publisher_is_send_sync() {
        #[allow(dead_code)]
        fn check<T: MessagePublisher>() {
            assert_send_sync::<T>();
        }
    }
}
