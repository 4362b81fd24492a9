//! MessageFeed port - the inbound side of one subscription.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::chat::{ChannelName, ChatMessage};
use crate::domain::foundation::SubscriptionId;

/// Errors returned by [`MessageFeed::next_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    /// The subscriber fell behind; this many messages were overwritten.
    #[error("subscriber lagged, {0} messages dropped")]
    Lagged(u64),

    /// The subscription was removed from the bus.
    #[error("subscription closed")]
    Closed,
}

/// Ordered stream of messages published on one channel after subscribing.
#[async_trait]
pub trait MessageFeed: Send {
    fn subscription_id(&self) -> SubscriptionId;

    fn channel(&self) -> &ChannelName;

    /// Wait for the next message.
    ///
    /// `Lagged` is recoverable: the following call resumes with the oldest
    /// message still buffered. `Closed` is final.
    async fn next_message(&mut self) -> Result<Arc<ChatMessage>, SubscriptionError>;

    /// Leave the channel. Idempotent; `true` only on the call that
    /// actually removed the registration.
    fn release(&mut self) -> bool;
}
