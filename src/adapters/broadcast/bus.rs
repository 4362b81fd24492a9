//! In-process broadcast bus with per-channel subscriber registries.
//!
//! Channels are created on first subscription and removed when their last
//! subscriber leaves.
//!
//! ```text
//! Channel: chat                 Channel: ops
//! ├── subscription-a            └── subscription-d
//! ├── subscription-b
//! └── subscription-c
//! ```
//!
//! A message published on `chat` reaches a, b and c, each through its own
//! bounded ring of pending messages.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, oneshot};

use crate::domain::chat::{ChannelName, ChatMessage};
use crate::domain::foundation::{DomainError, SubscriptionId};
use crate::ports::{MessageFeed, MessagePublisher, SubscriptionError};

/// Default number of pending messages kept per subscriber.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

struct ChannelEntry {
    sender: broadcast::Sender<Arc<ChatMessage>>,
    /// Dropping a member's sender revokes that subscription.
    members: HashMap<SubscriptionId, oneshot::Sender<()>>,
}

impl ChannelEntry {
    fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            members: HashMap::new(),
        }
    }
}

#[derive(Default)]
struct Registry {
    channels: HashMap<ChannelName, ChannelEntry>,
    /// subscription → channel, for O(1) removal.
    index: HashMap<SubscriptionId, ChannelName>,
    shut_down: bool,
}

struct Shared {
    registry: Mutex<Registry>,
    capacity: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut registry = self.lock();
        let Some(channel) = registry.index.remove(&id) else {
            return false;
        };

        let now_empty = match registry.channels.get_mut(&channel) {
            Some(entry) => {
                entry.members.remove(&id);
                entry.members.is_empty()
            }
            None => false,
        };
        if now_empty {
            registry.channels.remove(&channel);
        }
        drop(registry);

        tracing::debug!(subscription_id = %id, channel = %channel, "Unsubscribed");
        true
    }
}

/// Process-wide publish/subscribe hub.
///
/// Cheap to clone; all clones share one registry. Built once at startup and
/// handed to the endpoints through the application state.
///
/// # Thread Safety
///
/// The registry sits behind a `std::sync::Mutex` whose critical sections
/// never await. Holding it during `broadcast` makes subscribe and publish
/// mutually ordered: a message reaches exactly the subscriptions registered
/// before it was published.
#[derive(Clone)]
pub struct BroadcastBus {
    shared: Arc<Shared>,
}

impl BroadcastBus {
    /// Create a bus whose subscribers each buffer up to `capacity` messages.
    ///
    /// A subscriber further behind than `capacity` loses the oldest
    /// messages (see [`SubscriptionError::Lagged`]).
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::default()),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Create with default capacity (256 messages).
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Register a new subscription on `channel`.
    ///
    /// Never fails. The subscription receives every message published on
    /// the channel after this call returns, in publish order. After
    /// [`shutdown`](Self::shutdown) the returned subscription is already
    /// closed.
    pub fn subscribe(&self, channel: &ChannelName) -> Subscription {
        let id = SubscriptionId::new();
        let (revoke, revoked) = oneshot::channel();

        let mut registry = self.shared.lock();
        let receiver = if registry.shut_down {
            None
        } else {
            let capacity = self.shared.capacity;
            let entry = registry
                .channels
                .entry(channel.clone())
                .or_insert_with(|| ChannelEntry::new(capacity));
            let receiver = entry.sender.subscribe();
            entry.members.insert(id, revoke);
            registry.index.insert(id, channel.clone());
            Some(receiver)
        };
        drop(registry);

        let active = receiver.is_some();
        if active {
            tracing::debug!(subscription_id = %id, channel = %channel, "Subscribed");
        }

        Subscription {
            id,
            channel: channel.clone(),
            receiver,
            revoked,
            shared: Arc::clone(&self.shared),
            active,
        }
    }

    /// Deliver `message` to every subscription currently on `channel`.
    ///
    /// Returns how many registered subscriptions it reached. Revoked
    /// handles that have not been dropped yet are not counted. Publishing
    /// to a channel without subscribers is a no-op returning 0. Never waits
    /// on a subscriber.
    pub fn broadcast(&self, channel: &ChannelName, message: ChatMessage) -> usize {
        let message = Arc::new(message);
        let registry = self.shared.lock();
        match registry.channels.get(channel) {
            Some(entry) => {
                // A revoked receiver may still hold the ring open; send fails
                // only once every receiver is gone.
                let _ = entry.sender.send(message);
                entry.members.len()
            }
            None => 0,
        }
    }

    /// Remove a subscription from outside its owner.
    ///
    /// Idempotent: returns `true` only for the call that removed it. The
    /// owner's next `recv` reports [`SubscriptionError::Closed`].
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.remove(id)
    }

    /// Number of subscriptions on a channel (0 if it doesn't exist).
    pub fn subscriber_count(&self, channel: &ChannelName) -> usize {
        self.shared
            .lock()
            .channels
            .get(channel)
            .map(|entry| entry.members.len())
            .unwrap_or(0)
    }

    /// Total number of subscriptions across all channels.
    pub fn total_subscribers(&self) -> usize {
        self.shared.lock().index.len()
    }

    /// Channels that currently have subscribers.
    pub fn active_channels(&self) -> Vec<ChannelName> {
        self.shared.lock().channels.keys().cloned().collect()
    }

    /// Revoke every subscription and refuse new ones.
    ///
    /// Used on graceful shutdown so long-lived streams end. Returns the
    /// number of subscriptions revoked.
    pub fn shutdown(&self) -> usize {
        let mut registry = self.shared.lock();
        registry.shut_down = true;
        let revoked = registry.index.len();
        registry.index.clear();
        registry.channels.clear();
        drop(registry);

        tracing::info!(revoked, "Broadcast bus shut down");
        revoked
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[async_trait]
impl MessagePublisher for BroadcastBus {
    async fn publish(
        &self,
        channel: &ChannelName,
        message: ChatMessage,
    ) -> Result<(), DomainError> {
        let id = message.id();
        let delivered = self.broadcast(channel, message);
        tracing::debug!(message_id = %id, channel = %channel, delivered, "Message broadcast");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "BroadcastBus"
    }
}

/// One subscriber's membership in a channel.
///
/// Yields messages through [`recv`](Self::recv). Leaves the channel on
/// [`unsubscribe`](Self::unsubscribe) or when dropped, whichever comes
/// first.
pub struct Subscription {
    id: SubscriptionId,
    channel: ChannelName,
    receiver: Option<broadcast::Receiver<Arc<ChatMessage>>>,
    revoked: oneshot::Receiver<()>,
    shared: Arc<Shared>,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    /// Whether this handle has not yet released its registration.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Wait for the next message.
    ///
    /// Cancel-safe: dropping the future loses no message.
    pub async fn recv(&mut self) -> Result<Arc<ChatMessage>, SubscriptionError> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Err(SubscriptionError::Closed);
        };

        let outcome = tokio::select! {
            biased;
            _ = &mut self.revoked => None,
            received = receiver.recv() => Some(received),
        };

        match outcome {
            Some(Ok(message)) => Ok(message),
            Some(Err(broadcast::error::RecvError::Lagged(missed))) => {
                Err(SubscriptionError::Lagged(missed))
            }
            Some(Err(broadcast::error::RecvError::Closed)) | None => {
                self.receiver = None;
                Err(SubscriptionError::Closed)
            }
        }
    }

    /// Leave the channel. Idempotent; returns `true` only for the call
    /// that removed the registration.
    pub fn unsubscribe(&mut self) -> bool {
        self.receiver = None;
        if !self.active {
            return false;
        }
        self.active = false;
        self.shared.remove(self.id)
    }
}

#[async_trait]
impl MessageFeed for Subscription {
    fn subscription_id(&self) -> SubscriptionId {
        self.id
    }

    fn channel(&self) -> &ChannelName {
        &self.channel
    }

    async fn next_message(&mut self) -> Result<Arc<ChatMessage>, SubscriptionError> {
        self.recv().await
    }

    fn release(&mut self) -> bool {
        self.unsubscribe()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .field("active", &self.active)
            .finish()
    }
}
