//! Redis-backed fan-out for multi-instance deployments.
//!
//! Each instance publishes accepted messages to Redis and runs a relay task
//! that feeds every message seen on Redis into its local [`BroadcastBus`]:
//!
//! ```text
//!  instance A                      Redis                    instance B
//!  POST /api/send ──PUBLISH──▶ chat-relay:chat ──pmessage──▶ relay ─▶ bus ─▶ streams
//!        relay ◀──pmessage────────────┘
//!          └─▶ bus ─▶ streams
//! ```
//!
//! Local delivery happens only through the relay, so a subscriber on the
//! publishing instance sees the message exactly once, like everyone else.
//! While the relay is not subscribed, publishing fails rather than skip
//! this instance.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use redis::aio::{MultiplexedConnection, PubSub};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::RedisConfig;
use crate::domain::chat::{ChannelName, ChatMessage};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::MessagePublisher;

use super::bus::BroadcastBus;

/// Wire format of a message on Redis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanoutEnvelope {
    pub channel: ChannelName,
    pub message: ChatMessage,
}

impl FanoutEnvelope {
    pub fn encode(&self) -> Result<String, DomainError> {
        serde_json::to_string(self)
            .map_err(|e| DomainError::new(ErrorCode::SerializationError, e.to_string()))
    }

    pub fn decode(payload: &str) -> Result<Self, DomainError> {
        serde_json::from_str(payload)
            .map_err(|e| DomainError::new(ErrorCode::SerializationError, e.to_string()))
    }
}

/// Redis topic carrying a chat channel.
pub fn redis_topic(prefix: &str, channel: &ChannelName) -> String {
    format!("{}:{}", prefix, channel)
}

fn pubsub_error(err: redis::RedisError) -> DomainError {
    DomainError::new(ErrorCode::PubSubError, err.to_string())
}

/// Whether the relay currently holds its Redis subscription.
///
/// While it does not, a message published through Redis would reach every
/// instance except this one, so publishing is refused instead.
#[derive(Debug, Clone, Default)]
pub struct RelayStatus(Arc<AtomicBool>);

impl RelayStatus {
    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, live: bool) {
        self.0.store(live, Ordering::Release);
    }

    fn ensure_live(&self) -> Result<(), DomainError> {
        if self.is_live() {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::PubSubError,
                "fan-out relay is not subscribed",
            ))
        }
    }
}

/// Cross-instance publisher plus relay into the local bus.
#[derive(Clone)]
pub struct RedisFanout {
    client: redis::Client,
    conn: MultiplexedConnection,
    prefix: String,
    bus: BroadcastBus,
    reconnect_delay: Duration,
    relay: RelayStatus,
}

impl RedisFanout {
    /// Connect the publishing side. Publishing is refused until
    /// [`start_relay`](Self::start_relay) has subscribed.
    pub async fn connect(config: &RedisConfig, bus: BroadcastBus) -> Result<Self, DomainError> {
        let client = redis::Client::open(config.url.as_str()).map_err(pubsub_error)?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(pubsub_error)?;

        tracing::info!(prefix = %config.channel_prefix, "Connected to Redis for fan-out");

        Ok(Self {
            client,
            conn,
            prefix: config.channel_prefix.clone(),
            bus,
            reconnect_delay: config.reconnect_delay(),
            relay: RelayStatus::default(),
        })
    }

    /// Subscribe on Redis, then hand the subscription to a relay task that
    /// feeds Redis traffic into the local bus.
    ///
    /// Returns once the first `PSUBSCRIBE` is confirmed, so nothing
    /// published after this point is missed locally. The task runs until
    /// aborted and resubscribes after `reconnect_delay` whenever the
    /// subscription drops; publishing fails while it is down.
    pub async fn start_relay(&self) -> Result<JoinHandle<()>, DomainError> {
        let pattern = format!("{}:*", self.prefix);
        let first = subscribe(&self.client, &pattern).await.map_err(pubsub_error)?;
        self.relay.set(true);

        let client = self.client.clone();
        let bus = self.bus.clone();
        let status = self.relay.clone();
        let delay = self.reconnect_delay;

        Ok(tokio::spawn(async move {
            let mut next = Some(first);
            loop {
                let pubsub = match next.take() {
                    Some(pubsub) => pubsub,
                    None => match subscribe(&client, &pattern).await {
                        Ok(pubsub) => pubsub,
                        Err(e) => {
                            tracing::error!(error = %e, "Redis relay failed to resubscribe");
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    },
                };

                status.set(true);
                let relayed = relay_messages(pubsub, &bus).await;
                status.set(false);
                tracing::warn!(relayed, "Redis relay subscription ended");
                tokio::time::sleep(delay).await;
            }
        }))
    }
}

async fn subscribe(client: &redis::Client, pattern: &str) -> redis::RedisResult<PubSub> {
    let mut pubsub = client.get_async_connection().await?.into_pubsub();
    pubsub.psubscribe(pattern).await?;
    tracing::info!(pattern = %pattern, "Redis relay subscribed");
    Ok(pubsub)
}

async fn relay_messages(mut pubsub: PubSub, bus: &BroadcastBus) -> usize {
    let payloads = pubsub.on_message().filter_map(|msg| async move {
        match msg.get_payload::<String>() {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping non-text Redis payload");
                None
            }
        }
    });
    relay_payloads(payloads, bus).await
}

/// Broadcast every decodable envelope into `bus` until the stream ends.
///
/// Returns how many envelopes were relayed; malformed ones are skipped.
async fn relay_payloads<S>(payloads: S, bus: &BroadcastBus) -> usize
where
    S: Stream<Item = String>,
{
    futures::pin_mut!(payloads);
    let mut relayed = 0;

    while let Some(payload) = payloads.next().await {
        match FanoutEnvelope::decode(&payload) {
            Ok(envelope) => {
                let delivered = bus.broadcast(&envelope.channel, envelope.message);
                tracing::debug!(channel = %envelope.channel, delivered, "Relayed message");
                relayed += 1;
            }
            Err(e) => tracing::warn!(error = %e, "Skipping malformed fan-out envelope"),
        }
    }
    relayed
}

#[async_trait]
impl MessagePublisher for RedisFanout {
    async fn publish(
        &self,
        channel: &ChannelName,
        message: ChatMessage,
    ) -> Result<(), DomainError> {
        self.relay.ensure_live()?;

        let envelope = FanoutEnvelope {
            channel: channel.clone(),
            message,
        };
        let payload = envelope.encode()?;
        let topic = redis_topic(&self.prefix, channel);

        let mut conn = self.conn.clone();
        let receivers: i64 = conn.publish(&topic, payload).await.map_err(pubsub_error)?;

        tracing::debug!(
            message_id = %envelope.message.id(),
            topic = %topic,
            instances = receivers,
            "Message published to Redis"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "RedisFanout"
    }
}
