//! Message fan-out.
//!
//! - `bus` - In-process channel registry with per-subscriber buffers
//! - `redis_fanout` - Redis PubSub relay for running several instances

mod bus;
mod redis_fanout;

pub use bus::{BroadcastBus, Subscription, DEFAULT_CHANNEL_CAPACITY};
pub use redis_fanout::{redis_topic, FanoutEnvelope, RedisFanout, RelayStatus};
