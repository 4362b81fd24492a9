//! Redis configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Redis fan-out configuration. Present only when several instances share
/// one chat.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Prefix of the PubSub topics, `{prefix}:{channel}`
    #[serde(default = "default_channel_prefix")]
    pub channel_prefix: String,

    /// Delay before the relay resubscribes after losing Redis
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
}

impl RedisConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Validate Redis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_URL"));
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::InvalidRedisUrl);
        }
        if self.channel_prefix.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_CHANNEL_PREFIX"));
        }
        Ok(())
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            channel_prefix: default_channel_prefix(),
            reconnect_delay_ms: default_reconnect_delay(),
        }
    }
}

fn default_channel_prefix() -> String {
    "chat-relay".to_string()
}

fn default_reconnect_delay() -> u64 {
    1000
}
