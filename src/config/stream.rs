//! Listen stream configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::handlers::StreamSettings;
use crate::domain::chat::ChannelName;
use crate::domain::stream::OverflowPolicy;

/// Listen stream configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Channel served by `/api/send` and `/api/listen`
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Seconds between keepalive frames
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,

    /// Messages buffered per subscriber before the oldest are dropped
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Encoded frames queued between a session and its response body
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,

    /// Seconds a single frame write may take
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,

    /// What to do with a subscriber that falls behind
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
}

impl StreamConfig {
    pub fn channel_name(&self) -> Result<ChannelName, ValidationError> {
        ChannelName::new(self.channel.as_str())
            .map_err(|e| ValidationError::InvalidChannel(e.to_string()))
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// Session settings derived from this section.
    pub fn session_settings(&self) -> StreamSettings {
        StreamSettings {
            keepalive: self.keepalive(),
            write_timeout: self.write_timeout(),
            overflow_policy: self.overflow_policy,
        }
    }

    /// Validate stream configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.channel_name()?;
        if self.keepalive_secs == 0 {
            return Err(ValidationError::MustBePositive("keepalive_secs"));
        }
        if self.channel_capacity == 0 {
            return Err(ValidationError::MustBePositive("channel_capacity"));
        }
        if self.outbound_buffer == 0 {
            return Err(ValidationError::MustBePositive("outbound_buffer"));
        }
        if self.write_timeout_secs == 0 {
            return Err(ValidationError::MustBePositive("write_timeout_secs"));
        }
        Ok(())
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            keepalive_secs: default_keepalive(),
            channel_capacity: default_channel_capacity(),
            outbound_buffer: default_outbound_buffer(),
            write_timeout_secs: default_write_timeout(),
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

fn default_channel() -> String {
    ChannelName::DEFAULT.to_string()
}

fn default_keepalive() -> u64 {
    15
}

fn default_channel_capacity() -> usize {
    256
}

fn default_outbound_buffer() -> usize {
    16
}

fn default_write_timeout() -> u64 {
    30
}
