//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CHAT_RELAY` prefix and nested values use double underscores as separators.
//! Every value has a default, so an empty environment is a valid configuration.
//!
//! # Example
//!
//! ```no_run
//! use chat_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod error;
mod features;
mod redis;
mod server;
mod stream;

pub use error::{ConfigError, ValidationError};
pub use features::FeatureFlags;
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};
pub use stream::StreamConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Listen stream tuning (channel, keepalive, buffers)
    #[serde(default)]
    pub stream: StreamConfig,

    /// Redis fan-out; absent for a single instance
    #[serde(default)]
    pub redis: Option<RedisConfig>,

    /// Feature flags
    #[serde(default)]
    pub features: FeatureFlags,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CHAT_RELAY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CHAT_RELAY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CHAT_RELAY__REDIS__URL=...` -> `redis.url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CHAT_RELAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.stream.validate()?;
        if let Some(redis) = &self.redis {
            redis.validate()?;
        }
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stream::OverflowPolicy;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 6] = [
        "CHAT_RELAY__SERVER__PORT",
        "CHAT_RELAY__SERVER__ENVIRONMENT",
        "CHAT_RELAY__STREAM__KEEPALIVE_SECS",
        "CHAT_RELAY__STREAM__OVERFLOW_POLICY",
        "CHAT_RELAY__REDIS__URL",
        "CHAT_RELAY__FEATURES__TRUST_CLIENT_AUTHOR",
    ];

    /// Helper to clear environment variables after testing
    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_empty_environment_is_valid() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert!(config.redis.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load().unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.stream.keepalive_secs, 15);
        assert!(!config.features.trust_client_author);
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("CHAT_RELAY__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("CHAT_RELAY__SERVER__PORT", "3000");
        env::set_var("CHAT_RELAY__STREAM__KEEPALIVE_SECS", "5");
        env::set_var("CHAT_RELAY__STREAM__OVERFLOW_POLICY", "disconnect");
        env::set_var("CHAT_RELAY__FEATURES__TRUST_CLIENT_AUTHOR", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.stream.keepalive_secs, 5);
        assert_eq!(config.stream.overflow_policy, OverflowPolicy::Disconnect);
        assert!(config.features.trust_client_author);
    }

    #[test]
    fn test_redis_section_enables_fanout() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("CHAT_RELAY__REDIS__URL", "redis://localhost:6379");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        let redis = config.redis.as_ref().unwrap();
        assert_eq!(redis.url, "redis://localhost:6379");
        assert_eq!(redis.channel_prefix, "chat-relay");
        assert!(config.validate().is_ok());
    }
}
