//! chat-relay server entry point.
//!
//! Loads configuration, wires the broadcast bus (optionally behind Redis
//! fan-out) into the HTTP adapter and serves until Ctrl-C or SIGTERM.

use std::sync::Arc;

use chat_relay::adapters::broadcast::{BroadcastBus, RedisFanout};
use chat_relay::adapters::http::{app, ChatAppState};
use chat_relay::config::AppConfig;
use chat_relay::ports::MessagePublisher;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let bus = BroadcastBus::new(config.stream.channel_capacity);

    let mut relay = None;
    let publisher: Arc<dyn MessagePublisher> = match &config.redis {
        Some(redis) => {
            let fanout = RedisFanout::connect(redis, bus.clone()).await?;
            relay = Some(fanout.start_relay().await?);
            Arc::new(fanout)
        }
        None => Arc::new(bus.clone()),
    };
    tracing::info!(publisher = publisher.name(), "Publisher ready");

    let state = ChatAppState::from_config(bus.clone(), publisher, &config)?;
    let router = app(state, &config);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, environment = ?config.server.environment, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(bus))
        .await?;

    if let Some(relay) = relay {
        relay.abort();
    }
    tracing::info!("Server stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured filter; JSON lines in production.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Resolves on Ctrl-C or SIGTERM, after closing every open stream so the
/// graceful shutdown does not wait on them.
async fn shutdown_signal(bus: BroadcastBus) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    let closed = bus.shutdown();
    tracing::info!(closed, "Shutting down");
}
