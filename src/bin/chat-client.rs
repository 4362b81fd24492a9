//! Terminal chat client.
//!
//! Prints every message from the server's listen stream on stdout and posts
//! each line typed on stdin. Logs go to stderr.

use std::time::Duration;

use chat_relay::client::{
    ClientConfig, PublishAction, SkipReason, StreamConsumer, SubmitOutcome,
};
use chat_relay::domain::chat::ChatMessage;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chat-client", version, about = "Terminal client for chat-relay")]
struct Cli {
    /// Base URL of the chat-relay server
    #[arg(long, default_value = "http://127.0.0.1:8080", value_name = "URL")]
    server: String,

    /// Display name to post as
    #[arg(long)]
    name: String,

    /// Delay before reconnecting a lost stream
    #[arg(long, default_value_t = 1000, value_name = "MS")]
    retry_delay_ms: u64,

    /// Timeout of a single send request
    #[arg(long, default_value_t = 10, value_name = "SECS")]
    request_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::new(cli.server, cli.name)
        .with_retry_delay(Duration::from_millis(cli.retry_delay_ms))
        .with_request_timeout(Duration::from_secs(cli.request_timeout_secs));

    let publisher = PublishAction::new(&config)?;
    let consumer = StreamConsumer::new(&config)?;

    let mut status = consumer.status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = *status.borrow_and_update();
            tracing::info!(status = %current, "Connection status");
        }
    });

    tokio::spawn(async move {
        let mut print = |message: &ChatMessage| {
            println!(
                "[{}] {}: {}",
                message.timestamp().as_datetime().format("%H:%M:%S"),
                message.author(),
                message.body()
            );
        };
        consumer.run(&mut print).await;
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(mut line) = line? else { break };
                match publisher.submit(&mut line).await {
                    SubmitOutcome::Sent | SubmitOutcome::Skipped(SkipReason::EmptyBody) => {}
                    SubmitOutcome::Skipped(SkipReason::InFlight) => {
                        eprintln!("still sending the previous message");
                    }
                    SubmitOutcome::Rejected { status, reason } => {
                        eprintln!("rejected ({}): {}", status, reason);
                    }
                    SubmitOutcome::Failed(reason) => eprintln!("send failed: {}", reason),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}
