//! End-to-end tests against a real server on an ephemeral port.
//!
//! A running axum server, real HTTP connections, the terminal client's
//! consumer and publish action on the other side.

use std::net::SocketAddr;
use std::time::Duration;

use chat_relay::adapters::broadcast::BroadcastBus;
use chat_relay::adapters::http::{app, ChatAppState};
use chat_relay::client::{
    ClientConfig, ConnectionStatus, PublishAction, StreamConsumer, SubmitOutcome,
};
use chat_relay::config::AppConfig;
use chat_relay::domain::chat::{ChannelName, ChatMessage, MAX_BODY_LENGTH};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;

// =============================================================================
// Test Infrastructure
// =============================================================================

async fn spawn_server(bus: BroadcastBus) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(ChatAppState::local(bus), &AppConfig::default());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn client_config(addr: SocketAddr, name: &str) -> ClientConfig {
    ClientConfig::new(format!("http://{}", addr), name)
        .with_retry_delay(Duration::from_millis(100))
        .with_request_timeout(Duration::from_secs(5))
}

/// Starts a consumer whose rendered messages arrive on the returned channel.
fn spawn_listener(
    config: &ClientConfig,
) -> (watch::Receiver<ConnectionStatus>, mpsc::UnboundedReceiver<ChatMessage>) {
    let consumer = StreamConsumer::new(config).unwrap();
    let status = consumer.status();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut render = move |message: &ChatMessage| {
            let _ = tx.send(message.clone());
        };
        consumer.run(&mut render).await;
    });

    (status, rx)
}

async fn wait_connected(status: &mut watch::Receiver<ConnectionStatus>) {
    timeout(Duration::from_secs(5), status.wait_for(|s| s.is_connected()))
        .await
        .expect("consumer did not connect")
        .unwrap();
}

async fn next_message(rx: &mut mpsc::UnboundedReceiver<ChatMessage>) -> ChatMessage {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no message rendered")
        .unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn alice_says_hello_to_everyone() {
    let bus = BroadcastBus::default();
    let addr = spawn_server(bus.clone()).await;

    let (mut bob_status, mut bob) = spawn_listener(&client_config(addr, "bob"));
    let (mut carol_status, mut carol) = spawn_listener(&client_config(addr, "carol"));
    wait_connected(&mut bob_status).await;
    wait_connected(&mut carol_status).await;
    assert_eq!(bus.subscriber_count(&ChannelName::default()), 2);

    let alice = PublishAction::new(&client_config(addr, "alice")).unwrap();
    let mut input = "hello".to_string();
    assert_eq!(alice.submit(&mut input).await, SubmitOutcome::Sent);
    assert!(input.is_empty());

    for rx in [&mut bob, &mut carol] {
        let message = next_message(rx).await;
        assert_eq!(message.author().as_str(), "alice");
        assert_eq!(message.body().as_str(), "hello");
    }
}

#[tokio::test]
async fn messages_arrive_in_publish_order() {
    let bus = BroadcastBus::default();
    let addr = spawn_server(bus).await;

    let (mut status, mut rx) = spawn_listener(&client_config(addr, "bob"));
    wait_connected(&mut status).await;

    let alice = PublishAction::new(&client_config(addr, "alice")).unwrap();
    for text in ["one", "two", "three"] {
        let mut input = text.to_string();
        assert_eq!(alice.submit(&mut input).await, SubmitOutcome::Sent);
    }

    for expected in ["one", "two", "three"] {
        assert_eq!(next_message(&mut rx).await.body().as_str(), expected);
    }
}

#[tokio::test]
async fn oversized_message_is_rejected_with_reason() {
    let addr = spawn_server(BroadcastBus::default()).await;
    let alice = PublishAction::new(&client_config(addr, "alice")).unwrap();

    let mut input = "x".repeat(MAX_BODY_LENGTH + 1);
    match alice.submit(&mut input).await {
        SubmitOutcome::Rejected { status, reason } => {
            assert_eq!(status, 400);
            assert!(reason.contains("body"), "reason: {}", reason);
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn stats_count_open_streams() {
    let bus = BroadcastBus::default();
    let addr = spawn_server(bus).await;
    let (mut status, _rx) = spawn_listener(&client_config(addr, "bob"));
    wait_connected(&mut status).await;

    let stats: serde_json::Value = reqwest::get(format!("http://{}/api/stats", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(stats["channel"], "chat");
    assert_eq!(stats["subscribers"], 1);
}

#[tokio::test]
async fn shutdown_disconnects_consumers() {
    let bus = BroadcastBus::default();
    let addr = spawn_server(bus.clone()).await;
    let (mut status, _rx) = spawn_listener(&client_config(addr, "bob"));
    wait_connected(&mut status).await;

    bus.shutdown();

    timeout(
        Duration::from_secs(5),
        status.wait_for(|s| *s == ConnectionStatus::Disconnected),
    )
    .await
    .expect("consumer stayed connected")
    .unwrap();
}

#[tokio::test]
async fn consumer_reconnects_after_server_restart_and_keeps_receiving() {
    let first_bus = BroadcastBus::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let router = app(ChatAppState::local(first_bus.clone()), &AppConfig::default());
    let first_server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = stopped.await;
            })
            .await
            .unwrap();
    });

    let (mut status, mut rx) = spawn_listener(&client_config(addr, "bob"));
    wait_connected(&mut status).await;

    // Take the first server down the way main does: end every stream, then stop.
    first_bus.shutdown();
    let _ = stop.send(());
    timeout(Duration::from_secs(5), first_server)
        .await
        .expect("first server did not stop")
        .unwrap();
    timeout(
        Duration::from_secs(5),
        status.wait_for(|s| !s.is_connected()),
    )
    .await
    .expect("consumer stayed connected")
    .unwrap();

    let second_bus = BroadcastBus::default();
    let listener = TcpListener::bind(addr).await.unwrap();
    let router = app(ChatAppState::local(second_bus.clone()), &AppConfig::default());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    wait_connected(&mut status).await;
    assert_eq!(second_bus.subscriber_count(&ChannelName::default()), 1);

    let alice = PublishAction::new(&client_config(addr, "alice")).unwrap();
    let mut input = "welcome back".to_string();
    assert_eq!(alice.submit(&mut input).await, SubmitOutcome::Sent);

    let message = next_message(&mut rx).await;
    assert_eq!(message.author().as_str(), "alice");
    assert_eq!(message.body().as_str(), "welcome back");
}
