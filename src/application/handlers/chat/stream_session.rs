//! StreamSession - drives one listen stream from subscription to close.
//!
//! A session owns a [`MessageFeed`] and writes every message it yields,
//! plus periodic keepalives, into a [`FrameSink`]. It ends on the first of:
//! peer disconnect, failed or stalled write, revocation of the feed, or
//! overflow under the `disconnect` policy. The feed is always released on
//! the way out.

use bytes::Bytes;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::domain::chat::ChatMessage;
use crate::domain::foundation::StateMachine;
use crate::domain::stream::{CloseReason, Frame, FrameError, OverflowPolicy, StreamState};
use crate::ports::{FrameSink, MessageFeed, SubscriptionError};

/// Timing and overflow behaviour of a stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    /// Interval between keepalive frames. One is written as soon as the
    /// session starts, the next a full interval later.
    pub keepalive: Duration,
    /// Longest a single frame write may take before the peer is dropped.
    pub write_timeout: Duration,
    pub overflow_policy: OverflowPolicy,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            keepalive: Duration::from_secs(15),
            write_timeout: Duration::from_secs(30),
            overflow_policy: OverflowPolicy::DropOldest,
        }
    }
}

enum Next {
    Keepalive,
    Message(Arc<ChatMessage>),
    Close(CloseReason),
}

pub struct StreamSession<F: MessageFeed> {
    feed: F,
    settings: StreamSettings,
    state: StreamState,
}

impl<F: MessageFeed> StreamSession<F> {
    pub fn new(feed: F, settings: StreamSettings) -> Self {
        Self {
            feed,
            settings,
            state: StreamState::Opening,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Pump frames into `sink` until the stream closes.
    ///
    /// Returns why it closed. Calling `run` again on a closed session
    /// returns the original reason without touching the sink.
    pub async fn run<S>(&mut self, sink: &mut S) -> CloseReason
    where
        S: FrameSink + ?Sized,
    {
        if let StreamState::Closed(reason) = self.state {
            return reason;
        }

        tracing::debug!(
            subscription_id = %self.feed.subscription_id(),
            channel = %self.feed.channel(),
            "Stream session started"
        );

        let reason = self.pump(sink).await;
        self.close(reason);
        reason
    }

    async fn pump<S>(&mut self, sink: &mut S) -> CloseReason
    where
        S: FrameSink + ?Sized,
    {
        if sink.closed().now_or_never().is_some() {
            return CloseReason::PeerDisconnected;
        }

        // Opening keepalive goes out before anything already queued on the feed.
        if let Err(reason) = self.write(sink, Frame::encode_keepalive()).await {
            return reason;
        }

        let period = self.settings.keepalive;
        let mut keepalive = time::interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let next = tokio::select! {
                biased;
                _ = sink.closed() => Next::Close(CloseReason::PeerDisconnected),
                _ = keepalive.tick() => Next::Keepalive,
                received = self.feed.next_message() => match received {
                    Ok(message) => Next::Message(message),
                    Err(SubscriptionError::Lagged(missed)) => match self.settings.overflow_policy {
                        OverflowPolicy::DropOldest => {
                            tracing::warn!(
                                subscription_id = %self.feed.subscription_id(),
                                missed,
                                "Slow subscriber skipped messages"
                            );
                            continue;
                        }
                        OverflowPolicy::Disconnect => Next::Close(CloseReason::Overflow { missed }),
                    },
                    Err(SubscriptionError::Closed) => Next::Close(CloseReason::Revoked),
                },
            };

            let encoded = match next {
                Next::Close(reason) => return reason,
                Next::Keepalive => Frame::encode_keepalive(),
                Next::Message(message) => Frame::encode_message(&message),
            };
            if let Err(reason) = self.write(sink, encoded).await {
                return reason;
            }
        }
    }

    /// Write one encoded frame within the write timeout.
    ///
    /// An encoding failure drops that frame and keeps the stream open.
    async fn write<S>(
        &mut self,
        sink: &mut S,
        encoded: Result<Vec<u8>, FrameError>,
    ) -> Result<(), CloseReason>
    where
        S: FrameSink + ?Sized,
    {
        let frame = match encoded {
            Ok(line) => Bytes::from(line),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode frame");
                return Ok(());
            }
        };

        match time::timeout(self.settings.write_timeout, sink.send(frame)).await {
            Ok(Ok(())) => {
                self.enter(StreamState::Streaming);
                Ok(())
            }
            Ok(Err(_)) => Err(CloseReason::WriteFailed),
            Err(_) => Err(CloseReason::WriteTimedOut),
        }
    }

    fn close(&mut self, reason: CloseReason) {
        self.feed.release();
        self.enter(StreamState::Closed(reason));

        tracing::info!(
            subscription_id = %self.feed.subscription_id(),
            reason = %reason,
            "Stream closed"
        );
    }

    fn enter(&mut self, next: StreamState) {
        if self.state == next {
            return;
        }
        match self.state.transition_to(next) {
            Ok(state) => self.state = state,
            Err(e) => tracing::debug!(error = %e, "Ignoring stream state change"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::broadcast::BroadcastBus;
    use crate::domain::chat::{Author, ChannelName, MessageBody};
    use crate::ports::SinkClosed;
    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    /// Sink backed by a bounded queue; dropping the receiver is a disconnect.
    struct QueueSink(mpsc::Sender<Bytes>);

    #[async_trait]
    impl FrameSink for QueueSink {
        async fn send(&mut self, frame: Bytes) -> Result<(), SinkClosed> {
            self.0.send(frame).await.map_err(|_| SinkClosed)
        }

        async fn closed(&self) {
            self.0.closed().await
        }
    }

    struct FailingSink;

    #[async_trait]
    impl FrameSink for FailingSink {
        async fn send(&mut self, _frame: Bytes) -> Result<(), SinkClosed> {
            Err(SinkClosed)
        }

        async fn closed(&self) {
            std::future::pending::<()>().await
        }
    }

    struct StalledSink;

    #[async_trait]
    impl FrameSink for StalledSink {
        async fn send(&mut self, _frame: Bytes) -> Result<(), SinkClosed> {
            std::future::pending::<()>().await;
            Ok(())
        }

        async fn closed(&self) {
            std::future::pending::<()>().await
        }
    }

    fn chat() -> ChannelName {
        ChannelName::default()
    }

    fn message(body: &str) -> ChatMessage {
        ChatMessage::new(Author::new("alice").unwrap(), MessageBody::new(body).unwrap())
    }

    async fn next_frame(rx: &mut mpsc::Receiver<Bytes>) -> Frame {
        let bytes = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("sink closed");
        Frame::decode(&bytes).unwrap()
    }

    fn body_of(frame: Frame) -> String {
        match frame {
            Frame::Message(message) => message.body().as_str().to_string(),
            Frame::Keepalive => panic!("expected a message frame"),
        }
    }

    #[tokio::test]
    async fn stream_starts_with_keepalive_then_delivers_messages() {
        let bus = BroadcastBus::new(16);
        let mut session = StreamSession::new(bus.subscribe(&chat()), StreamSettings::default());
        let (tx, mut rx) = mpsc::channel(16);

        let task = tokio::spawn(async move { session.run(&mut QueueSink(tx)).await });

        assert_eq!(next_frame(&mut rx).await, Frame::Keepalive);

        bus.broadcast(&chat(), message("hello"));
        assert_eq!(body_of(next_frame(&mut rx).await), "hello");

        drop(rx);
        let reason = timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert_eq!(reason, CloseReason::PeerDisconnected);
        assert_eq!(bus.subscriber_count(&chat()), 0);
    }

    #[tokio::test]
    async fn queued_message_still_follows_the_first_keepalive() {
        let bus = BroadcastBus::new(16);
        let mut session = StreamSession::new(bus.subscribe(&chat()), StreamSettings::default());
        bus.broadcast(&chat(), message("early"));

        let (tx, mut rx) = mpsc::channel(16);
        tokio::spawn(async move { session.run(&mut QueueSink(tx)).await });

        assert_eq!(next_frame(&mut rx).await, Frame::Keepalive);
        assert_eq!(body_of(next_frame(&mut rx).await), "early");
    }

    #[tokio::test]
    async fn keepalive_precedes_a_full_queue_and_then_waits_one_period() {
        let bus = BroadcastBus::new(16);
        let settings = StreamSettings {
            keepalive: Duration::from_millis(300),
            ..StreamSettings::default()
        };
        let mut session = StreamSession::new(bus.subscribe(&chat()), settings);
        for i in 0..3 {
            bus.broadcast(&chat(), message(&format!("q{}", i)));
        }

        let (tx, mut rx) = mpsc::channel(16);
        tokio::spawn(async move { session.run(&mut QueueSink(tx)).await });

        assert_eq!(next_frame(&mut rx).await, Frame::Keepalive);
        for i in 0..3 {
            assert_eq!(body_of(next_frame(&mut rx).await), format!("q{}", i));
        }
        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
        assert_eq!(next_frame(&mut rx).await, Frame::Keepalive);
    }

    #[tokio::test]
    async fn disconnected_peer_closes_before_any_write() {
        let bus = BroadcastBus::new(16);
        let mut session = StreamSession::new(bus.subscribe(&chat()), StreamSettings::default());
        let (tx, rx) = mpsc::channel(16);
        drop(rx);

        let reason = session.run(&mut QueueSink(tx)).await;

        assert_eq!(reason, CloseReason::PeerDisconnected);
        assert_eq!(session.state(), StreamState::Closed(CloseReason::PeerDisconnected));
        assert_eq!(bus.subscriber_count(&chat()), 0);
    }

    #[tokio::test]
    async fn failing_sink_does_not_affect_other_subscribers() {
        let bus = BroadcastBus::new(16);
        let mut broken = StreamSession::new(bus.subscribe(&chat()), StreamSettings::default());
        let mut healthy = StreamSession::new(bus.subscribe(&chat()), StreamSettings::default());
        let (tx, mut rx) = mpsc::channel(16);
        tokio::spawn(async move { healthy.run(&mut QueueSink(tx)).await });
        assert_eq!(next_frame(&mut rx).await, Frame::Keepalive);

        let reason = broken.run(&mut FailingSink).await;
        assert_eq!(reason, CloseReason::WriteFailed);
        assert_eq!(bus.subscriber_count(&chat()), 1);

        assert_eq!(bus.broadcast(&chat(), message("still here")), 1);
        assert_eq!(body_of(next_frame(&mut rx).await), "still here");
    }

    #[tokio::test]
    async fn stalled_write_times_out() {
        let bus = BroadcastBus::new(16);
        let settings = StreamSettings {
            write_timeout: Duration::from_millis(50),
            ..StreamSettings::default()
        };
        let mut session = StreamSession::new(bus.subscribe(&chat()), settings);

        let reason = timeout(Duration::from_secs(1), session.run(&mut StalledSink))
            .await
            .unwrap();

        assert_eq!(reason, CloseReason::WriteTimedOut);
        assert_eq!(bus.subscriber_count(&chat()), 0);
    }

    #[tokio::test]
    async fn shutdown_revokes_running_session() {
        let bus = BroadcastBus::new(16);
        let mut session = StreamSession::new(bus.subscribe(&chat()), StreamSettings::default());
        let (tx, mut rx) = mpsc::channel(16);
        let task = tokio::spawn(async move { session.run(&mut QueueSink(tx)).await });
        assert_eq!(next_frame(&mut rx).await, Frame::Keepalive);

        bus.shutdown();

        let reason = timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert_eq!(reason, CloseReason::Revoked);
    }

    #[tokio::test]
    async fn disconnect_policy_closes_lagging_subscriber() {
        let bus = BroadcastBus::new(1);
        let settings = StreamSettings {
            overflow_policy: OverflowPolicy::Disconnect,
            ..StreamSettings::default()
        };
        let mut session = StreamSession::new(bus.subscribe(&chat()), settings);
        for i in 0..3 {
            bus.broadcast(&chat(), message(&format!("m{}", i)));
        }

        let (tx, _rx) = mpsc::channel(16);
        let reason = timeout(Duration::from_secs(1), session.run(&mut QueueSink(tx)))
            .await
            .unwrap();

        assert_eq!(reason, CloseReason::Overflow { missed: 2 });
        assert_eq!(bus.subscriber_count(&chat()), 0);
    }

    #[tokio::test]
    async fn drop_oldest_policy_keeps_streaming_newest() {
        let bus = BroadcastBus::new(1);
        let mut session = StreamSession::new(bus.subscribe(&chat()), StreamSettings::default());
        for i in 0..3 {
            bus.broadcast(&chat(), message(&format!("m{}", i)));
        }

        let (tx, mut rx) = mpsc::channel(16);
        tokio::spawn(async move { session.run(&mut QueueSink(tx)).await });

        assert_eq!(next_frame(&mut rx).await, Frame::Keepalive);
        assert_eq!(body_of(next_frame(&mut rx).await), "m2");
    }

    #[tokio::test]
    async fn rerunning_a_closed_session_returns_original_reason() {
        let bus = BroadcastBus::new(16);
        let mut session = StreamSession::new(bus.subscribe(&chat()), StreamSettings::default());

        assert_eq!(session.run(&mut FailingSink).await, CloseReason::WriteFailed);
        assert_eq!(session.run(&mut StalledSink).await, CloseReason::WriteFailed);
    }
}
