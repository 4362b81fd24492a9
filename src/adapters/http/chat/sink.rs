//! Response-body side of a listen stream.

use async_trait::async_trait;
use axum::body::Body;
use bytes::Bytes;
use std::convert::Infallible;
use tokio::sync::mpsc;

use crate::ports::{FrameSink, SinkClosed};

/// [`FrameSink`] feeding a streaming response body through a bounded queue.
///
/// When the client disconnects, hyper drops the body, the queue's receiver
/// goes with it, and the sink reports closed.
pub struct ChannelSink {
    sender: mpsc::Sender<Bytes>,
}

impl ChannelSink {
    /// Creates a sink and the body that drains it.
    pub fn with_body(buffer: usize) -> (Self, Body) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            receiver
                .recv()
                .await
                .map(|frame| (Ok::<_, Infallible>(frame), receiver))
        });
        (Self { sender }, Body::from_stream(stream))
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send(&mut self, frame: Bytes) -> Result<(), SinkClosed> {
        self.sender.send(frame).await.map_err(|_| SinkClosed)
    }

    async fn closed(&self) {
        self.sender.closed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn frames_come_out_of_the_body_in_order() {
        let (mut sink, body) = ChannelSink::with_body(4);
        sink.send(Bytes::from_static(b"one\n")).await.unwrap();
        sink.send(Bytes::from_static(b"two\n")).await.unwrap();
        drop(sink);

        let chunks: Vec<Bytes> = body
            .into_data_stream()
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec![Bytes::from_static(b"one\n"), Bytes::from_static(b"two\n")]);
    }

    #[tokio::test]
    async fn dropping_the_body_closes_the_sink() {
        let (mut sink, body) = ChannelSink::with_body(4);
        drop(body);

        sink.closed().await;
        assert_eq!(sink.send(Bytes::from_static(b"late\n")).await, Err(SinkClosed));
    }
}
