//! FrameSink port - the outbound side of one streaming connection.
//!
//! A stream session writes encoded frames into a sink without knowing
//! whether it is an HTTP response body, a test recorder or anything else.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// The connection behind a sink is gone; no further writes can succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("frame sink closed")]
pub struct SinkClosed;

/// Destination for encoded frames of one connection.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Write one encoded frame.
    ///
    /// May wait while the connection is congested. Returns [`SinkClosed`]
    /// once the peer has gone away.
    async fn send(&mut self, frame: Bytes) -> Result<(), SinkClosed>;

    /// Resolves once the peer has gone away.
    ///
    /// Lets a session notice a disconnect while it is idle, without waiting
    /// for its next write to fail.
    async fn closed(&self);
}
