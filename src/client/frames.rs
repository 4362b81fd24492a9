//! Frames out of a chunked byte stream.

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::domain::stream::{Frame, FrameDecoder, FrameError};

use super::error::ClientError;

/// Pulls [`Frame`]s out of a stream of byte chunks, one at a time.
///
/// Unknown frame kinds are skipped. Any other decode error, a transport
/// error, or a truncated last line ends the stream with that error.
pub struct FrameStream<S> {
    inner: S,
    decoder: FrameDecoder,
    done: bool,
}

impl<S, E> FrameStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<ClientError>,
{
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
            done: false,
        }
    }

    /// Next frame; `None` once the stream has ended cleanly or failed.
    pub async fn next_frame(&mut self) -> Option<Result<Frame, ClientError>> {
        loop {
            if self.done {
                return None;
            }

            match self.decoder.next_frame() {
                Some(Ok(frame)) => return Some(Ok(frame)),
                Some(Err(FrameError::UnknownKind(kind))) => {
                    tracing::debug!(kind = %kind, "Skipping frame of unknown kind");
                    continue;
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                None => {}
            }

            match self.inner.next().await {
                Some(Ok(chunk)) => self.decoder.push(&chunk),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.done = true;
                    return self.decoder.finish().map(|e| Err(e.into()));
                }
            }
        }
    }
}
