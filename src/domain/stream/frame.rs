//! Frame encoding and incremental decoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::chat::ChatMessage;

/// Content type of the listen stream.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Longest line the decoder accepts before giving up on the stream.
pub const MAX_FRAME_LENGTH: usize = 64 * 1024;

/// One event on the listen stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A published chat message.
    Message(ChatMessage),
    /// Idle-connection heartbeat; carries no payload.
    Keepalive,
}

/// Discriminator written in the `kind` field of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    Message,
    Keepalive,
}

/// Errors produced while encoding or decoding frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("unknown frame kind '{0}'")]
    UnknownKind(String),

    #[error("message frame without data")]
    MissingPayload,

    #[error("frame exceeds {limit} bytes")]
    Oversized { limit: usize },

    #[error("stream ended inside a frame ({pending} bytes pending)")]
    Truncated { pending: usize },

    #[error("failed to encode frame: {0}")]
    Encode(String),
}

impl FrameError {
    /// Errors after which the rest of the stream cannot be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::Oversized { .. } | FrameError::Truncated { .. })
    }
}

#[derive(Serialize)]
struct OutgoingRecord<'a> {
    kind: FrameKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a ChatMessage>,
}

#[derive(Deserialize)]
struct IncomingRecord {
    kind: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Message(_) => FrameKind::Message,
            Frame::Keepalive => FrameKind::Keepalive,
        }
    }

    /// Encodes this frame as one newline-terminated line.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        match self {
            Frame::Message(message) => Self::encode_message(message),
            Frame::Keepalive => Self::encode_keepalive(),
        }
    }

    /// Encodes a message frame without taking ownership of the message.
    pub fn encode_message(message: &ChatMessage) -> Result<Vec<u8>, FrameError> {
        encode_record(OutgoingRecord {
            kind: FrameKind::Message,
            data: Some(message),
        })
    }

    pub fn encode_keepalive() -> Result<Vec<u8>, FrameError> {
        encode_record(OutgoingRecord {
            kind: FrameKind::Keepalive,
            data: None,
        })
    }

    /// Decodes one line (without its terminator) into a frame.
    pub fn decode(line: &[u8]) -> Result<Frame, FrameError> {
        let record: IncomingRecord =
            serde_json::from_slice(line).map_err(|e| FrameError::Malformed(e.to_string()))?;

        match record.kind.as_str() {
            "keepalive" => Ok(Frame::Keepalive),
            "message" => {
                let data = record.data.ok_or(FrameError::MissingPayload)?;
                let message = serde_json::from_value(data)
                    .map_err(|e| FrameError::Malformed(e.to_string()))?;
                Ok(Frame::Message(message))
            }
            other => Err(FrameError::UnknownKind(other.to_string())),
        }
    }
}

fn encode_record(record: OutgoingRecord<'_>) -> Result<Vec<u8>, FrameError> {
    let mut line = serde_json::to_vec(&record).map_err(|e| FrameError::Encode(e.to_string()))?;
    line.push(b'\n');
    Ok(line)
}

/// Incremental frame decoder.
///
/// Feed it byte chunks as they arrive with [`push`](Self::push) and pull
/// complete frames with [`next_frame`](Self::next_frame). Chunk boundaries
/// may fall anywhere, including inside a multi-byte character.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to contain no terminator.
    scanned: usize,
    max_len: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_len(MAX_FRAME_LENGTH)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_len,
        }
    }

    /// Appends received bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Returns the next complete frame, or `None` if more bytes are needed.
    ///
    /// Blank lines are skipped. After an [`FrameError::Oversized`] error the
    /// stream is out of sync and should be abandoned.
    pub fn next_frame(&mut self) -> Option<Result<Frame, FrameError>> {
        loop {
            let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n')
            else {
                self.scanned = self.buffer.len();
                if self.buffer.len() > self.max_len {
                    self.reset();
                    return Some(Err(FrameError::Oversized {
                        limit: self.max_len,
                    }));
                }
                return None;
            };

            let end = self.scanned + offset;
            let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
            self.scanned = 0;

            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            if line.len() > self.max_len {
                return Some(Err(FrameError::Oversized {
                    limit: self.max_len,
                }));
            }
            return Some(Frame::decode(&line));
        }
    }

    /// Signals end of input. Reports an unterminated trailing frame.
    pub fn finish(&mut self) -> Option<FrameError> {
        let pending = self.buffer.len();
        let blank = self.buffer.iter().all(u8::is_ascii_whitespace);
        self.reset();
        if blank {
            None
        } else {
            Some(FrameError::Truncated { pending })
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
