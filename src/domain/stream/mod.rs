//! Stream module - the wire framing of the listen stream and the lifecycle
//! of one streaming connection.
//!
//! # Wire format
//!
//! Newline-delimited JSON. Every frame is one JSON object on its own line:
//!
//! ```text
//! {"kind":"keepalive"}
//! {"kind":"message","data":{"id":"…","timestamp":"…","author":"alice","body":"hello"}}
//! ```
//!
//! JSON escapes newlines inside strings, so a raw `\n` always ends a frame.

mod frame;
mod state;

pub use frame::{Frame, FrameDecoder, FrameError, FrameKind, MAX_FRAME_LENGTH, NDJSON_CONTENT_TYPE};
pub use state::{CloseReason, OverflowPolicy, StreamState};
