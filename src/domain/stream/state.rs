//! Lifecycle of one streaming connection on the server side.

use serde::Deserialize;
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Why a stream session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The client went away (response body dropped).
    PeerDisconnected,
    /// Writing a frame to the connection failed.
    WriteFailed,
    /// A frame could not be written within the configured write timeout.
    WriteTimedOut,
    /// The subscription was removed from outside (explicit unsubscribe or
    /// server shutdown).
    Revoked,
    /// The subscriber fell behind and the overflow policy is `disconnect`.
    Overflow { missed: u64 },
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerDisconnected => write!(f, "peer disconnected"),
            CloseReason::WriteFailed => write!(f, "write failed"),
            CloseReason::WriteTimedOut => write!(f, "write timed out"),
            CloseReason::Revoked => write!(f, "subscription revoked"),
            CloseReason::Overflow { missed } => {
                write!(f, "subscriber overflowed ({} messages missed)", missed)
            }
        }
    }
}

/// States of a listen stream: `Opening → Streaming → Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Subscribed, nothing written yet.
    Opening,
    /// Frames are being written.
    Streaming,
    /// Terminal; the subscription has been released.
    Closed(CloseReason),
}

impl StreamState {
    pub fn is_closed(&self) -> bool {
        matches!(self, StreamState::Closed(_))
    }
}

impl StateMachine for StreamState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use StreamState::*;
        matches!(
            (self, target),
            (Opening, Streaming) | (Opening, Closed(_)) | (Streaming, Closed(_))
        )
    }

    fn is_terminal(&self) -> bool {
        self.is_closed()
    }
}

/// What to do with a subscriber whose queue overflowed.
///
/// Each subscriber has a bounded ring of pending messages. When a slow
/// subscriber falls behind, the oldest pending messages are overwritten;
/// the policy decides whether the stream carries on or is closed so the
/// client reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Skip the overwritten messages and keep streaming.
    #[default]
    DropOldest,
    /// Close the stream.
    Disconnect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_moves_to_streaming() {
        assert!(StreamState::Opening.can_transition_to(&StreamState::Streaming));
    }

    #[test]
    fn any_live_state_can_close() {
        let closed = StreamState::Closed(CloseReason::WriteFailed);
        assert!(StreamState::Opening.can_transition_to(&closed));
        assert!(StreamState::Streaming.can_transition_to(&closed));
    }

    #[test]
    fn closed_is_terminal() {
        let closed = StreamState::Closed(CloseReason::PeerDisconnected);
        assert!(closed.is_terminal());
        assert!(closed.transition_to(StreamState::Streaming).is_err());
        assert!(closed
            .transition_to(StreamState::Closed(CloseReason::WriteFailed))
            .is_err());
    }

    #[test]
    fn streaming_cannot_reopen() {
        assert!(!StreamState::Streaming.can_transition_to(&StreamState::Opening));
    }

    #[test]
    fn overflow_policy_deserializes_snake_case() {
        let policy: OverflowPolicy = serde_json::from_str("\"disconnect\"").unwrap();
        assert_eq!(policy, OverflowPolicy::Disconnect);
        assert_eq!(OverflowPolicy::default(), OverflowPolicy::DropOldest);
    }

    #[test]
    fn close_reason_display_mentions_missed_count() {
        let reason = CloseReason::Overflow { missed: 7 };
        assert!(reason.to_string().contains('7'));
    }
}
