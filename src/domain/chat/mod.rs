//! Chat module - the message model and its validation rules.
//!
//! A [`ChatMessage`] is created exactly once, by the publish use case, and
//! is never mutated afterwards. Subscribers share it behind an `Arc`.

mod channel;
mod errors;
mod message;

pub use channel::ChannelName;
pub use errors::ChatError;
pub use message::{Author, ChatMessage, MessageBody, MAX_AUTHOR_LENGTH, MAX_BODY_LENGTH};
