//! Domain layer containing the chat model and streaming protocol types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, state machines)
//! - `chat` - Chat messages, authors, channels and publish errors
//! - `stream` - Listen stream framing and connection lifecycle

pub mod chat;
pub mod foundation;
pub mod stream;
