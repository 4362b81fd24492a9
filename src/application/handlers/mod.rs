//! Application handlers.
//!
//! Command handlers and session drivers that orchestrate domain operations
//! through ports.

pub mod chat;

pub use chat::{PostMessageCommand, PostMessageHandler, StreamSession, StreamSettings};
