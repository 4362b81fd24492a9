//! HTTP adapters - REST and streaming endpoints.

pub mod chat;

// Re-export key types for convenience
pub use chat::{app, chat_router, ChatApiError, ChatAppState};
