//! HTTP adapter for chat endpoints.
//!
//! - `GET /` - Landing page
//! - `POST /api/login`, `POST /api/logout` - Name cookie
//! - `POST /api/send` - Publish a message
//! - `GET /api/listen` - NDJSON stream of messages
//! - `GET /api/stats` - Local subscriber counts
//! - `GET /health` - Liveness probe

pub mod dto;
mod error;
mod handlers;
mod routes;
pub mod session;
mod sink;
mod state;

pub use error::ChatApiError;
pub use routes::{app, chat_router, chat_routes, stream_routes};
pub use sink::ChannelSink;
pub use state::ChatAppState;
