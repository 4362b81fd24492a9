//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `broadcast` - Message fan-out (in-process bus, Redis relay)
//! - `http` - Axum routes and the streaming response sink
//! - `pages` - HTML rendering

pub mod broadcast;
pub mod http;
pub mod pages;

pub use broadcast::{BroadcastBus, RedisFanout, Subscription};
pub use http::{app, ChatAppState};
pub use pages::StaticPageRenderer;
