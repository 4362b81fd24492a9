//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `MessagePublisher` - Hands accepted messages to the broadcast medium
//! - `MessageFeed` - Receives the messages of one subscription
//! - `FrameSink` - Outbound side of one streaming connection
//! - `PageRenderer` - HTML rendering for the landing page

mod frame_sink;
mod message_feed;
mod message_publisher;
mod page_renderer;

pub use frame_sink::{FrameSink, SinkClosed};
pub use message_feed::{MessageFeed, SubscriptionError};
pub use message_publisher::MessagePublisher;
pub use page_renderer::{Page, PageRenderer};
