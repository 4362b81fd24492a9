//! Chat handlers: publishing messages and serving listen streams.

mod post_message;
mod stream_session;

pub use post_message::{PostMessageCommand, PostMessageHandler};
pub use stream_session::{StreamSession, StreamSettings};
