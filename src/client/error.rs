//! Client error types

use std::convert::Infallible;
use thiserror::Error;

use crate::domain::foundation::ValidationError;
use crate::domain::stream::FrameError;

/// Errors that end one connection attempt or prevent building a client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded with {0}")]
    Status(reqwest::StatusCode),

    #[error("protocol error: {0}")]
    Frame(#[from] FrameError),

    #[error("invalid author: {0}")]
    InvalidAuthor(#[from] ValidationError),
}

impl From<Infallible> for ClientError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}
