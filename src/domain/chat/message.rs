//! Chat message value objects.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{MessageId, Timestamp, ValidationError};

/// Maximum display name length, in characters.
pub const MAX_AUTHOR_LENGTH: usize = 32;

/// Maximum message body length, in characters.
pub const MAX_BODY_LENGTH: usize = 2_000;

/// Characters an author name may not contain, so it can travel in a cookie.
const FORBIDDEN_AUTHOR_CHARS: [char; 4] = [';', ',', '"', '\\'];

/// Display name of the person posting a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Author(String);

impl Author {
    /// Validates and creates an author name.
    ///
    /// Surrounding whitespace is trimmed; the remainder must be non-empty,
    /// at most [`MAX_AUTHOR_LENGTH`] characters and free of control
    /// characters and cookie delimiters.
    pub fn new(name: impl AsRef<str>) -> Result<Self, ValidationError> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(ValidationError::empty_field("author"));
        }
        let len = name.chars().count();
        if len > MAX_AUTHOR_LENGTH {
            return Err(ValidationError::too_long("author", MAX_AUTHOR_LENGTH, len));
        }
        if let Some(c) = name
            .chars()
            .find(|c| c.is_control() || FORBIDDEN_AUTHOR_CHARS.contains(c))
        {
            return Err(ValidationError::invalid_format(
                "author",
                format!("contains forbidden character {:?}", c),
            ));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Author {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Author> for String {
    fn from(author: Author) -> Self {
        author.0
    }
}

/// Plain-text message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageBody(String);

impl MessageBody {
    /// Validates and creates a message body.
    ///
    /// The trimmed text must be non-empty and at most [`MAX_BODY_LENGTH`]
    /// characters. Inner newlines are kept.
    pub fn new(text: impl AsRef<str>) -> Result<Self, ValidationError> {
        let text = text.as_ref().trim();
        if text.is_empty() {
            return Err(ValidationError::empty_field("body"));
        }
        let len = text.chars().count();
        if len > MAX_BODY_LENGTH {
            return Err(ValidationError::too_long("body", MAX_BODY_LENGTH, len));
        }
        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MessageBody {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MessageBody> for String {
    fn from(body: MessageBody) -> Self {
        body.0
    }
}

/// A chat message as broadcast to every subscriber.
///
/// Immutable: fields are only readable. New messages get a fresh id and
/// the current time from [`ChatMessage::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    id: MessageId,
    timestamp: Timestamp,
    author: Author,
    body: MessageBody,
}

impl ChatMessage {
    /// Creates a message stamped with a new id and the current time.
    pub fn new(author: Author, body: MessageBody) -> Self {
        Self {
            id: MessageId::new(),
            timestamp: Timestamp::now(),
            author,
            body,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn body(&self) -> &MessageBody {
        &self.body
    }
}
