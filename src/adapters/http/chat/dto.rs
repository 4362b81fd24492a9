//! HTTP DTOs (Data Transfer Objects) for chat endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/send`.
///
/// Fields are kept as raw JSON so a wrong type can be reported precisely
/// instead of as a generic parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub body: Option<Value>,
    /// Display name supplied by the client; only honoured when trusted.
    #[serde(default)]
    pub user: Option<Value>,
}

impl SendMessageRequest {
    pub fn body_text(&self) -> Result<Option<String>, String> {
        string_field("body", self.body.as_ref())
    }

    pub fn user_text(&self) -> Result<Option<String>, String> {
        string_field("user", self.user.as_ref())
    }
}

/// Body of `POST /api/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub name: String,
}

fn string_field(name: &str, value: Option<&Value>) -> Result<Option<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(format!("'{}' must be a string", name)),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response of `GET /api/stats`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Channel served by this instance.
    pub channel: String,
    /// Open listen streams on that channel, on this instance.
    pub subscribers: usize,
    /// Channels with at least one local subscriber.
    pub active_channels: Vec<String>,
}
