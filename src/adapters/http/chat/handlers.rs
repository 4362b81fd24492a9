//! HTTP handlers for chat endpoints.
//!
//! These handlers connect Axum routes to the publish handler, the stream
//! session and the broadcast bus.

use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderName, StatusCode};
use axum::response::{Html, IntoResponse, Response};

use crate::application::handlers::{PostMessageCommand, StreamSession};
use crate::domain::chat::Author;
use crate::domain::stream::NDJSON_CONTENT_TYPE;
use crate::ports::Page;

use super::dto::{LoginRequest, SendMessageRequest, StatsResponse};
use super::error::ChatApiError;
use super::session::{sign_in_cookie, sign_out_cookie, SessionAuthor};
use super::sink::ChannelSink;
use super::state::ChatAppState;

/// Disables response buffering in nginx-style proxies.
const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

// ════════════════════════════════════════════════════════════════════════════════
// Pages
// ════════════════════════════════════════════════════════════════════════════════

/// GET / - Landing page
pub async fn index(
    State(state): State<ChatAppState>,
    SessionAuthor(viewer): SessionAuthor,
) -> Html<String> {
    Html(state.pages.render(Page::Index {
        viewer: viewer.as_ref(),
    }))
}

/// GET /health - Liveness probe
pub async fn health() -> &'static str {
    "ok"
}

// ════════════════════════════════════════════════════════════════════════════════
// Sign-in
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/login - Remember a display name in the name cookie
pub async fn login(body: Bytes) -> Result<impl IntoResponse, ChatApiError> {
    let request: LoginRequest = serde_json::from_slice(&body)
        .map_err(|_| ChatApiError::invalid_request("expected JSON {\"name\": string}"))?;
    let author = Author::new(&request.name)
        .map_err(|e| ChatApiError::invalid_request(e.to_string()))?;

    let cookie = sign_in_cookie(&author)
        .ok_or_else(|| ChatApiError::invalid_request("name cannot be stored in a cookie"))?;

    tracing::info!(author = %author, "Signed in");
    Ok(([cookie], "ok"))
}

/// POST /api/logout - Forget the display name
pub async fn logout() -> impl IntoResponse {
    ([sign_out_cookie()], "ok")
}

// ════════════════════════════════════════════════════════════════════════════════
// Publish
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/send - Publish a message to every listener
pub async fn send_message(
    State(state): State<ChatAppState>,
    SessionAuthor(session): SessionAuthor,
    body: Bytes,
) -> Result<impl IntoResponse, ChatApiError> {
    let request: SendMessageRequest = serde_json::from_slice(&body)
        .map_err(|_| ChatApiError::invalid_request("request body must be a JSON object"))?;

    let text = request.body_text().map_err(ChatApiError::InvalidRequest)?;

    let author = match session {
        Some(author) => Some(author.as_str().to_string()),
        None if state.trust_client_author => {
            request.user_text().map_err(ChatApiError::InvalidRequest)?
        }
        None => None,
    };

    let cmd = PostMessageCommand { author, body: text };
    state.post_message_handler().handle(cmd).await?;

    Ok("ok")
}

/// Fallback for publish routes called with the wrong method.
pub async fn method_not_allowed() -> ChatApiError {
    ChatApiError::MethodNotAllowed
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscribe
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/listen - Unbounded NDJSON stream of messages
///
/// Subscribes before returning so no message published after the response
/// head is missed. The stream itself is driven by a spawned session task.
pub async fn listen(State(state): State<ChatAppState>) -> Response {
    let subscription = state.bus.subscribe(&state.channel);
    let subscription_id = subscription.id();
    let (mut sink, body) = ChannelSink::with_body(state.outbound_buffer);
    let mut session = StreamSession::new(subscription, state.stream);

    tokio::spawn(async move {
        let reason = session.run(&mut sink).await;
        tracing::debug!(subscription_id = %subscription_id, reason = ?reason, "Listen stream ended");
    });

    tracing::info!(subscription_id = %subscription_id, channel = %state.channel, "Listener connected");

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, NDJSON_CONTENT_TYPE),
            (CACHE_CONTROL, "no-cache"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        body,
    )
        .into_response()
}

/// GET /api/stats - Subscriber counts on this instance
pub async fn stats(State(state): State<ChatAppState>) -> Json<StatsResponse> {
    let mut active_channels: Vec<String> = state
        .bus
        .active_channels()
        .into_iter()
        .map(String::from)
        .collect();
    active_channels.sort();

    Json(StatsResponse {
        channel: state.channel.to_string(),
        subscribers: state.bus.subscriber_count(&state.channel),
        active_channels,
    })
}
