//! Axum router configuration for chat endpoints.

use axum::http::{header, HeaderValue, Method};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, ServerConfig};

use super::handlers::{
    health, index, listen, login, logout, method_not_allowed, send_message, stats,
};
use super::state::ChatAppState;

/// Request/response routes.
///
/// # Routes
/// - `GET /` - Landing page
/// - `GET /health` - Liveness probe
/// - `POST /api/login`, `POST /api/logout` - Name cookie
/// - `POST /api/send` (alias `/send`) - Publish a message
/// - `GET /api/stats` - Subscriber counts
pub fn chat_routes() -> Router<ChatAppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/login", post(login).fallback(method_not_allowed))
        .route("/api/logout", post(logout).fallback(method_not_allowed))
        .route("/api/send", post(send_message).fallback(method_not_allowed))
        .route("/send", post(send_message).fallback(method_not_allowed))
        .route("/api/stats", get(stats))
}

/// Long-lived streaming routes. Kept apart so request timeouts never
/// apply to them.
///
/// # Routes
/// - `GET /api/listen` (alias `/listen`) - NDJSON message stream
pub fn stream_routes() -> Router<ChatAppState> {
    Router::new()
        .route("/api/listen", get(listen))
        .route("/listen", get(listen))
}

/// Combined router without middleware.
pub fn chat_router() -> Router<ChatAppState> {
    chat_routes().merge(stream_routes())
}

/// Complete application with middleware applied from `config`.
///
/// # Example
///
/// ```ignore
/// let app = app(ChatAppState::local(bus), &config);
/// axum::serve(listener, app).await?;
/// ```
pub fn app(state: ChatAppState, config: &AppConfig) -> Router {
    let mut router = chat_routes()
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .merge(stream_routes());

    if config.features.enable_tracing {
        router = router.layer(TraceLayer::new_for_http());
    }

    if let Some(cors) = cors_layer(&config.server) {
        router = router.layer(cors);
    }

    router.with_state(state)
}

/// CORS for the configured origins; `None` when none are configured.
fn cors_layer(server: &ServerConfig) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
    )
}
