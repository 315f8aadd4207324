//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket quiz play at `/ws`
/// - question bank, quiz and score endpoints under `/api/v1/...`
/// - Static SPA from `server.static_dir` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = &state.config.server.static_dir;
    let static_service = ServeDir::new(static_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/identity", get(http::http_get_identity))
        .route(
            "/api/v1/questions/:category",
            get(http::http_get_questions).put(http::http_put_questions),
        )
        .route("/api/v1/quiz/:category", get(http::http_get_quiz))
        .route("/api/v1/scores", post(http::http_post_score).get(http::http_get_leaderboard))
        .route("/api/v1/scores/top", get(http::http_get_top_score))
        .route("/api/v1/categories", get(http::http_get_categories))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}
