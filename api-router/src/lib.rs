use api_state::ApiState;
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use routes::{
    ai::{generate, sanitize_text},
    curator::trigger_curator,
    memory::submit_memory,
    search::{basic_search_handler, rewritten_search_handler},
    sse::signal_log_stream,
};

pub mod api_state;
pub mod error;
mod routes;

/// Router for API functionality, version 1 (§6). Every route is
/// unauthenticated: the service is meant to sit behind a private
/// network boundary rather than gate callers itself.
pub fn api_routes_v1<S>(_app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    Router::new()
        .route("/api/memory", post(submit_memory))
        .route("/api/search", get(basic_search_handler))
        .route("/api/search/rewritten", post(rewritten_search_handler))
        .route("/api/ai/generate", post(generate))
        .route("/api/ai/sanitize", post(sanitize_text))
        .route("/api/sse/logs", get(signal_log_stream))
        .route("/trigger-curator", post(trigger_curator))
}
