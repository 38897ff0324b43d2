use axum::extract::State;
use axum::http::StatusCode;
use curator::schedule::trigger_once;

use crate::api_state::ApiState;

/// `POST /trigger-curator` (§6). Spawns a single out-of-band curator
/// pass and returns immediately so the caller is never blocked on the
/// batch's full `curator_deadline`.
pub async fn trigger_curator(State(state): State<ApiState>) -> StatusCode {
    tokio::spawn(trigger_once(
        state.curator_deadline,
        state.similarity_threshold,
        state.curator_limits,
        state.db.clone(),
        state.gateway.clone(),
        state.signal_log.clone(),
    ));

    StatusCode::ACCEPTED
}
