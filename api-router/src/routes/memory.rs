use axum::{extract::State, http::StatusCode, Json};
use common::queue::QueueEnvelope;
use serde::{Deserialize, Serialize};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct SubmitMemoryRequest {
    pub text: String,
    #[serde(default)]
    pub context_tags: Vec<String>,
    #[serde(default)]
    pub source_app: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitMemoryResponse {
    pub success: bool,
    pub status: &'static str,
}

/// `POST /api/memory` (§6). Hands the envelope to the ingestion front
/// door and returns as soon as it is queued, without waiting on
/// embedding or storage.
pub async fn submit_memory(
    State(state): State<ApiState>,
    Json(request): Json<SubmitMemoryRequest>,
) -> Result<(StatusCode, Json<SubmitMemoryResponse>), ApiError> {
    let envelope = QueueEnvelope::new(
        request.text,
        request.context_tags,
        request.source_app,
        request.session_id,
    );
    state.front_door.submit(envelope).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitMemoryResponse { success: true, status: "queued" }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_memory_response_wire_shape_matches_contract() {
        let json = serde_json::to_value(SubmitMemoryResponse { success: true, status: "queued" }).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["status"], "queued");
    }
}
