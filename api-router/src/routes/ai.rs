use ai_gateway::{sanitize, AiProvider, GenerateOpts, ReasoningEffort};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub provider: AiProvider,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub reasoning_effort: ReasoningEffort,
    #[serde(default)]
    pub schema: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub response: String,
}

/// `POST /api/ai/generate` (§6). Dispatches to `generate_structured` when
/// the caller supplies a `schema`, serializing the structured result back
/// to a JSON string for `response`; otherwise falls through to plain
/// `generate_text`.
pub async fn generate(
    State(state): State<ApiState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let mut opts = GenerateOpts {
        provider: request.provider,
        reasoning_effort: request.reasoning_effort,
        timeout: state.provider_timeout,
        ..GenerateOpts::default()
    };
    if let Some(model) = request.model {
        opts = opts.with_model(model);
    }

    let response = match request.schema {
        Some(schema) => {
            let value = state
                .gateway
                .generate_structured(&request.prompt, schema, &opts)
                .await?;
            serde_json::to_string(&value)
                .map_err(|e| ApiError::from(common::error::AppError::InternalError(e.to_string())))?
        }
        None => {
            state
                .gateway
                .generate_text(&request.prompt, &request.system, &opts)
                .await?
        }
    };

    Ok(Json(GenerateResponse { success: true, response }))
}

#[derive(Debug, Deserialize)]
pub struct SanitizeRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SanitizeResponse {
    pub result: String,
}

/// `POST /api/ai/sanitize` (§6), exposing the bracket-balancing pass
/// `DefaultAiGateway` runs internally before a structured retry.
pub async fn sanitize_text(Json(request): Json<SanitizeRequest>) -> Json<SanitizeResponse> {
    Json(SanitizeResponse {
        result: sanitize(&request.text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_accepts_an_optional_schema() {
        let with_schema: GenerateRequest =
            serde_json::from_str(r#"{"prompt":"hi","schema":{"type":"object"}}"#).unwrap();
        assert!(with_schema.schema.is_some());

        let without_schema: GenerateRequest = serde_json::from_str(r#"{"prompt":"hi"}"#).unwrap();
        assert!(without_schema.schema.is_none());
    }

    #[test]
    fn generate_response_wire_shape_matches_contract() {
        let json = serde_json::to_value(GenerateResponse { success: true, response: "ok".into() }).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["response"], "ok");
    }

    #[test]
    fn sanitize_response_uses_result_field() {
        let json = serde_json::to_value(SanitizeResponse { result: "clean".into() }).unwrap();
        assert_eq!(json["result"], "clean");
    }
}
