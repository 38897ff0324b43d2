use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::error::AppError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize, Clone)]
pub enum ApiError {
    #[error("Internal server error")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream AI provider unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Upstream AI provider error: {0}")]
    BadGateway(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(msg) => Self::NotFound(msg),
            AppError::InvalidInput(msg) | AppError::Validation(msg) => Self::ValidationError(msg),
            AppError::TransientBackend(msg) => Self::ServiceUnavailable(msg),
            AppError::PermanentBackend(msg) | AppError::StructuredGeneration(msg) => {
                Self::BadGateway(msg)
            }
            other => {
                tracing::error!(error = %other, "internal error");
                Self::InternalError("internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::InternalError(message) => (StatusCode::INTERNAL_SERVER_ERROR, message.clone()),
            Self::ValidationError(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            Self::ServiceUnavailable(message) => (StatusCode::SERVICE_UNAVAILABLE, message.clone()),
            Self::BadGateway(message) => (StatusCode::BAD_GATEWAY, message.clone()),
        };

        (status, Json(ErrorResponse { error: message, status: "error".to_string() })).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::from(AppError::NotFound("missing".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_input_maps_to_400() {
        let err = ApiError::from(AppError::InvalidInput("bad input".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn transient_backend_maps_to_503() {
        let err = ApiError::from(AppError::TransientBackend("timeout".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn internal_error_hides_message() {
        let err = ApiError::from(AppError::InternalError("leaked detail".into()));
        assert_eq!(err.to_string(), "Internal server error: internal server error");
    }
}
