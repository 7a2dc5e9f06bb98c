use crate::domain::booking::BookingStatus;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("transition from {from} to {to} is not allowed")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("actor has no rights over this booking")]
    Unauthorized,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("upstream timeout: {0}")]
    UpstreamTimeout(String),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("storage error: {0}")]
    Store(#[from] anyhow::Error),
}

impl CoreError {
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::InvalidInput(_) => "INVALID_INPUT",
            CoreError::InvalidTransition { .. } => "INVALID_TRANSITION",
            CoreError::InvalidState(_) => "INVALID_STATE",
            CoreError::Unauthorized => "UNAUTHORIZED",
            CoreError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            CoreError::UpstreamTimeout(_) => "UPSTREAM_TIMEOUT",
            CoreError::Gateway(_) => "GATEWAY_ERROR",
            CoreError::Store(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::InvalidInput(_)
            | CoreError::InvalidTransition { .. }
            | CoreError::InvalidState(_)
            | CoreError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            CoreError::Unauthorized => StatusCode::FORBIDDEN,
            CoreError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CoreError::Gateway(_) => StatusCode::BAD_GATEWAY,
            CoreError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        let body = ErrorEnvelope {
            error: ErrorPayload {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };
        (status, axum::Json(body)).into_response()
    }
}
