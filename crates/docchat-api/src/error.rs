//! API error types and JSON error response formatting.
//!
//! Every failure is rendered as `{"detail": <message>}` with the status code
//! of its variant.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use docchat_chat::ChatError;
use docchat_rag::RagError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - the expression could not be evaluated.
    BadRequest(String),
    /// 404 Not Found - unknown session.
    NotFound(String),
    /// 422 Unprocessable Entity - malformed or incomplete request body.
    UnprocessableEntity(String),
    /// 500 Internal Server Error - ingestion or retrieval failed.
    Internal(String),
    /// 504 Gateway Timeout - retrieval did not finish in time.
    GatewayTimeout(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::UnprocessableEntity(msg)
            | ApiError::Internal(msg)
            | ApiError::GatewayTimeout(msg) => msg,
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), detail = %detail, "Request failed");
        }

        (status, Json(ErrorBody { detail })).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match &err {
            ChatError::Evaluation { .. } => ApiError::BadRequest(err.to_string()),
            ChatError::SessionNotFound(_) => ApiError::NotFound(err.to_string()),
            ChatError::Retrieval(_) => ApiError::Internal(err.to_string()),
            ChatError::Timeout(_) => ApiError::GatewayTimeout(err.to_string()),
        }
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
