//! Error types for Gemini Relay
//!
//! Every failure that reaches the HTTP boundary is an [`AppError`], which maps
//! to a status code and a structured JSON body with a `kind` and a `message`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid image attachment: {0}")]
    AttachmentDecode(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream did not answer within {0} seconds")]
    UpstreamTimeout(u64),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable error kind, also used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "auth_rejected",
            AppError::BadRequest(_) | AppError::JsonError(_) => "validation_error",
            AppError::AttachmentDecode(_) => "attachment_decode_error",
            AppError::UpstreamUnavailable(_) => "upstream_unavailable",
            AppError::UpstreamTimeout(_) => "upstream_timeout",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// HTTP status this error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) | AppError::JsonError(_) | AppError::AttachmentDecode(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the failure originated at the Gemini backend
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::UpstreamUnavailable(_) | AppError::UpstreamTimeout(_)
        )
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::UpstreamUnavailable(err.to_string())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(e) = &self {
            tracing::error!(kind = self.kind(), error = %e, "Internal error");
        }

        let (code, message) = match &self {
            AppError::Unauthorized => (
                "UNAUTHORIZED",
                "Missing or invalid credentials. Provide 'X-API-Key: <key>' or 'Authorization: Bearer <key>'"
                    .to_string(),
            ),
            AppError::BadRequest(msg) => ("BAD_REQUEST", msg.clone()),
            AppError::AttachmentDecode(msg) => ("ATTACHMENT_DECODE_ERROR", msg.clone()),
            AppError::UpstreamUnavailable(msg) => (
                "UPSTREAM_UNAVAILABLE",
                format!("Gemini backend request failed: {}", msg),
            ),
            AppError::UpstreamTimeout(_) => ("UPSTREAM_TIMEOUT", self.to_string()),
            AppError::JsonError(e) => ("INVALID_JSON", format!("Invalid JSON in request: {}", e)),
            AppError::Internal(_) => ("INTERNAL_ERROR", "Internal server error".to_string()),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                kind: self.kind().to_string(),
                code: code.to_string(),
                message,
            },
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
