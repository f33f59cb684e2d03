//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::appointment::AppointmentError;
use crate::pipeline::orchestrator::ChatError;
use crate::store::StoreError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    /// Work that was computed but not saved, returned so the client can
    /// retry the save.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsaved: Option<Value>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage unavailable: {message}")]
    StorageUnavailable {
        message: String,
        unsaved: Option<Value>,
    },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, unsaved) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail, None),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail, None),
            ApiError::StorageUnavailable { message, unsaved } => {
                tracing::error!(%message, "Storage unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORAGE_UNAVAILABLE",
                    "The request was processed but could not be saved. Please retry.".to_string(),
                    unsaved,
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                unsaved,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidSessionId(_) => ApiError::BadRequest(err.to_string()),
            StoreError::LockPoisoned => ApiError::Internal(err.to_string()),
            other => ApiError::StorageUnavailable {
                message: other.to_string(),
                unsaved: None,
            },
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation(detail) => ApiError::BadRequest(detail),
            ChatError::Persistence { outcome, source } => ApiError::StorageUnavailable {
                message: source.to_string(),
                unsaved: serde_json::to_value(&*outcome).ok(),
            },
            ChatError::Store(e) => e.into(),
        }
    }
}

impl From<AppointmentError> for ApiError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::Validation(detail) => ApiError::BadRequest(detail),
            AppointmentError::UnknownSpecialist(_) => ApiError::NotFound(err.to_string()),
            AppointmentError::Store(e) => e.into(),
        }
    }
}
