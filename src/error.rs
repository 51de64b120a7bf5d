//! HTTP-facing error type.
//!
//! Every error response is a JSON object with at least an `error` field.
//! Server errors add an optional `detail` and the `requestId` of the request
//! that produced them so the response can be joined with server logs.

use axum::{
    Json,
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::api::middleware::correlation;
use crate::infrastructure::persistence::PoolError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    /// No valid principal.
    #[error("Unauthorized")]
    Unauthorized,

    /// Valid principal with insufficient role.
    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("{message}")]
    Internal {
        message: String,
        detail: Option<String>,
    },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>, detail: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            detail,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            AppError::Internal { message, detail } => {
                let request_id = correlation::current().map(|id| id.to_string());
                tracing::error!(
                    request_id = request_id.as_deref().unwrap_or("-"),
                    detail = detail.as_deref().unwrap_or("-"),
                    "{message}"
                );
                ErrorBody {
                    error: message,
                    detail,
                    request_id,
                }
            }
            other => ErrorBody {
                error: other.to_string(),
                detail: None,
                request_id: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<PoolError> for AppError {
    fn from(e: PoolError) -> Self {
        AppError::internal("Database error", Some(e.to_string()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        if rejection.status().is_server_error() {
            AppError::internal("Path extraction failed", Some(rejection.body_text()))
        } else {
            AppError::bad_request(rejection.body_text())
        }
    }
}
