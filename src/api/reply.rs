//! The value business handlers return.
//!
//! A [`Reply`] is a status code plus a JSON value. It is not serialized by the
//! handler: the value travels to the response normalizer as a typed response
//! extension, and the normalizer produces the bytes the client receives.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

/// JSON payload waiting for normalization.
#[derive(Debug, Clone)]
pub struct ReplyBody(pub Value);

/// Handler output: status and JSON body, nothing else.
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    body: Value,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self::with_status(StatusCode::OK, body)
    }

    pub fn with_status(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// Converts any serializable value into a `200 OK` reply.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the value cannot be represented as JSON.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, AppError> {
        Self::json_with_status(StatusCode::OK, value)
    }

    pub fn json_with_status<T: Serialize>(status: StatusCode, value: &T) -> Result<Self, AppError> {
        serde_json::to_value(value)
            .map(|body| Self::with_status(status, body))
            .map_err(|e| AppError::internal("Failed to serialize response", Some(e.to_string())))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let mut response = self.status.into_response();
        response.extensions_mut().insert(ReplyBody(self.body));
        response
    }
}
