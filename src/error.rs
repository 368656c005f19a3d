//! Service error type and the JSON error envelope.
//!
//! Every failed request is answered with `{"code": <status>, "message": <text>}`
//! where `code` mirrors the HTTP status.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::AudioError;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// A required field is missing or a value is not acceptable
    #[error("{0}")]
    Validation(String),

    /// The addressed record does not exist
    #[error("{0}")]
    NotFound(String),

    /// Storage, decode or filesystem failure
    #[error("{0}")]
    Unavailable(String),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::Unavailable(format!("{:#}", err))
    }
}

impl From<AudioError> for ServiceError {
    fn from(err: AudioError) -> Self {
        ServiceError::Unavailable(err.to_string())
    }
}

/// JSON error response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected ({}): {}", status.as_u16(), self);
        }

        let body = ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
