//! HTTP error type and toolbox error mapping.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use devtools_toolbox::ToolboxError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Timeout(String),

    /// Message is already sanitized; details only go to the logs.
    #[error("{0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "VALIDATION_ERROR",
            Self::BadGateway(_) => "NETWORK_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            code: self.code(),
            message: self.to_string(),
        })
    }
}

/// Log the full error but return a generic message to the client.
pub fn sanitize_internal_error(error: impl std::fmt::Display, context: &str) -> ApiError {
    tracing::error!("{context} error: {error}");
    ApiError::Internal(format!(
        "{context} failed - check server logs for details"
    ))
}

pub fn map_toolbox_error(context: &str, error: ToolboxError) -> ApiError {
    match error {
        ToolboxError::ValidationError(message) => {
            tracing::debug!("{context} rejected: {message}");
            ApiError::BadRequest(message)
        }
        ToolboxError::NetworkError(message) => {
            tracing::warn!("{context} error: {message}");
            ApiError::BadGateway(message)
        }
        e @ (ToolboxError::Timeout(_) | ToolboxError::Cancelled) => {
            tracing::warn!("{context} error: {e}");
            ApiError::Timeout(e.to_string())
        }
        ToolboxError::Internal(message) => sanitize_internal_error(message, context),
    }
}
