//! API error type and the JSON response envelope.
//!
//! Every response body is either `{"success": true, "data": ...}` or
//! `{"success": false, "error": {"code": "...", "message": "..."}}`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use grn_core::{RepoError, ServiceError};
use serde::Serialize;

/// Stable, machine-readable error codes. Clients match on these, never on
/// the message text.
pub mod error_code {
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const CONFLICT: &str = "CONFLICT";
    pub const INTERNAL: &str = "INTERNAL";
}

const INTERNAL_MESSAGE: &str = "internal server error";

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// Malformed or invalid input. HTTP 400.
    Validation(String),
    /// Missing, malformed or expired bearer token. HTTP 401.
    Unauthenticated(String),
    /// Authenticated but not allowed for this shop or action. HTTP 403.
    PermissionDenied(String),
    /// HTTP 404.
    NotFound(String),
    /// Request conflicts with stored state. HTTP 409.
    Conflict(String),
    /// Unexpected failure. The detail is logged, never returned. HTTP 500.
    Internal(String),
}

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => error_code::VALIDATION_FAILED,
            Self::Unauthenticated(_) => error_code::UNAUTHENTICATED,
            Self::PermissionDenied(_) => error_code::PERMISSION_DENIED,
            Self::NotFound(_) => error_code::NOT_FOUND,
            Self::Conflict(_) => error_code::CONFLICT,
            Self::Internal(_) => error_code::INTERNAL,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the client.
    pub fn public_message(&self) -> &str {
        match self {
            Self::Validation(message)
            | Self::Unauthenticated(message)
            | Self::PermissionDenied(message)
            | Self::NotFound(message)
            | Self::Conflict(message) => message,
            Self::Internal(_) => INTERNAL_MESSAGE,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Internal(detail) => write!(f, "{INTERNAL_MESSAGE}: {detail}"),
            other => write!(f, "{}", other.public_message()),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    message: &'a str,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    success: bool,
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct DataEnvelope<T> {
    success: bool,
    data: T,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            log::error!(
                "event=api_error module=api status=error error_code={} error={}",
                self.error_code(),
                grn_core::logging::sanitize_message(detail, 300)
            );
        }
        let body = ErrorEnvelope {
            success: false,
            error: ErrorBody {
                code: self.error_code(),
                message: self.public_message(),
            },
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// `200 OK` with the success envelope.
pub fn ok<T: Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        Json(DataEnvelope {
            success: true,
            data,
        }),
    )
        .into_response()
}

/// `201 Created` with the success envelope.
pub fn created<T: Serialize>(data: T) -> Response {
    (
        StatusCode::CREATED,
        Json(DataEnvelope {
            success: true,
            data,
        }),
    )
        .into_response()
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Validation(err) => Self::Validation(err.to_string()),
            ServiceError::NotFound { entity, id } => Self::NotFound(format!("{entity} {id} not found")),
            ServiceError::Conflict(message) => Self::Conflict(message),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        ServiceError::from(value).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::Validation(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        Self::Validation(value.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(value: PathRejection) -> Self {
        Self::Validation(value.body_text())
    }
}
