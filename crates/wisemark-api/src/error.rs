//! HTTP error mapping.
//!
//! Every failure leaves the server as `{"error": <message>, "kind": <kind>}`
//! where `kind` is the machine-readable [`Error::kind`] of the domain error.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use wisemark_core::Error;

#[derive(Debug)]
pub enum ApiError {
    /// A domain error from the core or database layer.
    Domain(Error),
    /// The request could not be decoded (malformed JSON, bad path segment).
    BadRequest(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// HTTP status for a domain error.
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        Error::Forbidden(_) => StatusCode::FORBIDDEN,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::DuplicateName(_) | Error::DuplicateKey(_) | Error::InUse(_) => StatusCode::CONFLICT,
        Error::QuotaExceeded { .. } | Error::CapacityExceeded { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Error::Database(_)
        | Error::Config(_)
        | Error::Serialization(_)
        | Error::Internal(_)
        | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(err) => status_for(err),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Domain(err) => err.kind(),
            ApiError::BadRequest(_) => "validation_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        let message = match self {
            ApiError::Domain(err) if status.is_server_error() => {
                error!(subsystem = "api", error_kind = kind, error_msg = %err, "Request failed");
                // Store details stay in the log.
                match err {
                    Error::Database(_) => "Internal server error".to_string(),
                    other => other.to_string(),
                }
            }
            ApiError::Domain(err) => {
                warn!(subsystem = "api", error_kind = kind, error_msg = %err, "Request rejected");
                domain_message(err)
            }
            ApiError::BadRequest(msg) => msg,
        };

        let body = Json(serde_json::json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

/// Human message without the variant prefix from `Display`.
fn domain_message(err: Error) -> String {
    match err {
        Error::NotFound(msg)
        | Error::Validation(msg)
        | Error::Forbidden(msg)
        | Error::DuplicateName(msg)
        | Error::DuplicateKey(msg)
        | Error::InUse(msg)
        | Error::Unauthorized(msg) => msg,
        other => other.to_string(),
    }
}
