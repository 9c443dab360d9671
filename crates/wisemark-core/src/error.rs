//! Error types for wisemark.

use thiserror::Error;

/// Result type alias using wisemark's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for wisemark operations.
///
/// Every variant except the infrastructure ones (`Database`, `Io`, `Internal`,
/// `Config`, `Serialization`) describes a request the caller can fix; none of
/// them are retried internally.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Referenced lens/document/highlight/project is absent or not visible to the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input; the request is rejected without mutation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Ownership violation, e.g. mutating a system lens
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The caller already owns the maximum number of lenses
    #[error("Quota exceeded: at most {limit} custom lenses per user")]
    QuotaExceeded { limit: usize },

    /// The lens already holds the maximum number of palette entries
    #[error("Capacity exceeded: at most {limit} colours per lens")]
    CapacityExceeded { limit: usize },

    /// Name collides with an existing resource of the same owner
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// Palette entry key already exists in the lens
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Resource is still referenced and cannot be deleted
    #[error("In use: {0}")]
    InUse(String),

    /// Missing or unknown credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Machine-readable error kind, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Database(_) => "database_error",
            Error::NotFound(_) => "not_found",
            Error::Validation(_) => "validation_error",
            Error::Forbidden(_) => "forbidden",
            Error::QuotaExceeded { .. } => "quota_exceeded",
            Error::CapacityExceeded { .. } => "capacity_exceeded",
            Error::DuplicateName(_) => "duplicate_name",
            Error::DuplicateKey(_) => "duplicate_key",
            Error::InUse(_) => "in_use",
            Error::Unauthorized(_) => "unauthorized",
            Error::Config(_) => "configuration_error",
            Error::Serialization(_) => "serialization_error",
            Error::Internal(_) => "internal_error",
            Error::Io(_) => "io_error",
        }
    }

    /// True for errors caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Error::Database(_)
                | Error::Config(_)
                | Error::Serialization(_)
                | Error::Internal(_)
                | Error::Io(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("lens 42".to_string());
        assert_eq!(err.to_string(), "Not found: lens 42");
    }

    #[test]
    fn test_error_display_quota_exceeded() {
        let err = Error::QuotaExceeded { limit: 3 };
        assert_eq!(
            err.to_string(),
            "Quota exceeded: at most 3 custom lenses per user"
        );
    }

    #[test]
    fn test_error_display_capacity_exceeded() {
        let err = Error::CapacityExceeded { limit: 5 };
        assert_eq!(err.to_string(), "Capacity exceeded: at most 5 colours per lens");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::Validation("x".into()).kind(), "validation_error");
        assert_eq!(Error::Forbidden("x".into()).kind(), "forbidden");
        assert_eq!(Error::QuotaExceeded { limit: 3 }.kind(), "quota_exceeded");
        assert_eq!(
            Error::CapacityExceeded { limit: 5 }.kind(),
            "capacity_exceeded"
        );
        assert_eq!(Error::DuplicateName("x".into()).kind(), "duplicate_name");
        assert_eq!(Error::DuplicateKey("x".into()).kind(), "duplicate_key");
        assert_eq!(Error::NotFound("x".into()).kind(), "not_found");
        assert_eq!(Error::InUse("x".into()).kind(), "in_use");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::Validation("bad hex".into()).is_client_error());
        assert!(Error::InUse("lens".into()).is_client_error());
        assert!(!Error::Internal("boom".into()).is_client_error());
        assert!(!Error::Database(sqlx::Error::RowNotFound).is_client_error());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error:"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
