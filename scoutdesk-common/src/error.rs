//! Common error types for scoutdesk

use thiserror::Error;

/// Common result type for scoutdesk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds shared by every service
#[derive(Error, Debug)]
pub enum Error {
    /// Unknown or inactive user, or insufficient access level
    #[error("Not authorized: {0}")]
    Auth(String),

    /// Field out of range, enumeration mismatch, id/custom-name violation
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Referenced entity absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate of an existing row (e.g. shortlist entry)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable kind name reported alongside the message
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Auth(_) => "AuthError",
            Error::Validation(_) => "ValidationError",
            Error::NotFound(_) => "NotFoundError",
            Error::Conflict(_) => "ConflictError",
            Error::Storage(_) => "StorageError",
            Error::Io(_) => "IoError",
            Error::Config(_) => "ConfigError",
            Error::Internal(_) => "InternalError",
        }
    }

    /// Map a driver error raised by a write, turning unique-constraint
    /// violations into `Conflict`.
    pub fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Error::Conflict(format!("{} already exists", what));
            }
        }
        Error::Storage(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(Error::Auth("x".into()).kind(), "AuthError");
        assert_eq!(Error::Validation("x".into()).kind(), "ValidationError");
        assert_eq!(Error::NotFound("x".into()).kind(), "NotFoundError");
        assert_eq!(Error::Conflict("x".into()).kind(), "ConflictError");
        assert_eq!(Error::Storage(sqlx::Error::RowNotFound).kind(), "StorageError");
    }

    #[test]
    fn test_from_write_passes_through_non_unique_errors() {
        let err = Error::from_write(sqlx::Error::RowNotFound, "entry");
        assert!(matches!(err, Error::Storage(_)));
    }
}
