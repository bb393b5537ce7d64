//! Error types for the InsightFlow feedback service
//!
//! This module provides the library-wide error enum using thiserror for
//! structured error definitions. The HTTP layer maps these onto status codes
//! in [`crate::api::error`].

use thiserror::Error;

/// Main error type for InsightFlow operations
#[derive(Error, Debug)]
pub enum InsightError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Error raised by the libSQL driver
    #[error("Database error: {0}")]
    Libsql(#[from] libsql::Error),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Request data failed validation
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Resource already exists (e.g., duplicate email on signup)
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Password hashing or verification failed
    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for InsightFlow operations
pub type Result<T> = std::result::Result<T, InsightError>;

/// Convert anyhow::Error to InsightError
impl From<anyhow::Error> for InsightError {
    fn from(err: anyhow::Error) -> Self {
        InsightError::Other(err.to_string())
    }
}

impl From<tokio::task::JoinError> for InsightError {
    fn from(err: tokio::task::JoinError) -> Self {
        InsightError::Other(format!("Background task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InsightError::NotFound("feedback 42".to_string());
        assert_eq!(err.to_string(), "Not found: feedback 42");

        let err = InsightError::AlreadyExists("a@b.co".to_string());
        assert_eq!(err.to_string(), "Resource already exists: a@b.co");
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json");
        assert!(json_err.is_err());

        let err: InsightError = json_err.unwrap_err().into();
        assert!(matches!(err, InsightError::Serialization(_)));

        let err: InsightError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, InsightError::Other(ref m) if m == "boom"));
    }
}
