//! Error types for Ferry

use std::time::Duration;
use thiserror::Error;

/// Result type alias
pub type FerryResult<T> = Result<T, FerryError>;

/// Main error type
#[derive(Error, Debug)]
pub enum FerryError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Unsupported format: {extension} extension of {path} is not supported")]
    UnsupportedFormat { extension: String, path: String },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Backend error ({provider}): {message}")]
    Backend { provider: String, message: String },

    #[error("Codec error ({extension}): {message}")]
    Codec { extension: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

impl FerryError {
    /// Wrap a native backend failure, keeping its message.
    pub fn backend(provider: impl Into<String>, error: impl std::fmt::Display) -> Self {
        FerryError::Backend {
            provider: provider.into(),
            message: error.to_string(),
        }
    }

    pub fn unsupported_format(extension: impl Into<String>, path: impl std::fmt::Display) -> Self {
        FerryError::UnsupportedFormat {
            extension: extension.into(),
            path: path.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, FerryError::Backend { .. } | FerryError::Timeout(_))
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            FerryError::NotFound(_) => true,
            FerryError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(FerryError::backend("s3", "connection reset").is_retryable());
        assert!(FerryError::Timeout(Duration::from_secs(5)).is_retryable());

        assert!(!FerryError::NotFound("file.txt".into()).is_retryable());
        assert!(!FerryError::InvalidPath("/etc".into()).is_retryable());
        assert!(!FerryError::unsupported_format(".pkl", "/app/model.pkl").is_retryable());
    }

    #[test]
    fn test_is_not_found() {
        assert!(FerryError::NotFound("a.csv".into()).is_not_found());
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(FerryError::from(io_err).is_not_found());
        assert!(!FerryError::backend("azure", "boom").is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = FerryError::NotFound("/app/data/x.csv".into());
        assert_eq!(format!("{}", err), "Path not found: /app/data/x.csv");

        let err = FerryError::unsupported_format(".pkl", "/app/model.pkl");
        assert_eq!(
            err.to_string(),
            "Unsupported format: .pkl extension of /app/model.pkl is not supported"
        );

        let err = FerryError::backend("s3", "AccessDenied");
        assert_eq!(err.to_string(), "Backend error (s3): AccessDenied");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: FerryError = io_err.into();
        assert!(matches!(err, FerryError::Io(_)));
    }
}
