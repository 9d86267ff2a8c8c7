//! Data source error types

use thiserror::Error;

/// Errors raised by [`DataSource`](super::DataSource) implementations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataSourceError {
    #[error("Unknown object: {0}")]
    NotFound(String),

    #[error("Record not found: {object}/{id}")]
    RecordNotFound { object: String, id: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timeout error: operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Backend error{}: {message}", status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Backend {
        status: Option<u16>,
        message: String,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type for data source operations
pub type DataSourceResult<T> = Result<T, DataSourceError>;

impl DataSourceError {
    /// Create a backend error without an HTTP-style status
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        Self::Backend {
            status: None,
            message: msg.into(),
        }
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an invalid data error
    pub fn invalid_data<S: Into<String>>(msg: S) -> Self {
        Self::InvalidData(msg.into())
    }

    pub fn record_not_found(object: impl Into<String>, id: impl Into<String>) -> Self {
        Self::RecordNotFound {
            object: object.into(),
            id: id.into(),
        }
    }

    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => true,
            Self::Backend {
                status: Some(status),
                ..
            } => *status >= 500,
            _ => false,
        }
    }

    /// Check if the error means the object or record does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::RecordNotFound { .. })
    }
}

impl From<serde_json::Error> for DataSourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidData(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(DataSourceError::transport("reset").is_retryable());
        assert!(DataSourceError::Timeout { duration_ms: 10 }.is_retryable());
        assert!(DataSourceError::Backend {
            status: Some(503),
            message: "busy".into()
        }
        .is_retryable());
        assert!(!DataSourceError::Backend {
            status: Some(400),
            message: "bad".into()
        }
        .is_retryable());
        assert!(!DataSourceError::NotFound("x".into()).is_retryable());
    }

    #[test]
    fn test_display_includes_status() {
        let err = DataSourceError::Backend {
            status: Some(500),
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "Backend error (500): boom");
        assert_eq!(DataSourceError::backend("boom").to_string(), "Backend error: boom");
    }

    #[test]
    fn test_not_found_classification() {
        assert!(DataSourceError::record_not_found("orders", "1").is_not_found());
        assert!(DataSourceError::NotFound("orders".into()).is_not_found());
        assert!(!DataSourceError::transport("x").is_not_found());
    }
}
