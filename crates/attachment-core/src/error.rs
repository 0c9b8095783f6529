//! Error types for the attachment search library.
//!
//! Storage failures are kept as their own variant so callers can tell an
//! engine error apart from "no rows found" (which is `Ok(None)` or an empty
//! result everywhere in this crate).

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for attachment indexing and search.
#[derive(Debug, Error)]
pub enum AttachmentSearchError {
    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Host data API / transport errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Text extraction failed for {resource_id}: {message}")]
    Extraction {
        resource_id: String,
        message: String,
    },

    #[error("Host error: {message}")]
    Host { message: String },

    // Request validation
    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for attachment search operations.
pub type Result<T> = std::result::Result<T, AttachmentSearchError>;

impl From<std::io::Error> for AttachmentSearchError {
    fn from(err: std::io::Error) -> Self {
        AttachmentSearchError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for AttachmentSearchError {
    fn from(err: serde_json::Error) -> Self {
        AttachmentSearchError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for AttachmentSearchError {
    fn from(err: rusqlite::Error) -> Self {
        AttachmentSearchError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for AttachmentSearchError {
    fn from(err: reqwest::Error) -> Self {
        AttachmentSearchError::Network {
            message: err.to_string(),
            status_code: err.status().map(|s| s.as_u16()),
        }
    }
}

impl From<url::ParseError> for AttachmentSearchError {
    fn from(err: url::ParseError) -> Self {
        AttachmentSearchError::Config {
            message: format!("Invalid URL: {}", err),
        }
    }
}

impl AttachmentSearchError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        AttachmentSearchError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create an extraction error for a resource.
    pub fn extraction(resource_id: impl Into<String>, message: impl Into<String>) -> Self {
        AttachmentSearchError::Extraction {
            resource_id: resource_id.into(),
            message: message.into(),
        }
    }

    /// Error returned when the shared connection mutex is poisoned.
    pub(crate) fn lock_poisoned() -> Self {
        AttachmentSearchError::Database {
            message: "Failed to acquire connection lock".to_string(),
            source: None,
        }
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// Custom codes (application-defined, -32000 to -32099):
    /// - -32000: Host/network error
    /// - -32001: Storage error
    /// - -32002: Extraction error
    /// - -32602: Invalid params
    /// - -32603: Internal error
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            AttachmentSearchError::Network { .. } | AttachmentSearchError::Host { .. } => -32000,
            AttachmentSearchError::Database { .. } => -32001,
            AttachmentSearchError::Extraction { .. } => -32002,
            AttachmentSearchError::InvalidParams { .. } => -32602,
            _ => -32603,
        }
    }

    /// Whether this error came from the storage engine.
    pub fn is_storage(&self) -> bool {
        matches!(self, AttachmentSearchError::Database { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AttachmentSearchError::extraction("abc", "no pages");
        assert_eq!(err.to_string(), "Text extraction failed for abc: no pages");
    }

    #[test]
    fn test_rpc_error_codes() {
        let db: AttachmentSearchError = rusqlite::Error::InvalidQuery.into();
        assert_eq!(db.to_rpc_error_code(), -32001);
        assert!(db.is_storage());

        assert_eq!(
            AttachmentSearchError::InvalidParams {
                message: "query".into()
            }
            .to_rpc_error_code(),
            -32602
        );
        assert_eq!(AttachmentSearchError::Other("x".into()).to_rpc_error_code(), -32603);
    }

    #[test]
    fn test_io_error_is_not_storage() {
        let err: AttachmentSearchError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(!err.is_storage());
    }
}
