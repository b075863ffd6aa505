//! Error types for Chatline
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Chatline operations
///
/// Store operations return this type directly so callers can tell a stale
/// reference (`NotFound`) from a concurrent-stream rejection (`Conflict`).
/// Application plumbing wraps it in [`Result`].
#[derive(Error, Debug)]
pub enum ChatlineError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A referenced conversation or message does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up ("conversation", "message")
        entity: &'static str,
        /// The identifier that failed to resolve
        id: String,
    },

    /// An assistant message is already being streamed into the conversation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Network failure talking to the backend
    #[error("Transport error: {0}")]
    Transport(String),

    /// Backend answered with a non-success HTTP status
    #[error("Backend returned HTTP {status}: {message}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Message extracted from the error envelope, or the raw body
        message: String,
    },

    /// A single stream event could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Persisted state could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ChatlineError {
    /// Builds a `NotFound` for a conversation id
    pub fn conversation_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "conversation",
            id: id.into(),
        }
    }

    /// Builds a `NotFound` for a message id
    pub fn message_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "message",
            id: id.into(),
        }
    }

    /// Returns true for stale-reference errors
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true when a concurrent stream was rejected
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Result type alias for Chatline operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

/// Result type returned by [`crate::conversation::ConversationStore`] operations
pub type StoreResult<T> = std::result::Result<T, ChatlineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = ChatlineError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_not_found_display_names_entity() {
        let error = ChatlineError::conversation_not_found("abc");
        assert_eq!(error.to_string(), "conversation not found: abc");
        assert!(error.is_not_found());
        assert!(!error.is_conflict());

        let error = ChatlineError::message_not_found("m-1");
        assert_eq!(error.to_string(), "message not found: m-1");
    }

    #[test]
    fn test_conflict_display() {
        let error = ChatlineError::Conflict("stream already active".to_string());
        assert_eq!(error.to_string(), "Conflict: stream already active");
        assert!(error.is_conflict());
    }

    #[test]
    fn test_http_status_display() {
        let error = ChatlineError::HttpStatus {
            status: 503,
            message: "model not loaded".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Backend returned HTTP 503: model not loaded"
        );
    }

    #[test]
    fn test_storage_error_display() {
        let error = ChatlineError::Storage("database connection failed".to_string());
        assert_eq!(
            error.to_string(),
            "Storage error: database connection failed"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ChatlineError = io_error.into();
        assert!(matches!(error, ChatlineError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: ChatlineError = json_error.into();
        assert!(matches!(error, ChatlineError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: ChatlineError = yaml_error.into();
        assert!(matches!(error, ChatlineError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ChatlineError>();
    }

    #[test]
    fn test_not_found_survives_anyhow_downcast() {
        let err: anyhow::Error = ChatlineError::conversation_not_found("x").into();
        let inner = err.downcast_ref::<ChatlineError>().expect("downcast");
        assert!(inner.is_not_found());
    }
}
