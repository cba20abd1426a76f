//! # Domain Errors
//!
//! Client-facing error taxonomy. Malformed inbound traffic has no variant
//! here: it is logged and dropped inside the session and never reaches a
//! caller.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced to callers and to the status channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Address is not a well-formed `ws://` / `wss://` URL.
    #[error("Invalid socket address '{address}': {reason}")]
    InvalidAddress {
        /// Address as supplied
        address: String,
        /// What was wrong with it
        reason: String,
    },

    /// Transport failed to open or failed underneath an open connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request attempted before the session reached Identified.
    #[error("WebSocket not connected")]
    NotReady,

    /// Connection closed while the request was still pending.
    #[error("Connection closed before {request_type} completed")]
    Disconnected {
        /// Request type of the abandoned request
        request_type: String,
    },

    /// No response within the request timeout.
    #[error("Request timeout: {request_type} after {timeout:?}")]
    RequestTimeout {
        /// Request type that timed out
        request_type: String,
        /// Bound that was exceeded
        timeout: Duration,
    },

    /// Response arrived with a failure status.
    #[error("{request_type} failed: {code} {}", comment.as_deref().unwrap_or(""))]
    RequestFailed {
        /// Request type that failed
        request_type: String,
        /// Server status code
        code: i64,
        /// Server comment, if any
        comment: Option<String>,
    },

    /// Payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether a UI-level retry may succeed.
    ///
    /// Server rejections and malformed input never become valid by retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::Connection(_)
                | ClientError::Disconnected { .. }
                | ClientError::RequestTimeout { .. }
        )
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}
