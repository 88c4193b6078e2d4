//! Error types for Chatsweep
//!
//! This module defines all error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Chatsweep operations
///
/// Covers the bridge failure taxonomy (authentication, remote status,
/// timeout, delivery, missing target context) as well as the local
/// configuration and storage concerns.
#[derive(Error, Debug)]
pub enum SweepError {
    /// No credential could be obtained, or the session fetch failed
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A remote call returned a non-success status or the privileged
    /// context reported a failure.
    ///
    /// Displays the bare message so it can be recorded verbatim as a
    /// batch failure reason.
    #[error("{message}")]
    RemoteOperation {
        /// HTTP status code, when the failure originated from one
        status: Option<u16>,
        /// Human-readable failure message
        message: String,
    },

    /// No response arrived before the per-request deadline
    #[error("Request timeout: {request_type} (id={request_id})")]
    RequestTimeout {
        /// Wire name of the request type
        request_type: String,
        /// Correlation id of the request that timed out
        request_id: String,
    },

    /// The delivery channel to the privileged context failed
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// No privileged context hosting the target origin is attached
    #[error("No target context found for {0}. Please open a session first.")]
    NoTargetContext(String),

    /// A batch was started while another one is still running
    #[error("A batch operation is already running")]
    BatchInProgress,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persistent storage errors
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

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SweepError {
    /// Build a [`SweepError::RemoteOperation`] from an HTTP status.
    pub fn remote_status(status: u16, message: impl Into<String>) -> Self {
        Self::RemoteOperation {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Build a [`SweepError::RemoteOperation`] without a status code.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteOperation {
            status: None,
            message: message.into(),
        }
    }
}

/// Result type alias for Chatsweep operations
///
/// Uses `anyhow::Error` so errors can carry context while still wrapping a
/// [`SweepError`] that callers can recover with `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
