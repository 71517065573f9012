//! Domain-level error types for chat-export.
//!
//! All errors are typed with `thiserror` and carry the first actionable
//! cause for the end user. Structural conversion problems never appear
//! here: unmapped HTML degrades to plain text locally instead of failing.

use std::path::PathBuf;
use thiserror::Error;

/// Application-level errors surfaced to the CLI.
#[derive(Error, Debug)]
pub enum AppError {
    /// Capture file not found at the expected location.
    #[error("Capture file not found: {path}")]
    CaptureNotFound { path: PathBuf },

    /// A capture file could not be parsed into a conversation document.
    #[error("Invalid capture data: {message}")]
    InvalidCapture {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// No usable message content remained after filtering.
    #[error("No exportable content: {message}")]
    ExtractionEmpty { message: String },

    /// Every conversation in an `all`/`selected` scope failed.
    #[error("No conversation could be processed ({total} attempted): {first_reason}")]
    NoneProcessed { total: usize, first_reason: String },

    /// A remote delivery call failed; the provider message is kept verbatim.
    #[error("Remote target failure: {message}")]
    RemoteTarget { message: String },

    /// A bounded wait expired before the resource became available.
    #[error("Timed out after {seconds}s while {action}")]
    Timeout { action: String, seconds: u64 },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create an invalid-capture error from a serde error.
    pub fn invalid_capture(err: serde_json::Error) -> Self {
        Self::InvalidCapture {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create a remote-target error from any provider failure.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteTarget {
            message: message.into(),
        }
    }

    /// Create a timeout error for a named wait.
    pub fn timeout(action: impl Into<String>, seconds: u64) -> Self {
        Self::Timeout {
            action: action.into(),
            seconds,
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
