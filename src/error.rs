//! Error types for the HyperCLI client.
//!
//! This module provides the error taxonomy for all SDK operations: transport
//! failures, API rejections, bounded-wait timeouts, and precondition
//! violations on job handles.

use std::time::Duration;
use thiserror::Error;

/// The main error type for HyperCLI operations.
#[derive(Debug, Error)]
pub enum HyperError {
    /// Network-level failure with no HTTP response (timeout, DNS failure,
    /// connection refused). Distinct from any server rejection.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the network failure.
        message: String,
    },

    /// The server answered with a non-2xx status.
    #[error("API error {status}: {detail}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Detail text extracted from the response body.
        detail: String,
    },

    /// The requested resource does not exist (HTTP 404).
    #[error("Not found: {detail}")]
    NotFound {
        /// Detail text from the response body.
        detail: String,
    },

    /// A bounded wait expired before the target condition was observed.
    #[error("Timed out after {elapsed_secs}s waiting for {operation} (last state: {})", last_state.as_deref().unwrap_or("unknown"))]
    Timeout {
        /// Name of the operation that was waited on.
        operation: String,
        /// Seconds elapsed when the deadline was hit.
        elapsed_secs: u64,
        /// Last state observed before giving up, if any.
        last_state: Option<String>,
    },

    /// An operation was invoked before its documented prerequisite step.
    #[error("Precondition failed: {message}")]
    Precondition {
        /// Description of the missing prerequisite.
        message: String,
    },

    /// Metrics were requested for a job that is not currently running.
    #[error("Metrics unavailable for job {job_id}: {detail}")]
    MetricsUnavailable {
        /// Identifier of the job.
        job_id: String,
        /// Detail text from the server.
        detail: String,
    },

    /// A readiness wait observed the job enter a terminal state.
    #[error("Job {job_id} entered terminal state {state} while waiting")]
    JobTerminal {
        /// Identifier of the job.
        job_id: String,
        /// The terminal state that was observed.
        state: String,
    },

    /// Asynchronous file processing ended in the `failed` state.
    #[error("File {file_id} processing failed: {message}")]
    UploadFailed {
        /// Identifier of the file.
        file_id: String,
        /// Error message reported by the backend.
        message: String,
    },

    /// A 2xx response body could not be decoded.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Description of the decoding failure.
        message: String,
    },

    /// Client configuration could not be resolved.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for HyperCLI operations.
pub type Result<T> = std::result::Result<T, HyperError>;

impl HyperError {
    /// Creates a transport error with the given message.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an API error from a status code and detail text.
    #[must_use]
    pub fn api(status: u16, detail: impl Into<String>) -> Self {
        Self::Api {
            status,
            detail: detail.into(),
        }
    }

    /// Creates a not-found error with the given detail.
    #[must_use]
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound {
            detail: detail.into(),
        }
    }

    /// Creates a timeout error for a named operation.
    #[must_use]
    pub fn timeout(
        operation: impl Into<String>,
        elapsed: Duration,
        last_state: Option<String>,
    ) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs: elapsed.as_secs(),
            last_state,
        }
    }

    /// Creates a precondition error with the given message.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error with the given message.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Creates a configuration error with the given message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if this error is a not-found kind.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this error is a timeout kind.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true if this error is a transport-level failure.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns the HTTP status code carried by this error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}
