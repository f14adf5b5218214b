// crates/digitalhub-client/src/error.rs
// ============================================================================
// Module: Client Errors
// Description: Error taxonomy for DigitalHub client operations.
// Purpose: Map transport, HTTP, and decoding failures onto stable variants.
// Dependencies: thiserror, csv
// ============================================================================

//! ## Overview
//! Every fallible client call returns [`ClientError`]. HTTP 404 and 409 map to
//! dedicated variants so callers can treat "already gone" and "already exists"
//! explicitly; other non-success statuses keep the status code and a body
//! preview.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// SECTION: Error Types
// ============================================================================

/// DigitalHub client errors.
///
/// # Invariants
/// - Variants are stable for test assertions and error mapping.
/// - String payloads may include untrusted server text.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("client config error: {0}")]
    Config(String),
    /// Request could not be sent or the response could not be read.
    #[error("transport error: {0}")]
    Transport(String),
    /// The backend reported that the resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The backend rejected the request because the resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Any other non-success HTTP status.
    #[error("http status {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Trimmed response body preview.
        body: String,
    },
    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(String),
    /// YAML encoding or decoding failed.
    #[error("yaml error: {0}")]
    Yaml(String),
    /// CSV encoding or decoding of a table failed.
    #[error("csv error: {0}")]
    Csv(String),
    /// Local filesystem access failed.
    #[error("io error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// An entity key or identifier could not be parsed or does not match.
    #[error("invalid key: {0}")]
    InvalidKey(String),
    /// The backend returned a payload with an unexpected shape.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Response body exceeded the accepted size.
    #[error("response exceeds size limit ({actual} > {limit})")]
    ResponseTooLarge {
        /// Actual size in bytes.
        actual: usize,
        /// Maximum size in bytes.
        limit: usize,
    },
    /// A run settled in a failure state.
    #[error("run {run} finished in state {state}")]
    RunFailed {
        /// Run identifier.
        run: String,
        /// Final reported state.
        state: String,
    },
    /// A bounded wait expired.
    #[error("timed out: {0}")]
    Timeout(String),
}

impl ClientError {
    /// Returns true when the backend reported a missing resource.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true when the backend reported an existing resource.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Builds an IO error bound to the given path.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<serde_yaml::Error> for ClientError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}

impl From<csv::Error> for ClientError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

/// Result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
