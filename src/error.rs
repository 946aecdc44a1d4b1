//! Huginn error types

use std::time::Duration;

/// Huginn error types
#[derive(Debug, thiserror::Error)]
pub enum HuginnError {
    // Backend/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// A single downstream attempt ran past its deadline and was aborted.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("authentication failed")]
    AuthenticationFailed,

    /// The backend answered successfully but with blank content.
    #[error("empty response from model")]
    EmptyResponse,

    // Request errors
    #[error("validation error: {0}")]
    Validation(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Every attempt against `model` failed with a transient error.
    ///
    /// The adapter uses this to decide on the fallback hop; `source` is the
    /// error of the last attempt.
    #[error("retries exhausted for model '{model}' after {attempts} attempts: {source}")]
    RetriesExhausted {
        model: String,
        attempts: u32,
        #[source]
        source: Box<HuginnError>,
    },

    /// Usage persistence failed. Logged by the recorder, never returned to
    /// callers of the adapter facade.
    #[error("usage recording failed: {0}")]
    Recording(String),
}

impl HuginnError {
    /// Whether this error is worth retrying against the same model.
    ///
    /// Network failures, rate limits, 5xx responses, empty responses and
    /// per-attempt timeouts are transient. Everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            HuginnError::Http(_)
            | HuginnError::RateLimited { .. }
            | HuginnError::Timeout(_)
            | HuginnError::EmptyResponse => true,
            HuginnError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Provider-supplied retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            HuginnError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Whether the adapter may take its fallback hop after this error.
    pub fn is_fallback_trigger(&self) -> bool {
        matches!(self, HuginnError::RetriesExhausted { .. })
    }
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
