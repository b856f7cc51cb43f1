use std::time::Duration;

use thiserror::Error;

/// Application-wide error types for pagescope.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (direct page fetch).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request or renderer step timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Target URL is missing a scheme or host, or uses an unsupported scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Proposed extraction schema is empty or unusable.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Page renderer (browser session) failed.
    #[error("Renderer error: {0}")]
    RendererError(String),

    /// Remote schema inference call failed.
    #[error("Inference error (HTTP {status_code}): {message}")]
    InferenceError {
        message: String,
        status_code: u16,
        retryable: bool,
    },

    /// Model output or markup could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Timeout for a `limit` budget, rounded up to whole seconds so sub-second
    /// budgets never report zero.
    pub fn timeout(limit: Duration) -> Self {
        AppError::Timeout(limit.as_millis().div_ceil(1000) as u64)
    }

    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) | AppError::RendererError(_) => true,
            AppError::InferenceError { retryable, .. } => *retryable,
            AppError::HttpError(msg) => {
                msg.contains("timeout") || msg.contains("connect") || msg.contains("reset")
            }
            _ => false,
        }
    }

    /// Returns true for errors caused by the caller's input rather than the
    /// target site or a collaborator.
    pub fn is_input_error(&self) -> bool {
        matches!(self, AppError::InvalidUrl(_) | AppError::InvalidSchema(_))
    }
}
