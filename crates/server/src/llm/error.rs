//! Error types for the chat-completion client.

use thiserror::Error;

/// Errors that can occur when calling the language model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The model did not answer within the configured timeout.
    #[error("model call timed out after {0} seconds")]
    Timeout(u64),

    /// The API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API, or the raw body.
        message: String,
    },

    /// Rate limited by the API.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse the response body.
    #[error("parse error: {0}")]
    Parse(String),

    /// The client could not be constructed from its configuration.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

/// Error envelope returned by `OpenAI`-compatible APIs.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

/// Nested error details.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}
