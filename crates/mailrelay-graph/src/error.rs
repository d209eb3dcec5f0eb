//! Error types for Graph operations.

/// Result type alias for Graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the Graph client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success status from the Graph or identity endpoint.
    #[error("Request failed with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned by the server.
        body: String,
    },

    /// Response did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
