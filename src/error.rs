//! Error types for the retouch workflows.

/// Errors that can occur while retouching images.
#[derive(Debug, thiserror::Error)]
pub enum RetouchError {
    /// API key missing or rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The Gemini API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// A batch job reported a terminal failure or an unusable state.
    #[error("batch job error: {0}")]
    Job(String),

    /// Malformed gs:// location or local path.
    #[error("invalid location: {0}")]
    InvalidLocation(String),

    /// Failed to decode base64 image data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (reading inputs, saving outputs).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for retouch operations.
pub type Result<T> = std::result::Result<T, RetouchError>;
