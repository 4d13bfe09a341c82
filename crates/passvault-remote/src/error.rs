//! Remote collection error types.
//!
//! Every variant carries enough context to render a status line without a
//! debugger. Tokens and request bodies are never included.

/// Errors that can occur when talking to the remote collection.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The collection endpoint could not be configured (bad base URL, TLS
    /// backend unavailable).
    #[error("remote collection config error: {0}")]
    Config(String),

    /// The bearer token was rejected (401/403).
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// The addressed record does not exist (404).
    #[error("record '{id}' not found")]
    NotFound { id: String },

    /// The collection returned any other non-success status.
    #[error("remote collection error {status}: {message}")]
    Api { status: u16, message: String },

    /// The request timed out.
    #[error("remote collection request timed out")]
    Timeout,

    /// Network or HTTP client error.
    #[error("remote collection unreachable: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body could not be decoded.
    #[error("malformed response from remote collection: {0}")]
    Json(#[from] serde_json::Error),
}

impl RemoteError {
    /// Whether retrying the same request could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Network(_) => true,
            Self::Api { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}
