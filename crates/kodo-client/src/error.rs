//! Client error types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Kodo status code for "no such file or directory"
pub const CODE_NO_SUCH_ENTRY: u16 = 612;

/// Kodo status code for "file exists"
pub const CODE_FILE_EXISTS: u16 = 614;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error reported by the storage backend
    #[error("Kodo error ({code}): {message}")]
    Api {
        code: u16,
        message: String,
        request_id: Option<String>,
    },

    /// A pipeline was given without persistent operations, or the reverse
    #[error("persistent operations should not be empty")]
    MissingFops,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid response
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Malformed upload token
    #[error("Invalid upload token: {0}")]
    InvalidToken(String),
}

impl ClientError {
    /// Build an API error from a non-success response body.
    ///
    /// Kodo answers errors with `{"error": "..."}`; anything else is kept verbatim.
    pub fn from_response(body: &str, status: u16, request_id: Option<String>) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or_else(|| {
                if body.is_empty() {
                    format!("HTTP{}", status)
                } else {
                    body.to_string()
                }
            });

        Self::Api {
            code: status,
            message,
            request_id,
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { code, .. } if *code == CODE_NO_SUCH_ENTRY || *code == 404)
    }

    /// Check if this is an access denied error
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::Api { code, .. } if *code == 401 || *code == 403)
    }

    /// Check if the backend refused to replace an existing key
    pub fn is_file_exists(&self) -> bool {
        matches!(self, Self::Api { code, .. } if *code == CODE_FILE_EXISTS)
    }
}
