// src/error.rs
// Error types for session-reflect

use thiserror::Error;

/// Main error type for the session-reflect library
#[derive(Error, Debug)]
pub enum ReflectError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server rejected request ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Convenience type alias for Result using ReflectError
pub type Result<T> = std::result::Result<T, ReflectError>;
