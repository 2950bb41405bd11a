//! Error types for the gateway's startup, transport, and internal failure paths.
//!
//! Protocol-level OAuth errors (the ones returned to clients with a stable
//! `error` code) live in [`crate::oauth::models::OAuthError`] and
//! [`crate::resource::validator::BearerError`] — this enum is for failures
//! that abort startup or indicate a bug, not ordinary protocol rejections.

use std::io;

use thiserror::Error;

/// Result type alias for the gateway.
pub type Result<T> = std::result::Result<T, Error>;

/// Gateway errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error talking to the IdP or a JWKS endpoint
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server shutdown
    #[error("Server shutdown")]
    Shutdown,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
