//! Typed failures for the session authentication flow.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by session operations.
///
/// User cancellation and explicit denial are not errors; they are
/// reported as [`SignInOutcome`](super::SignInOutcome) variants.
#[derive(Debug, Error)]
pub enum SessionError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider reported an error on the authorization callback.
    #[error("authorization error: {error} - {description}")]
    Provider {
        /// Provider error code.
        error: String,
        /// Human-readable description.
        description: String,
    },

    /// Malformed response from the token exchange backend.
    #[error("invalid exchange response: {0}")]
    InvalidResponse(String),

    /// Reading or writing the local session store failed.
    #[error("session store error at {path}: {source}")]
    Storage {
        /// Store file involved.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// I/O error on the callback listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// (De)serialization of the profile or store file failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The system browser could not be opened.
    #[error("failed to open browser: {0}")]
    BrowserLaunch(String),

    /// No callback arrived before the configured deadline.
    #[error("timeout waiting for authorization callback")]
    CallbackTimeout,
}
