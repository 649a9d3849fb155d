//! Typed error hierarchy for PlanPilot.
//!
//! Two top-level enums cover the two sides of the wire:
//! - `BoardError`: server-side task store and auth failures
//! - `ClientError`: HTTP client, session and sync failures

use thiserror::Error;
use uuid::Uuid;

/// Errors from the board server (task store, accounts, tokens).
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Task {id} not found")]
    TaskNotFound { id: Uuid },

    #[error("A user with this email already exists.")]
    EmailTaken,

    #[error("Incorrect email or password.")]
    InvalidCredentials,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors seen by the sync client and CLI.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Session expired or invalid: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not logged in. Run `planpilot login` first.")]
    NotLoggedIn,

    #[error("Session file error at {path}: {source}")]
    Session {
        path: std::path::PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl ClientError {
    /// Whether the caller should drop its session and re-authenticate.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::NotLoggedIn)
    }
}
