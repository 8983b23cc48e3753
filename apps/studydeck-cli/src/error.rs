//! Error handling for the command line app

use std::path::PathBuf;

use studydeck_core::{RepositoryError, SessionError, TransferError};
use thiserror::Error;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Library file {} is corrupt: {reason}", path.display())]
    CorruptLibrary { path: PathBuf, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
