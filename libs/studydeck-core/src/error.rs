//! Error types for studydeck-core.

use thiserror::Error;

/// Errors reported by a card repository.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid data: {0}")]
    Validation(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("write failed: {0}")]
    Write(String),
}

impl RepositoryError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Errors surfaced by the session controller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("quality must be between 1 and 5, got {0}")]
    InvalidQuality(u8),

    #[error("card must be revealed before it can be graded")]
    NotRevealed,

    #[error("cannot {action} while session is {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: &'static str,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Errors that can occur while importing or exporting decks.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("unsupported export version {0}")]
    UnsupportedVersion(u32),

    #[error("no cards found in text")]
    NoCards,

    #[error("CSV file is empty")]
    EmptyFile,

    #[error("invalid CSV header, expected: front,back,interval,repetition,easeFactor,due")]
    InvalidHeader,

    #[error("{field} is required")]
    MissingName { field: &'static str },

    #[error("card {index} must include front and back text")]
    MissingText { index: usize },

    #[error("card {index} has an invalid review state: {reason}")]
    InvalidReviewState { index: usize, reason: String },

    #[error("CSV row {row} is invalid: {reason}")]
    InvalidRow { row: usize, reason: String },
}

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
