//! Core study library: scheduling, study sessions and deck transfer.
//!
//! Provides:
//! - SM-2 scheduler as a pure function over [`ReviewState`]
//! - Study session state machine driven by reveal/grade actions
//! - Repository contract plus an in-memory implementation
//! - Session summaries and review history statistics
//! - JSON and CSV deck import/export

pub mod algorithm;
pub mod error;
pub mod repository;
pub mod session;
pub mod stats;
pub mod transfer;
pub mod types;

pub use algorithm::{get_algorithm, sm2, SpacedRepetitionAlgorithm};
pub use error::{RepositoryError, SessionError, TransferError};
pub use repository::{
    CardRepository, DeckOverview, ImportSummary, LibrarySnapshot, MemoryRepository,
};
pub use session::{
    CardView, Face, GradeOutcome, PersistPolicy, Phase, PhaseKind, Progress, SessionConfig,
    SessionController,
};
pub use stats::{
    CalendarDay, DeckAccuracy, GradeTally, HistoryStats, SessionSummary, MAX_CALENDAR_DAYS,
};
pub use transfer::{CardDraft, DeckImport};
pub use types::{
    Card, CardId, Deck, DeckId, DueScope, Quality, ReviewHistoryEntry, ReviewId, ReviewState,
    Subject, SubjectId,
};
