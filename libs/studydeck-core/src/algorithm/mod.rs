//! Spaced repetition algorithm implementations.

pub mod sm2;

use crate::types::{Quality, ReviewState};
use chrono::{DateTime, Utc};

/// Trait for spaced repetition algorithms.
///
/// Implementations are pure: the same state, grade and clock always produce the same
/// result, and the input state is never modified.
pub trait SpacedRepetitionAlgorithm: Send + Sync {
    /// Algorithm identifier.
    fn name(&self) -> &'static str;

    /// Calculate the next review state after a graded review.
    fn schedule(&self, state: &ReviewState, quality: Quality, now: DateTime<Utc>) -> ReviewState;

    /// Initial state for a new card.
    fn initial_state(&self, now: DateTime<Utc>) -> ReviewState;
}

/// Get algorithm by name.
pub fn get_algorithm(name: &str) -> Option<Box<dyn SpacedRepetitionAlgorithm>> {
    match name {
        "sm2" => Some(Box::new(sm2::Sm2::default())),
        _ => None,
    }
}
