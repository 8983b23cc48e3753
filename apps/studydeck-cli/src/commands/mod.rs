//! Command implementations behind the CLI subcommands.

pub mod manage;
pub mod stats;
pub mod study;
pub mod transfer;

use studydeck_core::{Deck, MemoryRepository, Subject};

use crate::error::{CliError, Result};

/// Look up a subject by name.
pub fn resolve_subject(repo: &MemoryRepository, name: &str) -> Result<Subject> {
    repo.find_subject(name)?
        .ok_or_else(|| CliError::NotFound(format!("subject {name}")))
}

/// Look up a deck by subject and deck name.
pub fn resolve_deck(repo: &MemoryRepository, subject: &str, deck: &str) -> Result<(Subject, Deck)> {
    let subject = resolve_subject(repo, subject)?;
    let deck = repo
        .find_deck(subject.id, deck)?
        .ok_or_else(|| CliError::NotFound(format!("deck {deck} in {}", subject.name)))?;
    Ok((subject, deck))
}
