//! Subject, deck and card management commands.

use std::io::Write;

use chrono::{DateTime, Utc};
use studydeck_core::{Card, Deck, MemoryRepository, Subject};

use super::{resolve_deck, resolve_subject};
use crate::error::{CliError, Result};

pub fn add_subject(repo: &MemoryRepository, name: &str, description: &str) -> Result<Subject> {
    let subject = repo.create_subject(name, description)?;
    tracing::info!(subject = %subject.name, "subject added");
    Ok(subject)
}

pub fn rename_subject(repo: &MemoryRepository, subject: &str, name: &str) -> Result<Subject> {
    let subject = resolve_subject(repo, subject)?;
    Ok(repo.rename_subject(subject.id, name)?)
}

pub fn add_deck(
    repo: &MemoryRepository,
    subject: &str,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Deck> {
    let subject = resolve_subject(repo, subject)?;
    let deck = repo.create_deck(subject.id, name, now)?;
    tracing::info!(subject = %subject.name, deck = %deck.name, "deck added");
    Ok(deck)
}

pub fn rename_deck(repo: &MemoryRepository, subject: &str, deck: &str, name: &str) -> Result<Deck> {
    let (_, deck) = resolve_deck(repo, subject, deck)?;
    Ok(repo.rename_deck(deck.id, name)?)
}

pub fn delete_deck(repo: &MemoryRepository, subject: &str, deck: &str) -> Result<()> {
    let (_, deck) = resolve_deck(repo, subject, deck)?;
    repo.delete_deck(deck.id)?;
    tracing::info!(deck = %deck.name, "deck deleted");
    Ok(())
}

pub fn delete_subject(repo: &MemoryRepository, subject: &str) -> Result<()> {
    let subject = resolve_subject(repo, subject)?;
    repo.delete_subject(subject.id)?;
    tracing::info!(subject = %subject.name, "subject deleted");
    Ok(())
}

pub fn add_card(
    repo: &MemoryRepository,
    subject: &str,
    deck: &str,
    front: &str,
    back: &str,
    now: DateTime<Utc>,
) -> Result<Card> {
    let (_, deck) = resolve_deck(repo, subject, deck)?;
    Ok(repo.create_card(deck.id, front, back, now)?)
}

/// Find a card in a deck by its front text, ignoring case and surrounding whitespace.
fn resolve_card(repo: &MemoryRepository, subject: &str, deck: &str, front: &str) -> Result<Card> {
    let (_, deck) = resolve_deck(repo, subject, deck)?;
    let wanted = front.trim().to_lowercase();
    let mut matches: Vec<Card> = repo
        .cards_by_deck(deck.id)?
        .into_iter()
        .filter(|c| c.front.trim().to_lowercase() == wanted)
        .collect();

    match matches.len() {
        0 => Err(CliError::NotFound(format!("card {front:?} in {}", deck.name))),
        1 => Ok(matches.remove(0)),
        n => Err(CliError::BadRequest(format!(
            "{n} cards in {} have the front {front:?}",
            deck.name
        ))),
    }
}

/// Replace the front and/or back of a card, keeping its schedule.
pub fn edit_card(
    repo: &MemoryRepository,
    subject: &str,
    deck: &str,
    front: &str,
    new_front: Option<&str>,
    new_back: Option<&str>,
) -> Result<Card> {
    if new_front.is_none() && new_back.is_none() {
        return Err(CliError::BadRequest(
            "nothing to change, pass --front or --back".to_string(),
        ));
    }
    let card = resolve_card(repo, subject, deck, front)?;
    Ok(repo.update_card(
        card.id,
        new_front.unwrap_or(&card.front),
        new_back.unwrap_or(&card.back),
    )?)
}

pub fn delete_card(repo: &MemoryRepository, subject: &str, deck: &str, front: &str) -> Result<()> {
    let card = resolve_card(repo, subject, deck, front)?;
    repo.delete_card(card.id)?;
    tracing::info!(card_id = %card.id, "card deleted");
    Ok(())
}

/// Print the cards of a deck with their next review date.
pub fn list_cards(
    repo: &MemoryRepository,
    subject: &str,
    deck: &str,
    out: &mut impl Write,
) -> Result<()> {
    let (_, deck) = resolve_deck(repo, subject, deck)?;
    let cards = repo.cards_by_deck(deck.id)?;
    if cards.is_empty() {
        writeln!(out, "{} has no cards.", deck.name)?;
        return Ok(());
    }
    for card in cards {
        writeln!(
            out,
            "{} -> {} (due {})",
            card.front,
            card.back,
            card.review_state.due_at().format("%Y-%m-%d")
        )?;
    }
    Ok(())
}

/// Print every subject with its decks and card counts.
pub fn list(repo: &MemoryRepository, now: DateTime<Utc>, out: &mut impl Write) -> Result<()> {
    let subjects = repo.subjects()?;
    if subjects.is_empty() {
        writeln!(out, "No subjects yet. Add one with `studydeck subject add <name>`.")?;
        return Ok(());
    }

    for subject in subjects {
        if subject.description.is_empty() {
            writeln!(out, "{}", subject.name)?;
        } else {
            writeln!(out, "{} - {}", subject.name, subject.description)?;
        }
        for overview in repo.deck_overviews(subject.id, now)? {
            writeln!(
                out,
                "  {} ({} cards, {} due)",
                overview.deck.name, overview.card_count, overview.due_count
            )?;
        }
    }
    Ok(())
}
