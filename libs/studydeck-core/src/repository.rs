//! Repository pattern for card storage.
//!
//! [`CardRepository`] is the narrow contract the session controller needs. Storage engines
//! implement it; [`MemoryRepository`] is the in-process implementation used by the CLI and
//! the tests, and it also carries the subject/deck/card management the app exposes.

use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, Result};
use crate::transfer::DeckImport;
use crate::types::{
    to_millis, Card, CardId, Deck, DeckId, DueScope, Quality, ReviewHistoryEntry, ReviewId,
    ReviewState, Subject, SubjectId,
};

/// Storage operations required by a study session.
pub trait CardRepository: Send + Sync {
    /// Cards whose review state is due at `now`, optionally restricted to one deck.
    fn fetch_due_cards(
        &self,
        scope: DueScope,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Card>>> + Send;

    /// Overwrite the scheduling state of a card.
    fn persist_review_state(
        &self,
        card_id: CardId,
        state: &ReviewState,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Append one graded review to the history log.
    fn append_review_history(
        &self,
        card_id: CardId,
        deck_id: DeckId,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl<R: CardRepository> CardRepository for Arc<R> {
    fn fetch_due_cards(
        &self,
        scope: DueScope,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Card>>> + Send {
        (**self).fetch_due_cards(scope, now)
    }

    fn persist_review_state(
        &self,
        card_id: CardId,
        state: &ReviewState,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).persist_review_state(card_id, state)
    }

    fn append_review_history(
        &self,
        card_id: CardId,
        deck_id: DeckId,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).append_review_history(card_id, deck_id, quality, reviewed_at)
    }
}

impl<R: CardRepository> CardRepository for &R {
    fn fetch_due_cards(
        &self,
        scope: DueScope,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Card>>> + Send {
        (**self).fetch_due_cards(scope, now)
    }

    fn persist_review_state(
        &self,
        card_id: CardId,
        state: &ReviewState,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).persist_review_state(card_id, state)
    }

    fn append_review_history(
        &self,
        card_id: CardId,
        deck_id: DeckId,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).append_review_history(card_id, deck_id, quality, reviewed_at)
    }
}

/// Full contents of a library, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibrarySnapshot {
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub decks: Vec<Deck>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub review_history: Vec<ReviewHistoryEntry>,
}

/// Outcome of applying a [`DeckImport`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary {
    pub subject: Subject,
    pub deck: Deck,
    pub imported_cards: usize,
}

/// Deck with card counts.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckOverview {
    pub deck: Deck,
    pub card_count: usize,
    pub due_count: usize,
}

/// In-memory implementation of the repositories.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    store: RwLock<LibrarySnapshot>,
}

fn normalize_name(value: &str) -> String {
    value.trim().to_lowercase()
}

fn required(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RepositoryError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn find_subject_index(store: &LibrarySnapshot, name: &str) -> Option<usize> {
    let wanted = normalize_name(name);
    store
        .subjects
        .iter()
        .position(|s| normalize_name(&s.name) == wanted)
}

fn insert_subject(store: &mut LibrarySnapshot, name: String, description: &str) -> Subject {
    let subject = Subject {
        id: SubjectId::new(),
        name,
        description: description.trim().to_string(),
    };
    store.subjects.push(subject.clone());
    tracing::debug!(subject_id = %subject.id, "created subject");
    subject
}

/// Index of the named deck within a subject. Errors if the subject does not exist.
fn find_deck_index(
    store: &LibrarySnapshot,
    subject_id: SubjectId,
    name: &str,
) -> Result<Option<usize>> {
    if !store.subjects.iter().any(|s| s.id == subject_id) {
        return Err(RepositoryError::not_found("subject", subject_id));
    }
    let wanted = normalize_name(name);
    Ok(store
        .decks
        .iter()
        .position(|d| d.subject_id == subject_id && normalize_name(&d.name) == wanted))
}

fn insert_deck(
    store: &mut LibrarySnapshot,
    subject_id: SubjectId,
    name: String,
    now: DateTime<Utc>,
) -> Deck {
    let deck = Deck {
        id: DeckId::new(),
        subject_id,
        name,
        created_at: to_millis(now),
    };
    store.decks.push(deck.clone());
    tracing::debug!(deck_id = %deck.id, "created deck");
    deck
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LibrarySnapshot) -> Self {
        Self {
            store: RwLock::new(snapshot),
        }
    }

    /// Copy of the whole library.
    pub fn snapshot(&self) -> Result<LibrarySnapshot> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LibrarySnapshot>> {
        self.store
            .read()
            .map_err(|_| RepositoryError::Unavailable("library lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LibrarySnapshot>> {
        self.store
            .write()
            .map_err(|_| RepositoryError::Unavailable("library lock poisoned".to_string()))
    }

    // === Subjects ===

    pub fn subjects(&self) -> Result<Vec<Subject>> {
        Ok(self.read()?.subjects.clone())
    }

    pub fn subject(&self, id: SubjectId) -> Result<Option<Subject>> {
        Ok(self.read()?.subjects.iter().find(|s| s.id == id).cloned())
    }

    /// Case-insensitive lookup by trimmed name.
    pub fn find_subject(&self, name: &str) -> Result<Option<Subject>> {
        let wanted = normalize_name(name);
        Ok(self
            .read()?
            .subjects
            .iter()
            .find(|s| normalize_name(&s.name) == wanted)
            .cloned())
    }

    pub fn create_subject(&self, name: &str, description: &str) -> Result<Subject> {
        let name = required(name, "subject name")?;
        let mut store = self.write()?;
        if find_subject_index(&store, &name).is_some() {
            return Err(RepositoryError::Conflict(format!("subject {name}")));
        }
        Ok(insert_subject(&mut store, name, description))
    }

    /// Return the subject with this name, creating it if needed. A blank description on an
    /// existing subject is filled in from `description`.
    pub fn get_or_create_subject(&self, name: &str, description: &str) -> Result<Subject> {
        let name = required(name, "subject name")?;
        let mut store = self.write()?;
        match find_subject_index(&store, &name) {
            Some(index) => {
                let existing = &mut store.subjects[index];
                if existing.description.is_empty() && !description.trim().is_empty() {
                    existing.description = description.trim().to_string();
                }
                Ok(existing.clone())
            }
            None => Ok(insert_subject(&mut store, name, description)),
        }
    }

    pub fn rename_subject(&self, id: SubjectId, name: &str) -> Result<Subject> {
        let name = required(name, "subject name")?;
        let mut store = self.write()?;
        let wanted = normalize_name(&name);
        if store
            .subjects
            .iter()
            .any(|s| s.id != id && normalize_name(&s.name) == wanted)
        {
            return Err(RepositoryError::Conflict(format!("subject {name}")));
        }
        let subject = store
            .subjects
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| RepositoryError::not_found("subject", id))?;
        subject.name = name;
        Ok(subject.clone())
    }

    /// Delete a subject together with its decks, their cards and review history.
    pub fn delete_subject(&self, id: SubjectId) -> Result<()> {
        let mut store = self.write()?;
        let before = store.subjects.len();
        store.subjects.retain(|s| s.id != id);
        if store.subjects.len() == before {
            return Err(RepositoryError::not_found("subject", id));
        }

        let deck_ids: Vec<DeckId> = store
            .decks
            .iter()
            .filter(|d| d.subject_id == id)
            .map(|d| d.id)
            .collect();
        store.decks.retain(|d| d.subject_id != id);
        store.cards.retain(|c| !deck_ids.contains(&c.deck_id));
        store.review_history.retain(|e| !deck_ids.contains(&e.deck_id));
        tracing::debug!(subject_id = %id, decks = deck_ids.len(), "deleted subject");
        Ok(())
    }

    // === Decks ===

    pub fn deck(&self, id: DeckId) -> Result<Option<Deck>> {
        Ok(self.read()?.decks.iter().find(|d| d.id == id).cloned())
    }

    pub fn decks_by_subject(&self, subject_id: SubjectId) -> Result<Vec<Deck>> {
        Ok(self
            .read()?
            .decks
            .iter()
            .filter(|d| d.subject_id == subject_id)
            .cloned()
            .collect())
    }

    /// Case-insensitive lookup of a deck by name within a subject.
    pub fn find_deck(&self, subject_id: SubjectId, name: &str) -> Result<Option<Deck>> {
        let wanted = normalize_name(name);
        Ok(self
            .read()?
            .decks
            .iter()
            .find(|d| d.subject_id == subject_id && normalize_name(&d.name) == wanted)
            .cloned())
    }

    pub fn create_deck(
        &self,
        subject_id: SubjectId,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Deck> {
        let name = required(name, "deck name")?;
        let mut store = self.write()?;
        if find_deck_index(&store, subject_id, &name)?.is_some() {
            return Err(RepositoryError::Conflict(format!("deck {name}")));
        }
        Ok(insert_deck(&mut store, subject_id, name, now))
    }

    pub fn get_or_create_deck(
        &self,
        subject_id: SubjectId,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Deck> {
        let name = required(name, "deck name")?;
        let mut store = self.write()?;
        match find_deck_index(&store, subject_id, &name)? {
            Some(index) => Ok(store.decks[index].clone()),
            None => Ok(insert_deck(&mut store, subject_id, name, now)),
        }
    }

    pub fn rename_deck(&self, id: DeckId, name: &str) -> Result<Deck> {
        let name = required(name, "deck name")?;
        let mut store = self.write()?;
        let subject_id = store
            .decks
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.subject_id)
            .ok_or_else(|| RepositoryError::not_found("deck", id))?;
        let wanted = normalize_name(&name);
        if store
            .decks
            .iter()
            .any(|d| d.id != id && d.subject_id == subject_id && normalize_name(&d.name) == wanted)
        {
            return Err(RepositoryError::Conflict(format!("deck {name}")));
        }

        let deck = store
            .decks
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| RepositoryError::not_found("deck", id))?;
        deck.name = name;
        Ok(deck.clone())
    }

    /// Delete a deck together with its cards and review history.
    pub fn delete_deck(&self, id: DeckId) -> Result<()> {
        let mut store = self.write()?;
        let before = store.decks.len();
        store.decks.retain(|d| d.id != id);
        if store.decks.len() == before {
            return Err(RepositoryError::not_found("deck", id));
        }
        store.cards.retain(|c| c.deck_id != id);
        store.review_history.retain(|e| e.deck_id != id);
        tracing::debug!(deck_id = %id, "deleted deck");
        Ok(())
    }

    /// Decks of a subject with total and due card counts.
    pub fn deck_overviews(
        &self,
        subject_id: SubjectId,
        now: DateTime<Utc>,
    ) -> Result<Vec<DeckOverview>> {
        let store = self.read()?;
        Ok(store
            .decks
            .iter()
            .filter(|d| d.subject_id == subject_id)
            .map(|deck| {
                let cards = store.cards.iter().filter(|c| c.deck_id == deck.id);
                let (card_count, due_count) = cards.fold((0, 0), |(total, due), card| {
                    (total + 1, due + usize::from(card.review_state.is_due(now)))
                });
                DeckOverview {
                    deck: deck.clone(),
                    card_count,
                    due_count,
                }
            })
            .collect())
    }

    // === Cards ===

    pub fn card(&self, id: CardId) -> Result<Option<Card>> {
        Ok(self.read()?.cards.iter().find(|c| c.id == id).cloned())
    }

    pub fn cards_by_deck(&self, deck_id: DeckId) -> Result<Vec<Card>> {
        Ok(self
            .read()?
            .cards
            .iter()
            .filter(|c| c.deck_id == deck_id)
            .cloned()
            .collect())
    }

    pub fn create_card(
        &self,
        deck_id: DeckId,
        front: &str,
        back: &str,
        now: DateTime<Utc>,
    ) -> Result<Card> {
        let front = required(front, "front")?;
        let back = required(back, "back")?;
        let mut store = self.write()?;
        if !store.decks.iter().any(|d| d.id == deck_id) {
            return Err(RepositoryError::not_found("deck", deck_id));
        }

        let card = Card::new(deck_id, front, back, now);
        store.cards.push(card.clone());
        Ok(card)
    }

    /// Edit the text of a card. Scheduling state is left alone.
    pub fn update_card(&self, id: CardId, front: &str, back: &str) -> Result<Card> {
        let front = required(front, "front")?;
        let back = required(back, "back")?;
        let mut store = self.write()?;
        let card = store
            .cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| RepositoryError::not_found("card", id))?;
        card.front = front;
        card.back = back;
        Ok(card.clone())
    }

    /// Delete a card and its review history.
    pub fn delete_card(&self, id: CardId) -> Result<()> {
        let mut store = self.write()?;
        let before = store.cards.len();
        store.cards.retain(|c| c.id != id);
        if store.cards.len() == before {
            return Err(RepositoryError::not_found("card", id));
        }
        store.review_history.retain(|e| e.card_id != id);
        Ok(())
    }

    /// Number of cards due at `now` within `scope`.
    pub fn due_count(&self, scope: DueScope, now: DateTime<Utc>) -> Result<usize> {
        Ok(self
            .read()?
            .cards
            .iter()
            .filter(|c| scope.includes(c) && c.review_state.is_due(now))
            .count())
    }

    /// Add imported cards to a subject and deck, reusing existing ones with the same name.
    pub fn import_deck(&self, import: DeckImport, now: DateTime<Utc>) -> Result<ImportSummary> {
        let subject =
            self.get_or_create_subject(&import.subject_name, &import.subject_description)?;
        let deck = self.get_or_create_deck(subject.id, &import.deck_name, now)?;

        let imported_cards = import.cards.len();
        let mut store = self.write()?;
        store.cards.extend(import.cards.into_iter().map(|draft| Card {
            id: CardId::new(),
            deck_id: deck.id,
            front: draft.front,
            back: draft.back,
            review_state: draft.review_state,
            created_at: to_millis(now),
        }));
        tracing::info!(deck_id = %deck.id, imported_cards, "imported deck");

        Ok(ImportSummary {
            subject,
            deck,
            imported_cards,
        })
    }

    // === Review history ===

    /// All review history entries, oldest first.
    pub fn review_history(&self) -> Result<Vec<ReviewHistoryEntry>> {
        let mut history = self.read()?.review_history.clone();
        history.sort_by_key(|e| e.reviewed_at);
        Ok(history)
    }

    fn due_cards(&self, scope: DueScope, now: DateTime<Utc>) -> Result<Vec<Card>> {
        Ok(self
            .read()?
            .cards
            .iter()
            .filter(|c| scope.includes(c) && c.review_state.is_due(now))
            .cloned()
            .collect())
    }

    fn save_review_state(&self, card_id: CardId, state: ReviewState) -> Result<()> {
        let mut store = self.write()?;
        let card = store
            .cards
            .iter_mut()
            .find(|c| c.id == card_id)
            .ok_or_else(|| RepositoryError::not_found("card", card_id))?;
        card.review_state = state;
        Ok(())
    }

    fn push_history(&self, entry: ReviewHistoryEntry) -> Result<()> {
        self.write()?.review_history.push(entry);
        Ok(())
    }
}

impl CardRepository for MemoryRepository {
    async fn fetch_due_cards(&self, scope: DueScope, now: DateTime<Utc>) -> Result<Vec<Card>> {
        self.due_cards(scope, now)
    }

    async fn persist_review_state(&self, card_id: CardId, state: &ReviewState) -> Result<()> {
        self.save_review_state(card_id, *state)
    }

    async fn append_review_history(
        &self,
        card_id: CardId,
        deck_id: DeckId,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
    ) -> Result<()> {
        self.push_history(ReviewHistoryEntry {
            id: ReviewId::new(),
            card_id,
            deck_id,
            quality,
            reviewed_at: to_millis(reviewed_at),
        })
    }
}
