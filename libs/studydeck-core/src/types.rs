//! Core types for the study application.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::SessionError;

/// Milliseconds in one scheduling day.
pub const DAY_MS: i64 = 86_400_000;

/// Ease factor given to every new card.
pub const DEFAULT_EASE: f64 = 2.5;

/// Lowest ease factor a card can reach.
pub const MINIMUM_EASE: f64 = 1.3;

/// Convert a UTC timestamp to epoch milliseconds.
pub fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Convert epoch milliseconds to a UTC timestamp, clamping out-of-range values.
pub fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_type!(
    /// Identifier of a card.
    CardId
);
id_type!(
    /// Identifier of a deck.
    DeckId
);
id_type!(
    /// Identifier of a subject.
    SubjectId
);
id_type!(
    /// Identifier of a review history entry.
    ReviewId
);

/// Self-graded recall quality, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Validate a raw grade.
    pub fn new(value: u8) -> Result<Self, SessionError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(SessionError::InvalidQuality(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Recall counts as a success for scheduling purposes.
    pub fn is_pass(self) -> bool {
        self.0 >= 3
    }

    /// Recall counts toward accuracy.
    pub fn is_correct(self) -> bool {
        self.0 >= 4
    }
}

impl TryFrom<u8> for Quality {
    type Error = SessionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Scheduling state of a card. Replaced wholesale after every graded review.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    /// Days until the next review.
    pub interval: u32,
    /// Consecutive successful recalls.
    pub repetition: u32,
    pub ease_factor: f64,
    /// Next review time in epoch milliseconds.
    pub due: i64,
}

impl ReviewState {
    /// State given to a freshly created card: due immediately.
    pub fn new_card(now: DateTime<Utc>) -> Self {
        Self {
            interval: 1,
            repetition: 0,
            ease_factor: DEFAULT_EASE,
            due: to_millis(now),
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due <= to_millis(now)
    }

    pub fn due_at(&self) -> DateTime<Utc> {
        from_millis(self.due)
    }

    /// Check the invariants a stored state must satisfy.
    pub fn validate(&self) -> Result<(), String> {
        if self.interval < 1 {
            return Err(format!("interval must be at least 1, got {}", self.interval));
        }
        if !self.ease_factor.is_finite() {
            return Err("ease factor must be a finite number".to_string());
        }
        if self.ease_factor < MINIMUM_EASE {
            return Err(format!(
                "ease factor must be at least {MINIMUM_EASE}, got {}",
                self.ease_factor
            ));
        }
        Ok(())
    }
}

/// Top-level grouping of decks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Named collection of cards inside a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: DeckId,
    pub subject_id: SubjectId,
    pub name: String,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// A flashcard with its scheduling state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub deck_id: DeckId,
    pub front: String,
    pub back: String,
    pub review_state: ReviewState,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl Card {
    /// Create a card that is due right away.
    pub fn new(
        deck_id: DeckId,
        front: impl Into<String>,
        back: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CardId::new(),
            deck_id,
            front: front.into(),
            back: back.into(),
            review_state: ReviewState::new_card(now),
            created_at: to_millis(now),
        }
    }
}

/// Append-only record of one graded review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewHistoryEntry {
    pub id: ReviewId,
    pub card_id: CardId,
    pub deck_id: DeckId,
    pub quality: Quality,
    /// Epoch milliseconds.
    pub reviewed_at: i64,
}

/// Which cards a study session draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DueScope {
    #[default]
    AllCards,
    Deck(DeckId),
}

impl DueScope {
    pub fn includes(&self, card: &Card) -> bool {
        match self {
            Self::AllCards => true,
            Self::Deck(deck_id) => card.deck_id == *deck_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_rejects_out_of_range() {
        assert_eq!(Quality::new(0), Err(SessionError::InvalidQuality(0)));
        assert_eq!(Quality::new(6), Err(SessionError::InvalidQuality(6)));
        assert_eq!(Quality::new(5).map(Quality::value), Ok(5));
    }

    #[test]
    fn quality_pass_and_correct_thresholds() {
        let q = |v| Quality::new(v).unwrap();
        assert!(!q(2).is_pass());
        assert!(q(3).is_pass());
        assert!(!q(3).is_correct());
        assert!(q(4).is_correct());
    }

    #[test]
    fn quality_deserialize_validates() {
        assert!(serde_json::from_str::<Quality>("4").is_ok());
        assert!(serde_json::from_str::<Quality>("9").is_err());
    }

    #[test]
    fn new_card_state_is_due_now() {
        let now = Utc::now();
        let state = ReviewState::new_card(now);
        assert_eq!(state.interval, 1);
        assert_eq!(state.repetition, 0);
        assert_eq!(state.ease_factor, 2.5);
        assert!(state.is_due(now));
    }

    #[test]
    fn review_state_uses_camel_case_fields() {
        let state = ReviewState {
            interval: 6,
            repetition: 2,
            ease_factor: 2.36,
            due: 1_700_000_000_000,
        };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["easeFactor"], 2.36);
        assert_eq!(json["due"], 1_700_000_000_000_i64);
    }

    #[test]
    fn validate_rejects_broken_states() {
        let mut state = ReviewState::new_card(Utc::now());
        assert!(state.validate().is_ok());
        state.interval = 0;
        assert!(state.validate().is_err());
        state.interval = 1;
        state.ease_factor = 1.2;
        assert!(state.validate().is_err());
        state.ease_factor = f64::NAN;
        assert!(state.validate().is_err());
    }

    #[test]
    fn deck_scope_filters_by_deck() {
        let deck = DeckId::new();
        let card = Card::new(deck, "Q", "A", Utc::now());
        assert!(DueScope::AllCards.includes(&card));
        assert!(DueScope::Deck(deck).includes(&card));
        assert!(!DueScope::Deck(DeckId::new()).includes(&card));
    }
}
