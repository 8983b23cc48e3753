//! Study session controller.
//!
//! A session is one pass over a snapshot of the cards that are due when it loads:
//!
//! ```text
//! Loading ──(no cards due)──> Empty
//!    │
//!    └──(cards due)──> InProgress ──(last card graded)──> Complete
//!                       FaceDown ──reveal──> FaceUp ──grade──> FaceDown (next card)
//! ```
//!
//! The due set is taken once and shuffled; cards that become due while the session runs are
//! not added. Sessions are never persisted, dropping the controller abandons the pass.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::algorithm::sm2::Sm2;
use crate::algorithm::SpacedRepetitionAlgorithm;
use crate::error::{RepositoryError, SessionError};
use crate::repository::CardRepository;
use crate::stats::{GradeTally, SessionSummary};
use crate::types::{Card, CardId, DeckId, DueScope, Quality, ReviewState};

/// When a graded card's new state has to reach storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PersistPolicy {
    /// Advance first, then write. Write failures are reported but never undo progress.
    #[default]
    BestEffort,
    /// Write first. A failed write leaves the session on the same card.
    Durable,
}

impl PersistPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BestEffort => "best_effort",
            Self::Durable => "durable",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "best_effort" => Some(Self::BestEffort),
            "durable" => Some(Self::Durable),
            _ => None,
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub persist_policy: PersistPolicy,
}

/// Which side of the current card is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    /// Only the front is visible.
    FaceDown,
    /// Front and back are visible; the card can be graded.
    FaceUp,
}

/// State of a session that still has cards to grade.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    order: Vec<Card>,
    cursor: usize,
    face: Face,
    tally: GradeTally,
}

impl ActiveSession {
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.order.len()
    }

    pub fn face(&self) -> Face {
        self.face
    }

    pub fn tally(&self) -> &GradeTally {
        &self.tally
    }

    fn current(&self) -> &Card {
        &self.order[self.cursor]
    }
}

/// Session phase.
#[derive(Debug, Clone)]
pub enum Phase {
    Loading,
    /// No cards were due.
    Empty,
    InProgress(ActiveSession),
    Complete(SessionSummary),
}

/// Phase without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Loading,
    Empty,
    InProgress,
    Complete,
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Self::Loading => PhaseKind::Loading,
            Self::Empty => PhaseKind::Empty,
            Self::InProgress(_) => PhaseKind::InProgress,
            Self::Complete(_) => PhaseKind::Complete,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.kind() {
            PhaseKind::Loading => "loading",
            PhaseKind::Empty => "empty",
            PhaseKind::InProgress => "in_progress",
            PhaseKind::Complete => "complete",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Empty | Self::Complete(_))
    }
}

/// Read-only view of the card being studied.
#[derive(Debug, Clone, PartialEq)]
pub struct CardView<'a> {
    pub id: CardId,
    pub deck_id: DeckId,
    pub front: &'a str,
    /// Present only once the card has been revealed.
    pub back: Option<&'a str>,
    pub review_state: ReviewState,
    pub face: Face,
}

/// Position within the session, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub position: usize,
    pub total: usize,
}

/// Result of grading a card.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
    pub card_id: CardId,
    pub quality: Quality,
    pub previous: ReviewState,
    pub next: ReviewState,
    /// Storage failure that did not stop the session.
    pub persist_error: Option<RepositoryError>,
    /// This grade finished the session.
    pub completed: bool,
}

/// Drives one study pass over the due cards of a repository.
pub struct SessionController<R> {
    repository: R,
    algorithm: Box<dyn SpacedRepetitionAlgorithm>,
    scope: DueScope,
    config: SessionConfig,
    phase: Phase,
}

impl<R: CardRepository> SessionController<R> {
    pub fn new(repository: R, scope: DueScope) -> Self {
        Self {
            repository,
            algorithm: Box::new(Sm2::default()),
            scope,
            config: SessionConfig::default(),
            phase: Phase::Loading,
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_algorithm(mut self, algorithm: Box<dyn SpacedRepetitionAlgorithm>) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn scope(&self) -> DueScope {
        self.scope
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn phase_kind(&self) -> PhaseKind {
        self.phase.kind()
    }

    /// Fetch the due cards and start the session in random order.
    pub async fn load(&mut self, now: DateTime<Utc>) -> Result<&Phase, SessionError> {
        let cards = self.fetch_due(now).await?;
        let mut rng = rand::rng();
        self.begin(cards, &mut rng);
        Ok(&self.phase)
    }

    /// Like [`load`](Self::load) with a caller-supplied random source.
    pub async fn load_with_rng<G>(
        &mut self,
        now: DateTime<Utc>,
        rng: &mut G,
    ) -> Result<&Phase, SessionError>
    where
        G: Rng + Send + ?Sized,
    {
        let cards = self.fetch_due(now).await?;
        self.begin(cards, rng);
        Ok(&self.phase)
    }

    async fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<Card>, SessionError> {
        if !matches!(self.phase, Phase::Loading) {
            return Err(self.invalid_phase("load"));
        }

        let mut cards = match self.repository.fetch_due_cards(self.scope, now).await {
            Ok(cards) => cards,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load due cards");
                return Err(e.into());
            }
        };
        let scope = self.scope;
        cards.retain(|card| scope.includes(card) && card.review_state.is_due(now));
        Ok(cards)
    }

    fn begin<G: Rng + ?Sized>(&mut self, mut cards: Vec<Card>, rng: &mut G) {
        if cards.is_empty() {
            tracing::debug!("no cards due");
            self.phase = Phase::Empty;
            return;
        }

        cards.shuffle(rng);
        tracing::debug!(cards = cards.len(), "session started");
        self.phase = Phase::InProgress(ActiveSession {
            order: cards,
            cursor: 0,
            face: Face::FaceDown,
            tally: GradeTally::new(),
        });
    }

    /// Show the back of the current card.
    pub fn reveal(&mut self) -> Result<(), SessionError> {
        match &mut self.phase {
            Phase::InProgress(active) => {
                active.face = Face::FaceUp;
                Ok(())
            }
            _ => Err(self.invalid_phase("reveal")),
        }
    }

    /// Grade the current card, schedule it and move to the next one.
    pub async fn grade(
        &mut self,
        quality: u8,
        now: DateTime<Utc>,
    ) -> Result<GradeOutcome, SessionError> {
        let quality = Quality::new(quality)?;

        let card = match &self.phase {
            Phase::InProgress(active) if active.face == Face::FaceUp => active.current().clone(),
            Phase::InProgress(_) => return Err(SessionError::NotRevealed),
            _ => return Err(self.invalid_phase("grade")),
        };
        let next = self.algorithm.schedule(&card.review_state, quality, now);

        let persist_error = match self.config.persist_policy {
            PersistPolicy::Durable => {
                self.persist(&card, quality, &next, now).await?;
                self.advance(quality, next);
                None
            }
            PersistPolicy::BestEffort => {
                self.advance(quality, next);
                self.persist(&card, quality, &next, now).await.err()
            }
        };
        if let Some(e) = &persist_error {
            tracing::warn!(card_id = %card.id, error = %e, "review not saved");
        }

        let completed = matches!(self.phase, Phase::Complete(_));
        tracing::debug!(
            card_id = %card.id,
            quality = quality.value(),
            interval = next.interval,
            completed,
            "card graded"
        );

        Ok(GradeOutcome {
            card_id: card.id,
            quality,
            previous: card.review_state,
            next,
            persist_error,
            completed,
        })
    }

    async fn persist(
        &self,
        card: &Card,
        quality: Quality,
        next: &ReviewState,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.repository.persist_review_state(card.id, next).await?;
        self.repository
            .append_review_history(card.id, card.deck_id, quality, now)
            .await
    }

    fn advance(&mut self, quality: Quality, next: ReviewState) {
        let Phase::InProgress(active) = &mut self.phase else {
            return;
        };

        active.order[active.cursor].review_state = next;
        active.tally.record(quality);
        active.cursor += 1;
        active.face = Face::FaceDown;

        if active.cursor == active.order.len() {
            let summary = SessionSummary::from(&active.tally);
            tracing::info!(
                reviewed = summary.reviewed_count,
                accuracy = summary.accuracy,
                "session complete"
            );
            self.phase = Phase::Complete(summary);
        }
    }

    /// Go back to loading so a new pass can start.
    pub fn restart(&mut self) -> Result<(), SessionError> {
        if !self.phase.is_terminal() {
            return Err(self.invalid_phase("restart"));
        }
        self.phase = Phase::Loading;
        Ok(())
    }

    pub fn current_card(&self) -> Option<CardView<'_>> {
        let Phase::InProgress(active) = &self.phase else {
            return None;
        };
        let card = active.current();
        Some(CardView {
            id: card.id,
            deck_id: card.deck_id,
            front: &card.front,
            back: (active.face == Face::FaceUp).then_some(card.back.as_str()),
            review_state: card.review_state,
            face: active.face,
        })
    }

    pub fn progress(&self) -> Option<Progress> {
        match &self.phase {
            Phase::InProgress(active) => Some(Progress {
                position: active.cursor,
                total: active.order.len(),
            }),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        match &self.phase {
            Phase::Complete(summary) => Some(summary),
            _ => None,
        }
    }

    fn invalid_phase(&self, action: &'static str) -> SessionError {
        SessionError::InvalidPhase {
            action,
            phase: self.phase.name(),
        }
    }
}
