//! Session summaries and review history statistics.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;

use crate::types::{from_millis, DeckId, Quality, ReviewHistoryEntry};

/// Longest review calendar [`HistoryStats::from_entries`] will build, about ten years.
pub const MAX_CALENDAR_DAYS: usize = 3660;

/// Number of reviews per grade, 1 through 5.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GradeTally {
    counts: [u32; 5],
}

impl GradeTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, quality: Quality) {
        self.counts[usize::from(quality.value() - 1)] += 1;
    }

    pub fn count(&self, quality: Quality) -> u32 {
        self.counts[usize::from(quality.value() - 1)]
    }

    /// Counts indexed by grade minus one.
    pub fn counts(&self) -> [u32; 5] {
        self.counts
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Percentage of reviews graded 4 or 5. Zero when nothing was reviewed.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        f64::from(self.counts[3] + self.counts[4]) * 100.0 / f64::from(total)
    }

    /// Mean grade weighted by count. Zero when nothing was reviewed.
    pub fn average(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let weighted: u32 = self
            .counts
            .iter()
            .zip(1u32..)
            .map(|(count, grade)| count * grade)
            .sum();
        f64::from(weighted) / f64::from(total)
    }
}

/// Statistics reported when a study session completes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionSummary {
    pub reviewed_count: u32,
    /// Percentage of grades that were 4 or 5.
    pub accuracy: f64,
    pub average_grade: f64,
    pub counts: [u32; 5],
}

impl From<&GradeTally> for SessionSummary {
    fn from(tally: &GradeTally) -> Self {
        Self {
            reviewed_count: tally.total(),
            accuracy: tally.accuracy(),
            average_grade: tally.average(),
            counts: tally.counts(),
        }
    }
}

/// Reviews on one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub reviews: usize,
}

/// Accuracy of one deck across its review history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeckAccuracy {
    pub deck_id: DeckId,
    pub reviews: usize,
    pub accuracy: f64,
}

/// Aggregate statistics over the review history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryStats {
    pub total_reviews: usize,
    pub accuracy: f64,
    pub tally: GradeTally,
    pub decks: Vec<DeckAccuracy>,
    /// Oldest day first, ending today.
    pub calendar: Vec<CalendarDay>,
    pub streak_days: usize,
}

impl HistoryStats {
    /// Summarize `entries`, with a calendar covering the last `days` days. The calendar is
    /// capped at [`MAX_CALENDAR_DAYS`] and stops at the earliest representable date.
    pub fn from_entries(entries: &[ReviewHistoryEntry], now: DateTime<Utc>, days: usize) -> Self {
        let mut tally = GradeTally::new();
        let mut per_deck: BTreeMap<DeckId, GradeTally> = BTreeMap::new();
        let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();

        for entry in entries {
            tally.record(entry.quality);
            per_deck.entry(entry.deck_id).or_default().record(entry.quality);
            *per_day
                .entry(from_millis(entry.reviewed_at).date_naive())
                .or_default() += 1;
        }

        let today = now.date_naive();
        let mut calendar: Vec<CalendarDay> = (0..days.min(MAX_CALENDAR_DAYS) as u64)
            .map_while(|offset| today.checked_sub_days(Days::new(offset)))
            .map(|date| CalendarDay {
                date,
                reviews: per_day.get(&date).copied().unwrap_or(0),
            })
            .collect();
        calendar.reverse();

        let decks = per_deck
            .into_iter()
            .map(|(deck_id, deck_tally)| DeckAccuracy {
                deck_id,
                reviews: deck_tally.total() as usize,
                accuracy: deck_tally.accuracy(),
            })
            .collect();

        let active: HashSet<NaiveDate> = per_day.into_keys().collect();

        Self {
            total_reviews: entries.len(),
            accuracy: tally.accuracy(),
            tally,
            decks,
            calendar,
            streak_days: streak(&active, today),
        }
    }
}

/// Consecutive days with reviews ending today, or yesterday if nothing was reviewed yet today.
fn streak(active: &HashSet<NaiveDate>, today: NaiveDate) -> usize {
    let previous = |day: NaiveDate| day.checked_sub_days(Days::new(1));
    let mut day = if active.contains(&today) {
        Some(today)
    } else {
        previous(today)
    };

    let mut count = 0;
    while let Some(current) = day.filter(|d| active.contains(d)) {
        count += 1;
        day = previous(current);
    }
    count
}
