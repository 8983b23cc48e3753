//! Review history statistics.

use std::io::Write;

use chrono::{DateTime, Utc};
use studydeck_core::{HistoryStats, MemoryRepository, MAX_CALENDAR_DAYS};

use crate::error::{CliError, Result};

pub fn show(
    repo: &MemoryRepository,
    now: DateTime<Utc>,
    days: usize,
    out: &mut impl Write,
) -> Result<()> {
    if days > MAX_CALENDAR_DAYS {
        return Err(CliError::BadRequest(format!(
            "--days must be at most {MAX_CALENDAR_DAYS}, got {days}"
        )));
    }

    let history = repo.review_history()?;
    let stats = HistoryStats::from_entries(&history, now, days);

    writeln!(out, "Total reviews: {}", stats.total_reviews)?;
    writeln!(out, "Accuracy: {:.0}%", stats.accuracy)?;
    writeln!(out, "Current streak: {} days", stats.streak_days)?;

    if !stats.decks.is_empty() {
        writeln!(out, "\nDecks:")?;
        for deck_stats in &stats.decks {
            let name = repo
                .deck(deck_stats.deck_id)?
                .map(|d| d.name)
                .unwrap_or_else(|| "(deleted deck)".to_string());
            writeln!(
                out,
                "  {name}: {} reviews, {:.0}% accuracy",
                deck_stats.reviews, deck_stats.accuracy
            )?;
        }
    }

    if !stats.calendar.is_empty() {
        writeln!(out, "\nLast {days} days:")?;
        for day in &stats.calendar {
            writeln!(out, "  {} {}", day.date.format("%Y-%m-%d"), "#".repeat(day.reviews))?;
        }
    }
    Ok(())
}
