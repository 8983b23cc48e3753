//! Interactive study loop.
//!
//! Reads answers line by line from any [`BufRead`] so the loop can be driven by a script in
//! tests. An empty line or `r` reveals the answer, `1`-`5` grades it and `q` abandons the
//! session. End of input is treated as `q`.

use std::io::{BufRead, Write};
use std::sync::Arc;

use chrono::Utc;
use studydeck_core::{
    CardRepository, DueScope, Face, MemoryRepository, Phase, SessionConfig, SessionController,
    SessionError, SessionSummary,
};

use crate::error::Result;

/// What happened during a study run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudyReport {
    pub reviewed: usize,
    pub unsaved: usize,
    pub summary: Option<SessionSummary>,
}

impl StudyReport {
    pub fn completed(&self) -> bool {
        self.summary.is_some()
    }
}

enum Input {
    Line(String),
    Quit,
}

fn read_input(input: &mut impl BufRead) -> Result<Input> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(Input::Quit);
    }
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") {
        return Ok(Input::Quit);
    }
    Ok(Input::Line(line.to_string()))
}

/// Run a study session over the due cards in `scope`.
pub async fn run(
    repository: Arc<MemoryRepository>,
    scope: DueScope,
    config: SessionConfig,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<StudyReport> {
    let mut controller = SessionController::new(repository, scope).with_config(config);
    study(&mut controller, input, out).await
}

async fn study<R: CardRepository>(
    controller: &mut SessionController<R>,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<StudyReport> {
    let mut report = StudyReport::default();

    if matches!(controller.load(Utc::now()).await?, Phase::Empty) {
        writeln!(out, "No cards are due. Come back later.")?;
        return Ok(report);
    }

    loop {
        let (Some(card), Some(progress)) = (controller.current_card(), controller.progress())
        else {
            break;
        };

        match card.face {
            Face::FaceDown => {
                writeln!(out)?;
                writeln!(out, "[{}/{}] {}", progress.position + 1, progress.total, card.front)?;
                write!(out, "Press Enter to reveal (q to quit): ")?;
                out.flush()?;

                match read_input(input)? {
                    Input::Quit => break,
                    Input::Line(line) if line.is_empty() || line.eq_ignore_ascii_case("r") => {
                        controller.reveal()?;
                    }
                    Input::Line(_) => writeln!(out, "Reveal the answer before grading.")?,
                }
            }
            Face::FaceUp => {
                writeln!(out, "Answer: {}", card.back.unwrap_or_default())?;
                write!(out, "Grade 1-5 (q to quit): ")?;
                out.flush()?;

                let line = match read_input(input)? {
                    Input::Quit => break,
                    Input::Line(line) => line,
                };
                let Ok(quality) = line.parse::<u8>() else {
                    writeln!(out, "Enter a grade from 1 to 5.")?;
                    continue;
                };

                match controller.grade(quality, Utc::now()).await {
                    Ok(outcome) => {
                        report.reviewed += 1;
                        if let Some(e) = outcome.persist_error {
                            report.unsaved += 1;
                            writeln!(out, "Warning: review not saved: {e}")?;
                        }
                        let days = outcome.next.interval;
                        let unit = if days == 1 { "day" } else { "days" };
                        writeln!(out, "Next review in {days} {unit}.")?;
                    }
                    Err(SessionError::InvalidQuality(_)) => {
                        writeln!(out, "Enter a grade from 1 to 5.")?;
                    }
                    Err(SessionError::Repository(e)) => {
                        writeln!(out, "Could not save review: {e}. Try again.")?;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    match controller.summary() {
        Some(summary) => {
            print_summary(summary, out)?;
            report.summary = Some(*summary);
        }
        None => writeln!(out, "\nSession abandoned after {} reviews.", report.reviewed)?,
    }
    Ok(report)
}

fn print_summary(summary: &SessionSummary, out: &mut impl Write) -> Result<()> {
    writeln!(out, "\nSession complete!")?;
    writeln!(out, "Reviewed: {}", summary.reviewed_count)?;
    writeln!(out, "Accuracy: {:.0}%", summary.accuracy)?;
    writeln!(out, "Average grade: {:.2}", summary.average_grade)?;
    let grades: Vec<String> = summary
        .counts
        .iter()
        .zip(1..)
        .map(|(count, grade)| format!("{grade}:{count}"))
        .collect();
    writeln!(out, "Grades: {}", grades.join(" "))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use studydeck_core::PersistPolicy;

    fn library(cards: usize) -> Arc<MemoryRepository> {
        let repo = MemoryRepository::new();
        let now = Utc::now();
        let subject = repo.create_subject("Biology", "").unwrap();
        let deck = repo.create_deck(subject.id, "Cells", now).unwrap();
        for i in 0..cards {
            repo.create_card(deck.id, &format!("front {i}"), &format!("back {i}"), now)
                .unwrap();
        }
        Arc::new(repo)
    }

    async fn drive(repo: Arc<MemoryRepository>, script: &str) -> (StudyReport, String) {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut out = Vec::new();
        let report = run(
            repo,
            DueScope::AllCards,
            SessionConfig::default(),
            &mut input,
            &mut out,
        )
        .await
        .unwrap();
        (report, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn empty_library_reports_nothing_due() {
        let (report, text) = drive(library(0), "").await;
        assert!(!report.completed());
        assert!(text.contains("No cards are due"));
    }

    #[tokio::test]
    async fn full_session_prints_summary() {
        let repo = library(2);
        let (report, text) = drive(repo.clone(), "\n5\nr\n2\n").await;

        assert!(report.completed());
        assert_eq!(report.reviewed, 2);
        assert!(text.contains("Accuracy: 50%"));
        assert!(text.contains("Grades: 1:0 2:1 3:0 4:0 5:1"));
        assert_eq!(repo.review_history().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn grading_before_reveal_and_bad_grades_reprompt() {
        let (report, text) = drive(library(1), "4\n\n9\nx\n4\n").await;

        assert!(report.completed());
        assert!(text.contains("Reveal the answer before grading."));
        assert_eq!(text.matches("Enter a grade from 1 to 5.").count(), 2);
        assert!(text.contains("Next review in 1 day."));
    }

    #[tokio::test]
    async fn quit_abandons_session() {
        let repo = library(3);
        let (report, text) = drive(repo.clone(), "\n4\nq\n").await;

        assert!(!report.completed());
        assert_eq!(report.reviewed, 1);
        assert!(text.contains("Session abandoned after 1 reviews."));
        assert_eq!(repo.review_history().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn end_of_input_abandons_session() {
        let (report, _) = drive(library(2), "\n").await;
        assert!(!report.completed());
        assert_eq!(report.reviewed, 0);
    }

    #[tokio::test]
    async fn durable_policy_runs_the_same_loop() {
        let repo = library(1);
        let mut input = Cursor::new(b"\n3\n".to_vec());
        let mut out = Vec::new();
        let config = SessionConfig {
            persist_policy: PersistPolicy::Durable,
        };
        let report = run(repo.clone(), DueScope::AllCards, config, &mut input, &mut out)
            .await
            .unwrap();
        assert!(report.completed());
        assert_eq!(repo.review_history().unwrap().len(), 1);
    }
}
