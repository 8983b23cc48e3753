//! Import and export commands.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use studydeck_core::{transfer, ImportSummary, MemoryRepository};

use super::resolve_deck;
use crate::error::{CliError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

/// Import a `.json` export, a `.csv` file or `.txt` notes into the library.
///
/// JSON files carry their own subject and deck names, which `subject` and `deck` override. CSV
/// and text files need both.
pub fn import_file(
    repo: &MemoryRepository,
    path: &Path,
    subject: Option<&str>,
    deck: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ImportSummary> {
    let content = fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let mut import = match extension.as_deref() {
        Some("json") => transfer::parse_json(&content)?,
        Some(kind @ ("csv" | "txt")) => {
            let (Some(subject), Some(deck)) = (subject, deck) else {
                return Err(CliError::BadRequest(format!(
                    "{} imports need --subject and --deck",
                    kind.to_ascii_uppercase()
                )));
            };
            if kind == "csv" {
                transfer::parse_csv(&content, subject, deck)?
            } else {
                transfer::parse_text(&content, subject, deck, now)?
            }
        }
        _ => {
            return Err(CliError::BadRequest(format!(
                "unsupported file type: {}",
                path.display()
            )))
        }
    };

    if let Some(subject) = subject {
        import.subject_name = subject.to_string();
    }
    if let Some(deck) = deck {
        import.deck_name = deck.to_string();
    }

    let summary = repo.import_deck(import, now)?;
    tracing::info!(
        path = %path.display(),
        cards = summary.imported_cards,
        "import finished"
    );
    Ok(summary)
}

/// Render a deck in `format`.
pub fn export_deck(
    repo: &MemoryRepository,
    subject: &str,
    deck: &str,
    format: ExportFormat,
    now: DateTime<Utc>,
) -> Result<String> {
    let (subject, deck) = resolve_deck(repo, subject, deck)?;
    let cards = repo.cards_by_deck(deck.id)?;
    let rendered = match format {
        ExportFormat::Json => transfer::export_json(&subject, &deck, &cards, now)?,
        ExportFormat::Csv => transfer::export_csv(&cards)?,
    };
    Ok(rendered)
}

/// Write an export to `path`, or to `out` when no path is given.
pub fn write_export(rendered: &str, path: Option<&Path>, out: &mut impl Write) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, rendered)?;
            tracing::info!(path = %path.display(), "export written");
        }
        None => {
            out.write_all(rendered.as_bytes())?;
            if !rendered.ends_with('\n') {
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn library() -> MemoryRepository {
        let repo = MemoryRepository::new();
        let now = Utc::now();
        let subject = repo.create_subject("Biology", "Life").unwrap();
        let deck = repo.create_deck(subject.id, "Cells", now).unwrap();
        repo.create_card(deck.id, "What is ATP?", "Energy currency", now)
            .unwrap();
        repo
    }

    #[test]
    fn json_export_imports_into_a_new_library() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cells.json");
        let now = Utc::now();

        let rendered = export_deck(&library(), "Biology", "Cells", ExportFormat::Json, now).unwrap();
        write_export(&rendered, Some(&path), &mut Vec::new()).unwrap();

        let target = MemoryRepository::new();
        let summary = import_file(&target, &path, None, None, now).unwrap();
        assert_eq!(summary.subject.name, "Biology");
        assert_eq!(summary.subject.description, "Life");
        assert_eq!(summary.deck.name, "Cells");
        assert_eq!(summary.imported_cards, 1);
    }

    #[test]
    fn csv_import_requires_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cards.csv");
        let rendered = export_deck(&library(), "Biology", "Cells", ExportFormat::Csv, Utc::now())
            .unwrap();
        fs::write(&path, rendered).unwrap();

        let target = MemoryRepository::new();
        let result = import_file(&target, &path, None, None, Utc::now());
        assert!(matches!(result, Err(CliError::BadRequest(_))));

        let summary = import_file(&target, &path, Some("Chemistry"), Some("Basics"), Utc::now())
            .unwrap();
        assert_eq!(summary.deck.name, "Basics");
        assert_eq!(target.cards_by_deck(summary.deck.id).unwrap()[0].front, "What is ATP?");
    }

    #[test]
    fn text_notes_become_cards() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.TXT");
        fs::write(&path, "1. What is ATP?\nThe energy currency of the cell\n").unwrap();

        let repo = MemoryRepository::new();
        assert!(matches!(
            import_file(&repo, &path, None, None, Utc::now()),
            Err(CliError::BadRequest(_))
        ));
        let summary = import_file(&repo, &path, Some("Biology"), Some("Cells"), Utc::now())
            .unwrap();
        assert_eq!(summary.imported_cards, 1);
        let cards = repo.cards_by_deck(summary.deck.id).unwrap();
        assert_eq!(cards[0].front, "What is ATP?");
        assert_eq!(cards[0].back, "The energy currency of the cell");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cards.md");
        fs::write(&path, "front,back").unwrap();
        let result = import_file(&MemoryRepository::new(), &path, None, None, Utc::now());
        assert!(matches!(result, Err(CliError::BadRequest(_))));
    }

    #[test]
    fn export_to_writer_ends_with_newline() {
        let rendered = export_deck(&library(), "Biology", "Cells", ExportFormat::Csv, Utc::now())
            .unwrap();
        let mut out = Vec::new();
        write_export(&rendered, None, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("front,back,interval,repetition,easeFactor,due\n"));
        assert!(text.ends_with('\n'));
    }
}
