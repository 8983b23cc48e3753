//! Deck import and export.
//!
//! # JSON format (version 1)
//! ```json
//! {
//!   "version": 1,
//!   "exportedAt": 1700000000000,
//!   "subject": { "name": "Biology", "description": "" },
//!   "deck": { "name": "Cells", "createdAt": 1690000000000 },
//!   "cards": [
//!     {
//!       "front": "What is ATP?",
//!       "back": "The energy currency of the cell",
//!       "reviewState": { "interval": 6, "repetition": 2, "easeFactor": 2.36, "due": 1700500000000 }
//!     }
//!   ]
//! }
//! ```
//!
//! # CSV format
//! ```text
//! front,back,interval,repetition,easeFactor,due
//! "What is ATP?","The energy currency of the cell",6,2,2.36,1700500000000
//! ```
//!
//! # Plain text
//! Notes are split into new cards by [`chunk_text`]: numbered questions with the answer on
//! the following lines, numbered questions with inline answers, or paragraphs.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TransferError;
use crate::types::{to_millis, Card, Deck, ReviewState, Subject};

/// Current JSON export version.
pub const EXPORT_VERSION: u32 = 1;

/// Column names of the CSV format, in order.
pub const CSV_HEADER: [&str; 6] = ["front", "back", "interval", "repetition", "easeFactor", "due"];

type Result<T> = std::result::Result<T, TransferError>;

/// Card content and scheduling state carried by an import.
#[derive(Debug, Clone, PartialEq)]
pub struct CardDraft {
    pub front: String,
    pub back: String,
    pub review_state: ReviewState,
}

/// Parsed import, ready to be applied to a repository.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckImport {
    pub subject_name: String,
    pub subject_description: String,
    pub deck_name: String,
    pub cards: Vec<CardDraft>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeckExport {
    version: u32,
    exported_at: i64,
    subject: ExportSubject,
    deck: ExportDeck,
    cards: Vec<ExportCard>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExportSubject {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportDeck {
    name: String,
    #[serde(default)]
    created_at: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportCard {
    front: String,
    back: String,
    review_state: ReviewState,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

/// Serialize a deck and its cards to the JSON export format.
pub fn export_json(
    subject: &Subject,
    deck: &Deck,
    cards: &[Card],
    now: DateTime<Utc>,
) -> Result<String> {
    let payload = DeckExport {
        version: EXPORT_VERSION,
        exported_at: to_millis(now),
        subject: ExportSubject {
            name: subject.name.clone(),
            description: subject.description.clone(),
        },
        deck: ExportDeck {
            name: deck.name.clone(),
            created_at: Some(deck.created_at),
        },
        cards: cards
            .iter()
            .map(|card| ExportCard {
                front: card.front.clone(),
                back: card.back.clone(),
                review_state: card.review_state,
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&payload)?)
}

/// Parse a JSON export.
pub fn parse_json(content: &str) -> Result<DeckImport> {
    let probe: VersionProbe = serde_json::from_str(content)?;
    if probe.version != EXPORT_VERSION {
        return Err(TransferError::UnsupportedVersion(probe.version));
    }

    let payload: DeckExport = serde_json::from_str(content)?;
    if payload.subject.name.trim().is_empty() {
        return Err(TransferError::MissingName { field: "subject name" });
    }
    if payload.deck.name.trim().is_empty() {
        return Err(TransferError::MissingName { field: "deck name" });
    }

    let cards = payload
        .cards
        .into_iter()
        .enumerate()
        .map(|(idx, card)| {
            let index = idx + 1;
            if card.front.trim().is_empty() || card.back.trim().is_empty() {
                return Err(TransferError::MissingText { index });
            }
            card.review_state
                .validate()
                .map_err(|reason| TransferError::InvalidReviewState { index, reason })?;
            Ok(CardDraft {
                front: card.front,
                back: card.back,
                review_state: card.review_state,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(DeckImport {
        subject_name: payload.subject.name.trim().to_string(),
        subject_description: payload.subject.description,
        deck_name: payload.deck.name.trim().to_string(),
        cards,
    })
}

/// Serialize cards to CSV.
pub fn export_csv(cards: &[Card]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for card in cards {
        let state = &card.review_state;
        writer.write_record([
            card.front.clone(),
            card.back.clone(),
            state.interval.to_string(),
            state.repetition.to_string(),
            state.ease_factor.to_string(),
            state.due.to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| TransferError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Parse CSV rows into an import for the given subject and deck.
pub fn parse_csv(content: &str, subject_name: &str, deck_name: &str) -> Result<DeckImport> {
    let (subject_name, deck_name) = required_names(subject_name, deck_name)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record?,
        None => return Err(TransferError::EmptyFile),
    };
    let header_matches = header.len() == CSV_HEADER.len()
        && header
            .iter()
            .zip(CSV_HEADER)
            .all(|(found, expected)| found.trim().eq_ignore_ascii_case(expected));
    if !header_matches {
        return Err(TransferError::InvalidHeader);
    }

    // Rows are numbered over non-blank lines, header first.
    let mut cards = Vec::new();
    for (index, record) in records.enumerate() {
        cards.push(parse_row(&record?, index + 2)?);
    }

    Ok(DeckImport {
        subject_name,
        subject_description: String::new(),
        deck_name,
        cards,
    })
}

fn parse_row(record: &csv::StringRecord, row: usize) -> Result<CardDraft> {
    let invalid = |reason: String| TransferError::InvalidRow { row, reason };

    if record.len() != CSV_HEADER.len() {
        return Err(invalid(format!(
            "expected {} columns, found {}",
            CSV_HEADER.len(),
            record.len()
        )));
    }

    let front = record[0].trim();
    let back = record[1].trim();
    if front.is_empty() || back.is_empty() {
        return Err(invalid("front and back text are required".to_string()));
    }

    let review_state = ReviewState {
        interval: parse_number(&record[2], "interval").map_err(invalid)?,
        repetition: parse_number(&record[3], "repetition").map_err(invalid)?,
        ease_factor: parse_number(&record[4], "easeFactor").map_err(invalid)?,
        due: parse_number(&record[5], "due").map_err(invalid)?,
    };
    review_state.validate().map_err(invalid)?;

    Ok(CardDraft {
        front: front.to_string(),
        back: back.to_string(),
        review_state,
    })
}

static PAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)---\s*page\s*\d+\s*---").expect("valid regex"));
static NUMBERED_QUESTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s+(.*\?)$").expect("valid regex"));
static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s+").expect("valid regex"));
static INLINE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)\d+\.\s+").expect("valid regex"));
static INLINE_QUESTION_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?\s+").expect("valid regex"));
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid regex"));

/// Answers of numbered questions must be longer than this many characters.
const MIN_ANSWER_CHARS: usize = 10;
/// Paragraphs must be longer than this many characters to become a card.
const MIN_PARAGRAPH_CHARS: usize = 40;
const MAX_PARAGRAPH_FRONT_CHARS: usize = 120;

/// Split free text into new cards, all due at `now`.
///
/// The first layout that yields any card wins:
/// 1. `1. Question?` on its own line, answer on the lines up to the next numbered line.
/// 2. `1. Question? Answer. 2. Question? Answer.` inline.
/// 3. Paragraphs separated by blank lines; the first sentence is the front.
pub fn chunk_text(content: &str, now: DateTime<Utc>) -> Vec<CardDraft> {
    let cleaned = PAGE_MARKER.replace_all(content, "").replace('\r', "");
    let cleaned = cleaned.trim();

    let pairs = Some(numbered_lines(cleaned))
        .filter(|pairs| !pairs.is_empty())
        .or_else(|| Some(inline_numbered(cleaned)).filter(|pairs| !pairs.is_empty()))
        .unwrap_or_else(|| paragraphs(cleaned));

    pairs
        .into_iter()
        .map(|(front, back)| CardDraft {
            front,
            back,
            review_state: ReviewState::new_card(now),
        })
        .collect()
}

fn numbered_lines(text: &str) -> Vec<(String, String)> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut pairs = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let Some(question) = NUMBERED_QUESTION.captures(lines[i]) else {
            i += 1;
            continue;
        };
        let answer_end = lines[i + 1..]
            .iter()
            .position(|l| NUMBERED_LINE.is_match(l))
            .map_or(lines.len(), |offset| i + 1 + offset);
        let answer = lines[i + 1..answer_end].join(" ");
        if answer.chars().count() > MIN_ANSWER_CHARS {
            pairs.push((question[1].trim().to_string(), answer));
        }
        i = answer_end;
    }
    pairs
}

fn inline_numbered(text: &str) -> Vec<(String, String)> {
    let markers: Vec<_> = INLINE_NUMBER.find_iter(text).collect();
    markers
        .iter()
        .enumerate()
        .filter_map(|(n, marker)| {
            let end = markers.get(n + 1).map_or(text.len(), |next| next.start());
            let segment = text[marker.end()..end].trim_end();
            let split = INLINE_QUESTION_END.find(segment)?;
            let front = segment[..split.start()].trim();
            let back = segment[split.end()..].trim();
            if front.is_empty() || back.is_empty() || front.contains('\n') || back.contains('\n')
            {
                return None;
            }
            Some((format!("{front}?"), back.to_string()))
        })
        .collect()
}

fn paragraphs(text: &str) -> Vec<(String, String)> {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| p.chars().count() > MIN_PARAGRAPH_CHARS)
        .map(|p| {
            let first_sentence = p.split(". ").next().unwrap_or(p);
            let front = first_sentence
                .chars()
                .take(MAX_PARAGRAPH_FRONT_CHARS)
                .collect();
            (front, p.to_string())
        })
        .collect()
}

/// Chunk free text into an import for the given subject and deck.
pub fn parse_text(
    content: &str,
    subject_name: &str,
    deck_name: &str,
    now: DateTime<Utc>,
) -> Result<DeckImport> {
    let (subject_name, deck_name) = required_names(subject_name, deck_name)?;
    let cards = chunk_text(content, now);
    if cards.is_empty() {
        return Err(TransferError::NoCards);
    }
    Ok(DeckImport {
        subject_name,
        subject_description: String::new(),
        deck_name,
        cards,
    })
}

fn required_names(subject_name: &str, deck_name: &str) -> Result<(String, String)> {
    let subject_name = subject_name.trim();
    let deck_name = deck_name.trim();
    if subject_name.is_empty() {
        return Err(TransferError::MissingName { field: "subject name" });
    }
    if deck_name.is_empty() {
        return Err(TransferError::MissingName { field: "deck name" });
    }
    Ok((subject_name.to_string(), deck_name.to_string()))
}

fn parse_number<T: std::str::FromStr>(value: &str, column: &str) -> std::result::Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("{column} is not a valid number: {value:?}"))
}
