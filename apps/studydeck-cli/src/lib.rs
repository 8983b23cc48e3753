pub mod commands;
pub mod config;
pub mod error;
pub mod store;

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use studydeck_core::{DueScope, PersistPolicy, SessionConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::transfer::ExportFormat;
use crate::config::Config;
use crate::error::Result;

/// Spaced repetition flashcards in the terminal
#[derive(Debug, Parser)]
#[command(name = "studydeck", version)]
pub struct Cli {
    /// Library file to use instead of the configured one
    #[arg(long, global = true)]
    pub library: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage subjects
    Subject {
        #[command(subcommand)]
        action: SubjectCommand,
    },
    /// Manage decks
    Deck {
        #[command(subcommand)]
        action: DeckCommand,
    },
    /// Manage cards
    Card {
        #[command(subcommand)]
        action: CardCommand,
    },
    /// List subjects and decks with due counts
    List,
    /// Review due cards
    Study {
        #[arg(long, requires = "deck")]
        subject: Option<String>,
        #[arg(long, requires = "subject")]
        deck: Option<String>,
        /// Save each review before moving on
        #[arg(long)]
        durable: bool,
    },
    /// Import a deck from a .json export, a .csv file or .txt notes
    Import {
        file: PathBuf,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        deck: Option<String>,
    },
    /// Export a deck
    Export {
        subject: String,
        deck: String,
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show review statistics
    Stats {
        #[arg(long, default_value_t = 14)]
        days: usize,
    },
}

#[derive(Debug, Subcommand)]
pub enum SubjectCommand {
    Add {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    Rename {
        name: String,
        new_name: String,
    },
    Delete {
        name: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum DeckCommand {
    Add {
        subject: String,
        name: String,
    },
    Rename {
        subject: String,
        deck: String,
        new_name: String,
    },
    Delete {
        subject: String,
        deck: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum CardCommand {
    Add {
        subject: String,
        deck: String,
        front: String,
        back: String,
    },
    /// List the cards of a deck
    List { subject: String, deck: String },
    /// Change the text of the card with this front
    Edit {
        subject: String,
        deck: String,
        front: String,
        #[arg(long = "front", id = "new_front")]
        new_front: Option<String>,
        #[arg(long = "back")]
        new_back: Option<String>,
    },
    /// Delete the card with this front and its review history
    Delete {
        subject: String,
        deck: String,
        front: String,
    },
}

impl Command {
    fn mutates(&self) -> bool {
        !matches!(
            self,
            Command::List
                | Command::Export { .. }
                | Command::Stats { .. }
                | Command::Card {
                    action: CardCommand::List { .. }
                }
        )
    }
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout();
    execute(cli, config, &mut input, &mut out).await?;
    Ok(())
}

/// Run one parsed command against the library named by `config` or `--library`.
pub async fn execute(
    cli: Cli,
    mut config: Config,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    if let Some(path) = cli.library {
        config.library_path = path;
    }
    tracing::debug!(library = %config.library_path.display(), "loading library");

    let repo = Arc::new(store::load(&config.library_path)?);
    let now = Utc::now();
    let mutates = cli.command.mutates();

    match cli.command {
        Command::Subject { action } => match action {
            SubjectCommand::Add { name, description } => {
                let subject = commands::manage::add_subject(&repo, &name, &description)?;
                writeln!(out, "Added subject {}", subject.name)?;
            }
            SubjectCommand::Rename { name, new_name } => {
                let subject = commands::manage::rename_subject(&repo, &name, &new_name)?;
                writeln!(out, "Renamed subject to {}", subject.name)?;
            }
            SubjectCommand::Delete { name } => {
                commands::manage::delete_subject(&repo, &name)?;
                writeln!(out, "Deleted subject {name}")?;
            }
        },
        Command::Deck { action } => match action {
            DeckCommand::Add { subject, name } => {
                let deck = commands::manage::add_deck(&repo, &subject, &name, now)?;
                writeln!(out, "Added deck {}", deck.name)?;
            }
            DeckCommand::Rename {
                subject,
                deck,
                new_name,
            } => {
                let deck = commands::manage::rename_deck(&repo, &subject, &deck, &new_name)?;
                writeln!(out, "Renamed deck to {}", deck.name)?;
            }
            DeckCommand::Delete { subject, deck } => {
                commands::manage::delete_deck(&repo, &subject, &deck)?;
                writeln!(out, "Deleted deck {deck}")?;
            }
        },
        Command::Card { action } => match action {
            CardCommand::Add {
                subject,
                deck,
                front,
                back,
            } => {
                commands::manage::add_card(&repo, &subject, &deck, &front, &back, now)?;
                writeln!(out, "Added card to {deck}")?;
            }
            CardCommand::List { subject, deck } => {
                commands::manage::list_cards(&repo, &subject, &deck, out)?
            }
            CardCommand::Edit {
                subject,
                deck,
                front,
                new_front,
                new_back,
            } => {
                let card = commands::manage::edit_card(
                    &repo,
                    &subject,
                    &deck,
                    &front,
                    new_front.as_deref(),
                    new_back.as_deref(),
                )?;
                writeln!(out, "Updated card {}", card.front)?;
            }
            CardCommand::Delete {
                subject,
                deck,
                front,
            } => {
                commands::manage::delete_card(&repo, &subject, &deck, &front)?;
                writeln!(out, "Deleted card {front}")?;
            }
        },
        Command::List => commands::manage::list(&repo, now, out)?,
        Command::Study {
            subject,
            deck,
            durable,
        } => {
            let scope = match (subject, deck) {
                (Some(subject), Some(deck)) => {
                    let (_, deck) = commands::resolve_deck(&repo, &subject, &deck)?;
                    DueScope::Deck(deck.id)
                }
                _ => DueScope::AllCards,
            };
            let persist_policy = if durable {
                PersistPolicy::Durable
            } else {
                config.persist_policy
            };
            let session = SessionConfig { persist_policy };
            let report = commands::study::run(repo.clone(), scope, session, input, out).await?;
            if report.unsaved > 0 {
                writeln!(out, "{} reviews could not be saved.", report.unsaved)?;
            }
        }
        Command::Import {
            file,
            subject,
            deck,
        } => {
            let summary = commands::transfer::import_file(
                &repo,
                &file,
                subject.as_deref(),
                deck.as_deref(),
                now,
            )?;
            writeln!(
                out,
                "Imported {} cards into {} / {}",
                summary.imported_cards, summary.subject.name, summary.deck.name
            )?;
        }
        Command::Export {
            subject,
            deck,
            format,
            out: path,
        } => {
            let rendered = commands::transfer::export_deck(&repo, &subject, &deck, format, now)?;
            commands::transfer::write_export(&rendered, path.as_deref(), out)?;
        }
        Command::Stats { days } => commands::stats::show(&repo, now, days, out)?,
    }

    if mutates {
        store::save(&config.library_path, &repo)?;
    }
    Ok(())
}
