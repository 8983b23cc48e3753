//! Shared helpers for CLI integration tests.

use std::io::Cursor;
use std::path::PathBuf;

use clap::Parser;
use studydeck_cli::config::Config;
use studydeck_cli::error::Result;
use studydeck_cli::{execute, store, Cli};
use studydeck_core::{LibrarySnapshot, PersistPolicy};
use tempfile::TempDir;

/// A throwaway library directory.
pub struct TestContext {
    pub dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn library_path(&self) -> PathBuf {
        self.dir.path().join("library.json")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn config(&self) -> Config {
        Config {
            library_path: self.library_path(),
            persist_policy: PersistPolicy::BestEffort,
        }
    }

    /// Run a command with scripted stdin and return what it printed.
    pub async fn run_with_input(&self, args: &[&str], input: &str) -> Result<String> {
        let cli = Cli::parse_from(std::iter::once("studydeck").chain(args.iter().copied()));
        let mut input = Cursor::new(input.as_bytes().to_vec());
        let mut out = Vec::new();
        execute(cli, self.config(), &mut input, &mut out).await?;
        Ok(String::from_utf8(out).expect("output is UTF-8"))
    }

    pub async fn run(&self, args: &[&str]) -> String {
        self.run_with_input(args, "")
            .await
            .unwrap_or_else(|e| panic!("command {args:?} failed: {e}"))
    }

    pub fn snapshot(&self) -> LibrarySnapshot {
        store::load(&self.library_path())
            .and_then(|repo| Ok(repo.snapshot()?))
            .expect("Failed to read library")
    }

    /// A subject with one deck holding `cards` new cards.
    pub async fn seed(&self, cards: usize) {
        self.run(&["subject", "add", "Biology"]).await;
        self.run(&["deck", "add", "Biology", "Cells"]).await;
        for i in 0..cards {
            let front = format!("front {i}");
            let back = format!("back {i}");
            self.run(&["card", "add", "Biology", "Cells", &front, &back])
                .await;
        }
    }
}
