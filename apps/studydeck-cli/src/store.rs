//! Library file persistence.
//!
//! The whole library lives in one JSON document. It is read into a [`MemoryRepository`] at
//! startup and written back after commands that change it.

use std::fs;
use std::path::Path;

use studydeck_core::{LibrarySnapshot, MemoryRepository};

use crate::error::{CliError, Result};

/// Load the library at `path`. A missing file is an empty library.
pub fn load(path: &Path) -> Result<MemoryRepository> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "library file missing, starting empty");
        return Ok(MemoryRepository::new());
    }

    let corrupt = |reason: String| CliError::CorruptLibrary {
        path: path.to_path_buf(),
        reason,
    };

    let content = fs::read_to_string(path)?;
    let snapshot: LibrarySnapshot =
        serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;
    for card in &snapshot.cards {
        card.review_state
            .validate()
            .map_err(|reason| corrupt(format!("card {}: {reason}", card.id)))?;
    }
    tracing::debug!(
        path = %path.display(),
        cards = snapshot.cards.len(),
        "loaded library"
    );
    Ok(MemoryRepository::from_snapshot(snapshot))
}

/// Write the library to `path`, replacing the previous file only once the new one is complete.
pub fn save(path: &Path, repository: &MemoryRepository) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let snapshot = repository.snapshot()?;
    let json = serde_json::to_string_pretty(&snapshot).map_err(std::io::Error::from)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), "saved library");
    Ok(())
}
