//! Runtime configuration from the environment.

use std::path::PathBuf;

use studydeck_core::PersistPolicy;

use crate::error::{CliError, Result};

pub const LIBRARY_ENV: &str = "STUDYDECK_LIBRARY";
pub const PERSIST_ENV: &str = "STUDYDECK_PERSIST";

/// Resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub library_path: PathBuf,
    pub persist_policy: PersistPolicy,
}

impl Config {
    /// Read configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            std::env::var(LIBRARY_ENV).ok(),
            std::env::var(PERSIST_ENV).ok(),
        )
    }

    fn from_vars(library: Option<String>, persist: Option<String>) -> Result<Self> {
        let library_path = library
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_library_path);

        let persist_policy = match persist.as_deref().map(str::trim) {
            None | Some("") => PersistPolicy::default(),
            Some(value) => PersistPolicy::from_str(value).ok_or_else(|| {
                CliError::Config(format!(
                    "{PERSIST_ENV} must be best_effort or durable, got {value:?}"
                ))
            })?,
        };

        Ok(Self {
            library_path,
            persist_policy,
        })
    }
}

fn default_library_path() -> PathBuf {
    // Working directory when the platform has no data dir
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("studydeck")
        .join("library.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_vars(None, None).unwrap();
        assert_eq!(config.persist_policy, PersistPolicy::BestEffort);
        assert!(config.library_path.ends_with("studydeck/library.json"));
    }

    #[test]
    fn reads_explicit_values() {
        let config =
            Config::from_vars(Some("/tmp/lib.json".into()), Some("durable".into())).unwrap();
        assert_eq!(config.library_path, PathBuf::from("/tmp/lib.json"));
        assert_eq!(config.persist_policy, PersistPolicy::Durable);
    }

    #[test]
    fn rejects_unknown_policy() {
        let result = Config::from_vars(None, Some("sometimes".into()));
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
