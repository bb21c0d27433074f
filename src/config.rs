//! Configuration types.

use std::path::PathBuf;

/// Engine settings, read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Path to the session database file.
    pub db_path: PathBuf,
    /// Optional path to a reference-data document overriding the
    /// built-in dataset.
    pub reference_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/stage-diagnostic.db"),
            reference_path: None,
        }
    }
}

impl Settings {
    /// Read settings from environment variables, falling back to defaults.
    ///
    /// `STAGE_DB_PATH` — session database file.
    /// `STAGE_REFERENCE_PATH` — reference-data JSON overriding the built-in set.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            db_path: std::env::var("STAGE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            reference_path: std::env::var("STAGE_REFERENCE_PATH").ok().map(PathBuf::from),
        }
    }
}
