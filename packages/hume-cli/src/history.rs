//! Record of the most recent synthesis run.
//!
//! Exactly one run is remembered. Saving replaces the whole record, so
//! `--last` always refers to the run that actually happened last.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CliError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationHistory {
    /// Generation ids in the order the run produced them.
    pub ids: Vec<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl GenerationHistory {
    pub fn now(ids: Vec<String>) -> Self {
        Self {
            ids,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing or unreadable record reads as `None`; continuation then
    /// reports "no history" rather than a parse failure.
    pub fn get(&self) -> Option<GenerationHistory> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(history) => Some(history),
            Err(err) => {
                debug!(path = %self.path.display(), %err, "ignoring unreadable history");
                None
            }
        }
    }

    /// Unconditional overwrite; ids never accumulate across runs.
    pub fn save(&self, history: &GenerationHistory) -> Result<(), CliError> {
        let io_err = |source| CliError::ConfigIo {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut raw =
            serde_json::to_string_pretty(history).map_err(|source| CliError::ConfigEncode {
                path: self.path.clone(),
                source,
            })?;
        raw.push('\n');
        fs::write(&self.path, raw).map_err(io_err)
    }
}
