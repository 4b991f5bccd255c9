//! Persisted configuration.
//!
//! Two records live under the user's configuration directory: `config.json`
//! (global, survives across shells) and `session.json` (scoped to the current
//! working session, takes precedence over global). Both are flat JSON objects
//! keyed by dotted names such as `tts.voiceName`; keys this build does not
//! recognize are preserved verbatim on rewrite.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::reporter::Reporter;

pub mod keys {
    pub const API_KEY: &str = "apiKey";
    pub const VOICE_NAME: &str = "tts.voiceName";
    pub const VOICE_ID: &str = "tts.voiceId";
    pub const DESCRIPTION: &str = "tts.description";
    pub const NUM_GENERATIONS: &str = "tts.numGenerations";
    pub const OUTPUT_DIR: &str = "tts.outputDir";
    pub const PREFIX: &str = "tts.prefix";
    pub const PLAY: &str = "tts.play";
    pub const PLAY_COMMAND: &str = "tts.playCommand";
    pub const FORMAT: &str = "tts.format";
    pub const PROVIDER: &str = "tts.provider";
    pub const PRESET_VOICE: &str = "tts.presetVoice";
    pub const STREAMING: &str = "tts.streaming";
    pub const INSTANT_MODE: &str = "tts.instantMode";
    pub const SPEED: &str = "tts.speed";
    pub const TRAILING_SILENCE: &str = "tts.trailingSilence";
    pub const LAST: &str = "tts.last";
}

/// One flat configuration record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigRecord(serde_json::Map<String, Value>);

impl ConfigRecord {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.0.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    pub fn unset(&mut self, key: &str) -> bool {
        self.0.remove(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// Locates and reads the records on disk.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Store rooted at `<user config dir>/hume`.
    pub fn open_default() -> Result<Self, CliError> {
        let base = dirs::config_dir().ok_or(CliError::ConfigDirUnavailable)?;
        Ok(Self::at(base.join("hume")))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn global_path(&self) -> PathBuf {
        self.dir.join("config.json")
    }

    pub fn session_path(&self) -> PathBuf {
        self.dir.join("session.json")
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join("history.json")
    }

    pub fn load_global(&self) -> Result<ConfigRecord, CliError> {
        load_record(&self.global_path())
    }

    pub fn load_session(&self) -> Result<ConfigRecord, CliError> {
        load_record(&self.session_path())
    }

    pub fn save_global(&self, record: &ConfigRecord) -> Result<(), CliError> {
        save_record(&self.global_path(), record)
    }

    pub fn save_session(&self, record: &ConfigRecord) -> Result<(), CliError> {
        save_record(&self.session_path(), record)
    }
}

/// A missing file is an empty record; a present but corrupt file is an error.
fn load_record(path: &Path) -> Result<ConfigRecord, CliError> {
    if !path.exists() {
        return Ok(ConfigRecord::default());
    }
    let raw = fs::read_to_string(path).map_err(|source| CliError::ConfigIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

fn save_record(path: &Path, record: &ConfigRecord) -> Result<(), CliError> {
    let io_err = |source| CliError::ConfigIo {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut raw =
        serde_json::to_string_pretty(record).map_err(|source| CliError::ConfigEncode {
            path: path.to_path_buf(),
            source,
        })?;
    raw.push('\n');
    debug!(path = %path.display(), "writing config record");
    fs::write(path, raw).map_err(io_err)
}

pub fn run_command(
    args: &ConfigArgs,
    store: &ConfigStore,
    reporter: &Reporter,
) -> Result<(), CliError> {
    let (mut record, path) = if args.session {
        (store.load_session()?, store.session_path())
    } else {
        (store.load_global()?, store.global_path())
    };

    match &args.action {
        ConfigAction::Set { key, value } => {
            record.set(key, parse_value(value));
            save(store, args.session, &record)?;
            reporter.info(format!("{key} set in {}", path.display()));
        }
        ConfigAction::Get { key } => match record.get(key) {
            Some(value) if reporter.json_mode() => reporter.json(value),
            Some(value) => reporter.info(value.to_string()),
            None if reporter.json_mode() => reporter.json(&Value::Null),
            None => reporter.info(format!("{key} is not set")),
        },
        ConfigAction::Unset { key } => {
            if record.unset(key) {
                save(store, args.session, &record)?;
                reporter.info(format!("{key} removed from {}", path.display()));
            } else {
                reporter.info(format!("{key} is not set"));
            }
        }
        ConfigAction::List => {
            if reporter.json_mode() {
                reporter.json(&record.as_value());
            } else if record.is_empty() {
                reporter.info(format!("{} is empty", path.display()));
            } else {
                for (key, value) in record.entries() {
                    reporter.info(format!("{key} = {value}"));
                }
            }
        }
    }
    Ok(())
}

fn save(store: &ConfigStore, session: bool, record: &ConfigRecord) -> Result<(), CliError> {
    if session {
        store.save_session(record)
    } else {
        store.save_global(record)
    }
}

/// `config set` values are JSON when they parse as JSON, strings otherwise,
/// so `true`, `2`, and `hello` all land with their natural types.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_file_loads_as_empty_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at(dir.path());
        assert!(store.load_global().unwrap().is_empty());
    }

    #[test]
    fn records_round_trip_and_preserve_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at(dir.path());

        let mut record = ConfigRecord::default();
        record.set(keys::VOICE_NAME, json!("narrator"));
        record.set("experimental.someFutureKey", json!({"nested": true}));
        store.save_global(&record).unwrap();

        let loaded = store.load_global().unwrap();
        assert_eq!(loaded.get_string(keys::VOICE_NAME).as_deref(), Some("narrator"));
        assert_eq!(
            loaded.get("experimental.someFutureKey"),
            Some(&json!({"nested": true}))
        );
    }

    #[test]
    fn saved_file_holds_the_full_pretty_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at(dir.path());

        let mut record = ConfigRecord::default();
        record.set(keys::VOICE_NAME, json!("narrator"));
        record.set(keys::SPEED, json!(1.5));
        store.save_global(&record).unwrap();

        let raw = fs::read_to_string(store.global_path()).unwrap();
        let mut expected = serde_json::to_string_pretty(&record).unwrap();
        expected.push('\n');
        assert_eq!(raw, expected);
    }

    #[test]
    fn corrupt_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at(dir.path());
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(store.global_path(), "not json").unwrap();
        assert!(matches!(
            store.load_global(),
            Err(CliError::ConfigParse { .. })
        ));
    }

    #[test]
    fn set_values_parse_as_json_first() {
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("2"), json!(2));
        assert_eq!(parse_value("1.5"), json!(1.5));
        assert_eq!(parse_value("narrator"), json!("narrator"));
    }

    #[test]
    fn session_and_global_records_are_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at(dir.path());

        let mut global = ConfigRecord::default();
        global.set(keys::PREFIX, json!("g-"));
        store.save_global(&global).unwrap();

        let mut session = ConfigRecord::default();
        session.set(keys::PREFIX, json!("s-"));
        store.save_session(&session).unwrap();

        assert_eq!(store.load_global().unwrap().get_string(keys::PREFIX).as_deref(), Some("g-"));
        assert_eq!(store.load_session().unwrap().get_string(keys::PREFIX).as_deref(), Some("s-"));
    }
}
