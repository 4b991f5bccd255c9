//! Errors surfaced to the user, one variant per distinct failure.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("--{first} and --{second} cannot be used together")]
    ConflictingFlags {
        first: &'static str,
        second: &'static str,
    },

    #[error("--speed must be between 0.25 and 3.0 (got {given})")]
    SpeedOutOfRange { given: f64 },

    #[error("--trailing-silence must be between 0.0 and 5.0 seconds (got {given})")]
    TrailingSilenceOutOfRange { given: f64 },

    #[error("invalid value for {key} in {path}: {reason}")]
    InvalidConfigValue {
        key: String,
        path: PathBuf,
        reason: String,
    },

    #[error("could not determine the user configuration directory")]
    ConfigDirUnavailable,

    #[error("could not access {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("could not encode {path}: {source}")]
    ConfigEncode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("no previous generation to continue from; synthesize something first")]
    NoHistory,

    #[error(
        "the last run produced {count} generations; pass --last-index with a value between 1 and {count}"
    )]
    LastIndexRequired { count: usize },

    #[error("--last-index {given} is out of range; valid values are between 1 and {count}")]
    LastIndexOutOfRange { given: u32, count: usize },

    #[error("instant mode requires streaming; drop --no-streaming or disable instant mode")]
    InstantModeNeedsStreaming,

    #[error("instant mode produces a single generation; --num-generations {requested} conflicts with it")]
    InstantModeSingleGeneration { requested: u32 },

    #[error("instant mode requires a voice (--voice-name or --voice-id) or a continuation context")]
    InstantModeNeedsVoice,

    #[error("no API key found; pass --api-key, set HUME_API_KEY, or run `hume login`")]
    MissingApiKey,

    #[error("no audio player found (tried {tried}); install one or pass --play-command")]
    PlayerNotFound { tried: String },

    #[error("audio player `{command}` failed: {source}")]
    PlayerIo {
        command: String,
        source: std::io::Error,
    },

    #[error("audio player `{command}` exited with {status}")]
    PlayerFailed { command: String, status: ExitStatus },

    #[error("could not write {path}: {source}")]
    WriteAudio {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not read standard input: {0}")]
    Stdin(std::io::Error),

    #[error("the service returned no audio")]
    NoAudioReturned,

    #[error("pass --generation-id or --last to pick the generation to save")]
    MissingVoiceSource,

    #[error(transparent)]
    Api(#[from] hume_api::Error),
}
