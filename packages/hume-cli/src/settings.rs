//! Layered resolution of synthesis options.
//!
//! Every option can come from four places. From weakest to strongest:
//! built-in defaults, the global config record, the session config record,
//! and command-line flags. Resolution walks that stack per field and keeps
//! the strongest value, tagging it with its [`Source`] so cross-field rules
//! (the voice name/id override) can compare where values came from.
//!
//! [`resolve`] is a pure function of its inputs: it reads no environment and
//! no files, and resolving the same inputs twice yields the same options.

use std::path::PathBuf;
use std::sync::LazyLock;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::cli::TtsArgs;
use crate::config::{ConfigRecord, keys};
use crate::error::CliError;

pub const SPEED_RANGE: (f64, f64) = (0.25, 3.0);
pub const TRAILING_SILENCE_RANGE: (f64, f64) = (0.0, 5.0);

/// Where a resolved value came from. The derived order is the override
/// order: a later variant beats an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Source {
    BuiltIn,
    Global,
    Session,
    Flag,
}

/// A value tagged with the layer that supplied it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sourced<T> {
    pub value: T,
    pub source: Source,
}

impl<T> Sourced<T> {
    fn new(value: T, source: Source) -> Self {
        Self { value, source }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Pick the strongest layer that has a value for one field.
pub fn cascade<T>(
    flag: Option<T>,
    session: Option<T>,
    global: Option<T>,
    builtin: Option<T>,
) -> Option<Sourced<T>> {
    flag.map(|v| Sourced::new(v, Source::Flag))
        .or_else(|| session.map(|v| Sourced::new(v, Source::Session)))
        .or_else(|| global.map(|v| Sourced::new(v, Source::Global)))
        .or_else(|| builtin.map(|v| Sourced::new(v, Source::BuiltIn)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    All,
    First,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Mp3,
    Pcm,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Pcm => "pcm",
        }
    }

    pub fn to_wire(self) -> hume_api::endpoints::tts::Format {
        use hume_api::endpoints::tts::Format;
        match self {
            AudioFormat::Wav => Format::Wav,
            AudioFormat::Mp3 => Format::Mp3,
            AudioFormat::Pcm => Format::Pcm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[value(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoiceProvider {
    HumeAi,
    CustomVoice,
}

impl VoiceProvider {
    pub fn to_wire(self) -> hume_api::endpoints::tts::VoiceProvider {
        use hume_api::endpoints::tts::VoiceProvider as Wire;
        match self {
            VoiceProvider::HumeAi => Wire::HumeAi,
            VoiceProvider::CustomVoice => Wire::CustomVoice,
        }
    }
}

/// The values one layer contributes. `None` means the layer is silent on
/// that field and resolution falls through to the next one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsLayer {
    pub voice_name: Option<String>,
    pub voice_id: Option<String>,
    pub description: Option<String>,
    pub num_generations: Option<u32>,
    pub output_dir: Option<PathBuf>,
    pub prefix: Option<String>,
    pub play: Option<PlayMode>,
    pub play_command: Option<String>,
    pub format: Option<AudioFormat>,
    pub provider: Option<VoiceProvider>,
    pub preset_voice: Option<bool>,
    pub streaming: Option<bool>,
    pub instant_mode: Option<bool>,
    pub speed: Option<f64>,
    pub trailing_silence: Option<f64>,
    pub last: Option<bool>,
}

impl SettingsLayer {
    /// Typed view of a config record. `null` counts as absent; a value of
    /// the wrong shape is an error naming the key and file.
    pub fn from_record(record: &ConfigRecord, path: &std::path::Path) -> Result<Self, CliError> {
        Ok(Self {
            voice_name: typed(record, keys::VOICE_NAME, path)?,
            voice_id: typed(record, keys::VOICE_ID, path)?,
            description: typed(record, keys::DESCRIPTION, path)?,
            num_generations: typed(record, keys::NUM_GENERATIONS, path)?,
            output_dir: typed(record, keys::OUTPUT_DIR, path)?,
            prefix: typed(record, keys::PREFIX, path)?,
            play: typed(record, keys::PLAY, path)?,
            play_command: typed(record, keys::PLAY_COMMAND, path)?,
            format: typed(record, keys::FORMAT, path)?,
            provider: typed(record, keys::PROVIDER, path)?,
            preset_voice: typed(record, keys::PRESET_VOICE, path)?,
            streaming: typed(record, keys::STREAMING, path)?,
            instant_mode: typed(record, keys::INSTANT_MODE, path)?,
            speed: typed(record, keys::SPEED, path)?,
            trailing_silence: typed(record, keys::TRAILING_SILENCE, path)?,
            last: typed(record, keys::LAST, path)?,
        })
    }
}

fn typed<T: serde::de::DeserializeOwned>(
    record: &ConfigRecord,
    key: &str,
    path: &std::path::Path,
) -> Result<Option<T>, CliError> {
    match record.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|e| {
            CliError::InvalidConfigValue {
                key: key.to_string(),
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        }),
    }
}

static BUILTIN_DEFAULTS: LazyLock<SettingsLayer> = LazyLock::new(|| SettingsLayer {
    num_generations: Some(1),
    output_dir: Some(PathBuf::from("./tts-audio")),
    prefix: Some("tts-".to_string()),
    play: Some(PlayMode::All),
    format: Some(AudioFormat::Wav),
    preset_voice: Some(false),
    streaming: Some(true),
    instant_mode: Some(false),
    last: Some(false),
    ..SettingsLayer::default()
});

pub fn builtin_defaults() -> &'static SettingsLayer {
    &BUILTIN_DEFAULTS
}

/// Everything the synthesis pipeline needs, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTtsOptions {
    pub text: String,
    pub voice_name: Option<String>,
    pub voice_id: Option<String>,
    pub description: Option<String>,
    pub context_generation_id: Option<String>,
    pub last: bool,
    pub last_index: Option<u32>,
    pub num_generations: u32,
    pub output_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub prefix: String,
    pub play: PlayMode,
    pub play_command: Option<String>,
    pub format: AudioFormat,
    pub provider: Option<VoiceProvider>,
    pub preset_voice: bool,
    pub streaming: bool,
    pub instant_mode: bool,
    pub speed: Option<f64>,
    pub trailing_silence: Option<f64>,
}

pub fn resolve(
    args: &TtsArgs,
    session: &SettingsLayer,
    global: &SettingsLayer,
) -> Result<ResolvedTtsOptions, CliError> {
    check_flag_exclusions(args)?;

    let flags = args.as_layer();
    let defaults = builtin_defaults();

    let name = cascade(
        flags.voice_name,
        session.voice_name.clone(),
        global.voice_name.clone(),
        None,
    );
    let id = cascade(
        flags.voice_id,
        session.voice_id.clone(),
        global.voice_id.clone(),
        None,
    );
    let (voice_name, voice_id) = resolve_voice(name, id);

    let speed = cascade(flags.speed, session.speed, global.speed, defaults.speed)
        .map(Sourced::into_value);
    if let Some(given) = speed {
        if !(SPEED_RANGE.0..=SPEED_RANGE.1).contains(&given) {
            return Err(CliError::SpeedOutOfRange { given });
        }
    }
    let trailing_silence = cascade(
        flags.trailing_silence,
        session.trailing_silence,
        global.trailing_silence,
        defaults.trailing_silence,
    )
    .map(Sourced::into_value);
    if let Some(given) = trailing_silence {
        if !(TRAILING_SILENCE_RANGE.0..=TRAILING_SILENCE_RANGE.1).contains(&given) {
            return Err(CliError::TrailingSilenceOutOfRange { given });
        }
    }

    Ok(ResolvedTtsOptions {
        text: args.text.clone(),
        voice_name,
        voice_id,
        description: cascade(
            flags.description,
            session.description.clone(),
            global.description.clone(),
            defaults.description.clone(),
        )
        .map(Sourced::into_value),
        // Continuation inputs never come from config records.
        context_generation_id: args.context_generation_id.clone(),
        last: cascade(flags.last, session.last, global.last, defaults.last)
            .map(Sourced::into_value)
            .unwrap_or(false),
        last_index: args.last_index,
        num_generations: cascade(
            flags.num_generations,
            session.num_generations,
            global.num_generations,
            defaults.num_generations,
        )
        .map(Sourced::into_value)
        .unwrap_or(1),
        output_file: args.output_file.clone(),
        output_dir: cascade(
            flags.output_dir,
            session.output_dir.clone(),
            global.output_dir.clone(),
            defaults.output_dir.clone(),
        )
        .map(Sourced::into_value)
        .unwrap_or_else(|| PathBuf::from("./tts-audio")),
        prefix: cascade(
            flags.prefix,
            session.prefix.clone(),
            global.prefix.clone(),
            defaults.prefix.clone(),
        )
        .map(Sourced::into_value)
        .unwrap_or_else(|| "tts-".to_string()),
        play: cascade(flags.play, session.play, global.play, defaults.play)
            .map(Sourced::into_value)
            .unwrap_or(PlayMode::All),
        play_command: cascade(
            flags.play_command,
            session.play_command.clone(),
            global.play_command.clone(),
            defaults.play_command.clone(),
        )
        .map(Sourced::into_value),
        format: cascade(flags.format, session.format, global.format, defaults.format)
            .map(Sourced::into_value)
            .unwrap_or(AudioFormat::Wav),
        provider: cascade(
            flags.provider,
            session.provider,
            global.provider,
            defaults.provider,
        )
        .map(Sourced::into_value),
        preset_voice: cascade(
            flags.preset_voice,
            session.preset_voice,
            global.preset_voice,
            defaults.preset_voice,
        )
        .map(Sourced::into_value)
        .unwrap_or(false),
        streaming: cascade(
            flags.streaming,
            session.streaming,
            global.streaming,
            defaults.streaming,
        )
        .map(Sourced::into_value)
        .unwrap_or(true),
        instant_mode: cascade(
            flags.instant_mode,
            session.instant_mode,
            global.instant_mode,
            defaults.instant_mode,
        )
        .map(Sourced::into_value)
        .unwrap_or(false),
        speed,
        trailing_silence,
    })
}

/// The pairs that cannot be combined on one command line. Only flags as
/// typed count here; a config record may hold both halves of a pair.
fn check_flag_exclusions(args: &TtsArgs) -> Result<(), CliError> {
    if args.voice_name.is_some() && args.voice_id.is_some() {
        return Err(CliError::ConflictingFlags {
            first: "voice-name",
            second: "voice-id",
        });
    }
    if args.output_file.is_some() && args.num_generations.is_some() {
        return Err(CliError::ConflictingFlags {
            first: "output-file",
            second: "num-generations",
        });
    }
    if args.last && args.context_generation_id.is_some() {
        return Err(CliError::ConflictingFlags {
            first: "last",
            second: "context-generation-id",
        });
    }
    Ok(())
}

/// When a name and an id are both in play, only the stronger-sourced one
/// survives. Equal strength resolves to the id.
fn resolve_voice(
    name: Option<Sourced<String>>,
    id: Option<Sourced<String>>,
) -> (Option<String>, Option<String>) {
    match (name, id) {
        (Some(name), Some(id)) => {
            if name.source > id.source {
                (Some(name.value), None)
            } else {
                (None, Some(id.value))
            }
        }
        (name, id) => (name.map(Sourced::into_value), id.map(Sourced::into_value)),
    }
}

/// Process environment snapshot, captured once at startup.
#[derive(Debug, Clone, Default)]
pub struct EnvSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl EnvSettings {
    pub fn capture() -> Self {
        Self {
            api_key: non_empty_var("HUME_API_KEY"),
            base_url: non_empty_var("HUME_BASE_URL"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// The API key has its own stack: flag, then environment, then session,
/// then global. A miss everywhere is an error before any network use.
pub fn resolve_api_key(
    flag: Option<String>,
    env: Option<String>,
    session: Option<String>,
    global: Option<String>,
) -> Result<String, CliError> {
    flag.or(env)
        .or(session)
        .or(global)
        .ok_or(CliError::MissingApiKey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(text: &str) -> TtsArgs {
        TtsArgs {
            text: text.to_string(),
            ..TtsArgs::default()
        }
    }

    fn layer() -> SettingsLayer {
        SettingsLayer::default()
    }

    #[test]
    fn flag_beats_session_beats_global_beats_builtin() {
        let mut cli = args("hi");
        cli.prefix = Some("flag-".into());
        let session = SettingsLayer {
            prefix: Some("session-".into()),
            ..layer()
        };
        let global = SettingsLayer {
            prefix: Some("global-".into()),
            ..layer()
        };

        let resolved = resolve(&cli, &session, &global).unwrap();
        assert_eq!(resolved.prefix, "flag-");

        let resolved = resolve(&args("hi"), &session, &global).unwrap();
        assert_eq!(resolved.prefix, "session-");

        let resolved = resolve(&args("hi"), &layer(), &global).unwrap();
        assert_eq!(resolved.prefix, "global-");

        let resolved = resolve(&args("hi"), &layer(), &layer()).unwrap();
        assert_eq!(resolved.prefix, "tts-");
    }

    #[test]
    fn builtin_defaults_fill_everything_else() {
        let resolved = resolve(&args("hi"), &layer(), &layer()).unwrap();
        assert_eq!(resolved.num_generations, 1);
        assert_eq!(resolved.output_dir, PathBuf::from("./tts-audio"));
        assert_eq!(resolved.play, PlayMode::All);
        assert_eq!(resolved.format, AudioFormat::Wav);
        assert!(resolved.streaming);
        assert!(!resolved.instant_mode);
        assert!(!resolved.preset_voice);
        assert!(!resolved.last);
        assert_eq!(resolved.description, None);
        assert_eq!(resolved.speed, None);
        assert_eq!(resolved.trailing_silence, None);
        assert_eq!(resolved.voice_name, None);
    }

    #[test]
    fn flag_voice_id_silences_global_voice_name() {
        let mut cli = args("hi");
        cli.voice_id = Some("id-1".into());
        let global = SettingsLayer {
            voice_name: Some("narrator".into()),
            ..layer()
        };

        let resolved = resolve(&cli, &layer(), &global).unwrap();
        assert_eq!(resolved.voice_id.as_deref(), Some("id-1"));
        assert_eq!(resolved.voice_name, None);
    }

    #[test]
    fn flag_voice_name_silences_session_voice_id() {
        let mut cli = args("hi");
        cli.voice_name = Some("narrator".into());
        let session = SettingsLayer {
            voice_id: Some("id-1".into()),
            ..layer()
        };

        let resolved = resolve(&cli, &session, &layer()).unwrap();
        assert_eq!(resolved.voice_name.as_deref(), Some("narrator"));
        assert_eq!(resolved.voice_id, None);
    }

    #[test]
    fn voice_tie_in_one_layer_resolves_to_the_id() {
        let session = SettingsLayer {
            voice_name: Some("narrator".into()),
            voice_id: Some("id-1".into()),
            ..layer()
        };

        let resolved = resolve(&args("hi"), &session, &layer()).unwrap();
        assert_eq!(resolved.voice_id.as_deref(), Some("id-1"));
        assert_eq!(resolved.voice_name, None);
    }

    #[test]
    fn lone_voice_name_survives() {
        let global = SettingsLayer {
            voice_name: Some("narrator".into()),
            ..layer()
        };
        let resolved = resolve(&args("hi"), &layer(), &global).unwrap();
        assert_eq!(resolved.voice_name.as_deref(), Some("narrator"));
        assert_eq!(resolved.voice_id, None);
    }

    #[test]
    fn voice_name_and_id_flags_conflict() {
        let mut cli = args("hi");
        cli.voice_name = Some("narrator".into());
        cli.voice_id = Some("id-1".into());
        assert!(matches!(
            resolve(&cli, &layer(), &layer()),
            Err(CliError::ConflictingFlags {
                first: "voice-name",
                second: "voice-id",
            })
        ));
    }

    #[test]
    fn output_file_and_num_generations_flags_conflict() {
        let mut cli = args("hi");
        cli.output_file = Some(PathBuf::from("out.wav"));
        cli.num_generations = Some(2);
        assert!(matches!(
            resolve(&cli, &layer(), &layer()),
            Err(CliError::ConflictingFlags { .. })
        ));
    }

    #[test]
    fn last_and_context_generation_id_flags_conflict() {
        let mut cli = args("hi");
        cli.last = true;
        cli.context_generation_id = Some("gen_1".into());
        assert!(matches!(
            resolve(&cli, &layer(), &layer()),
            Err(CliError::ConflictingFlags { .. })
        ));
    }

    #[test]
    fn config_layers_may_hold_both_halves_of_a_pair() {
        let session = SettingsLayer {
            voice_name: Some("narrator".into()),
            voice_id: Some("id-1".into()),
            num_generations: Some(3),
            ..layer()
        };
        let mut cli = args("hi");
        cli.output_file = Some(PathBuf::from("out.wav"));
        // numGenerations comes from config, not a flag, so no conflict.
        assert!(resolve(&cli, &session, &layer()).is_ok());
    }

    #[test]
    fn speed_outside_range_aborts() {
        let mut cli = args("hi");
        cli.speed = Some(3.5);
        assert!(matches!(
            resolve(&cli, &layer(), &layer()),
            Err(CliError::SpeedOutOfRange { .. })
        ));

        let global = SettingsLayer {
            speed: Some(0.1),
            ..layer()
        };
        assert!(matches!(
            resolve(&args("hi"), &layer(), &global),
            Err(CliError::SpeedOutOfRange { .. })
        ));
    }

    #[test]
    fn range_boundaries_are_inclusive() {
        let mut cli = args("hi");
        cli.speed = Some(0.25);
        cli.trailing_silence = Some(5.0);
        let resolved = resolve(&cli, &layer(), &layer()).unwrap();
        assert_eq!(resolved.speed, Some(0.25));
        assert_eq!(resolved.trailing_silence, Some(5.0));
    }

    #[test]
    fn trailing_silence_outside_range_aborts() {
        let mut cli = args("hi");
        cli.trailing_silence = Some(5.1);
        assert!(matches!(
            resolve(&cli, &layer(), &layer()),
            Err(CliError::TrailingSilenceOutOfRange { .. })
        ));
    }

    #[test]
    fn resolution_is_idempotent() {
        let mut cli = args("hi");
        cli.voice_id = Some("id-1".into());
        cli.speed = Some(2.0);
        let session = SettingsLayer {
            prefix: Some("s-".into()),
            streaming: Some(false),
            ..layer()
        };
        let global = SettingsLayer {
            voice_name: Some("narrator".into()),
            ..layer()
        };

        let first = resolve(&cli, &session, &global).unwrap();
        let second = resolve(&cli, &session, &global).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn from_record_reads_typed_values_and_skips_null() {
        let mut record = ConfigRecord::default();
        record.set(keys::VOICE_NAME, json!("narrator"));
        record.set(keys::NUM_GENERATIONS, json!(3));
        record.set(keys::STREAMING, json!(false));
        record.set(keys::SPEED, json!(1.5));
        record.set(keys::FORMAT, json!("mp3"));
        record.set(keys::PLAY, json!("off"));
        record.set(keys::PROVIDER, json!("HUME_AI"));
        record.set(keys::DESCRIPTION, json!(null));

        let path = std::path::Path::new("config.json");
        let parsed = SettingsLayer::from_record(&record, path).unwrap();
        assert_eq!(parsed.voice_name.as_deref(), Some("narrator"));
        assert_eq!(parsed.num_generations, Some(3));
        assert_eq!(parsed.streaming, Some(false));
        assert_eq!(parsed.speed, Some(1.5));
        assert_eq!(parsed.format, Some(AudioFormat::Mp3));
        assert_eq!(parsed.play, Some(PlayMode::Off));
        assert_eq!(parsed.provider, Some(VoiceProvider::HumeAi));
        assert_eq!(parsed.description, None);
    }

    #[test]
    fn from_record_rejects_wrongly_typed_values() {
        let mut record = ConfigRecord::default();
        record.set(keys::NUM_GENERATIONS, json!("three"));
        let err = SettingsLayer::from_record(&record, std::path::Path::new("config.json"))
            .unwrap_err();
        assert!(matches!(err, CliError::InvalidConfigValue { key, .. } if key == keys::NUM_GENERATIONS));
    }

    #[test]
    fn api_key_prefers_flag_then_env_then_session_then_global() {
        let key = resolve_api_key(
            Some("from-flag".into()),
            Some("from-env".into()),
            Some("from-session".into()),
            Some("from-global".into()),
        )
        .unwrap();
        assert_eq!(key, "from-flag");

        let key = resolve_api_key(
            None,
            Some("from-env".into()),
            Some("from-session".into()),
            None,
        )
        .unwrap();
        assert_eq!(key, "from-env");

        let key = resolve_api_key(None, None, Some("from-session".into()), None).unwrap();
        assert_eq!(key, "from-session");

        assert!(matches!(
            resolve_api_key(None, None, None, None),
            Err(CliError::MissingApiKey)
        ));
    }
}
