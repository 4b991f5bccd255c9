//! Command-line definitions for the `hume` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::settings::{AudioFormat, PlayMode, SettingsLayer, VoiceProvider};

#[derive(Parser, Debug)]
#[command(
    name = "hume",
    version,
    about = "Command-line client for the Hume speech-synthesis API"
)]
pub struct Cli {
    /// Emit a machine-readable JSON summary on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// API key, overriding HUME_API_KEY and stored configuration
    #[arg(long, global = true, value_name = "KEY")]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synthesize speech from text
    Tts(TtsArgs),

    /// List, save, or delete voices
    #[command(subcommand)]
    Voices(VoicesCommand),

    /// Read or write persisted configuration
    Config(ConfigArgs),

    /// Store an API key for future runs
    Login,

    /// Remove the stored API key
    Logout,
}

#[derive(Args, Debug, Clone, Default)]
pub struct TtsArgs {
    /// Text to speak; pass `-` to read it from standard input
    pub text: String,

    /// Voice to speak with, by name
    #[arg(short = 'v', long, value_name = "NAME")]
    pub voice_name: Option<String>,

    /// Voice to speak with, by id
    #[arg(long, value_name = "ID")]
    pub voice_id: Option<String>,

    /// Acting instructions shaping the delivery
    #[arg(short = 'd', long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Continue from a specific earlier generation
    #[arg(short = 'c', long, value_name = "GENERATION_ID")]
    pub context_generation_id: Option<String>,

    /// Continue from the most recent synthesis
    #[arg(long)]
    pub last: bool,

    /// 1-based pick when the last run produced several generations
    #[arg(long, value_name = "N")]
    pub last_index: Option<u32>,

    /// How many variations to synthesize
    #[arg(short = 'n', long, value_name = "N")]
    pub num_generations: Option<u32>,

    /// Exact output path (implies a single generation)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// Directory for generated audio
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Filename prefix for generated audio
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Which generations to play once audio exists
    #[arg(short = 'p', long, value_enum, value_name = "MODE")]
    pub play: Option<PlayMode>,

    /// Player command; `$AUDIO_FILE` stands in for the file path
    #[arg(long, value_name = "COMMAND")]
    pub play_command: Option<String>,

    /// Audio container format
    #[arg(short = 'f', long, value_enum, value_name = "FORMAT")]
    pub format: Option<AudioFormat>,

    /// Library the voice reference points into
    #[arg(long, value_enum, value_name = "PROVIDER")]
    pub provider: Option<VoiceProvider>,

    /// Deprecated alias for `--provider HUME_AI`
    #[arg(long)]
    pub preset_voice: bool,

    /// Speaking speed multiplier, 0.25 to 3.0
    #[arg(long, value_name = "FACTOR")]
    pub speed: Option<f64>,

    /// Seconds of silence appended after the utterance, 0.0 to 5.0
    #[arg(long, value_name = "SECONDS")]
    pub trailing_silence: Option<f64>,

    /// Play and save audio as it is synthesized (the default)
    #[arg(long, overrides_with = "no_streaming")]
    pub streaming: bool,

    /// Wait for the complete synthesis before writing anything
    #[arg(long, overrides_with = "streaming")]
    pub no_streaming: bool,

    /// Lowest-latency synthesis; requires streaming and an explicit voice
    #[arg(long, overrides_with = "no_instant_mode")]
    pub instant_mode: bool,

    /// Turn instant mode back off when a config layer enables it
    #[arg(long, overrides_with = "instant_mode")]
    pub no_instant_mode: bool,
}

impl TtsArgs {
    /// The cascade layer contributed by flags. A flag the user did not type
    /// contributes nothing, so weaker layers can still speak.
    pub fn as_layer(&self) -> SettingsLayer {
        SettingsLayer {
            voice_name: self.voice_name.clone(),
            voice_id: self.voice_id.clone(),
            description: self.description.clone(),
            num_generations: self.num_generations,
            output_dir: self.output_dir.clone(),
            prefix: self.prefix.clone(),
            play: self.play,
            play_command: self.play_command.clone(),
            format: self.format,
            provider: self.provider,
            preset_voice: self.preset_voice.then_some(true),
            streaming: toggle(self.streaming, self.no_streaming),
            instant_mode: toggle(self.instant_mode, self.no_instant_mode),
            speed: self.speed,
            trailing_silence: self.trailing_silence,
            last: self.last.then_some(true),
        }
    }
}

fn toggle(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

#[derive(Subcommand, Debug)]
pub enum VoicesCommand {
    /// List voices available to the account
    List {
        /// Which library to list
        #[arg(long, value_enum, default_value_t = VoiceProvider::CustomVoice)]
        provider: VoiceProvider,
    },

    /// Save a generation as a reusable named voice
    Save {
        /// Name for the saved voice
        #[arg(long, value_name = "NAME")]
        name: String,

        /// Generation id to save
        #[arg(long, value_name = "GENERATION_ID", conflicts_with = "last")]
        generation_id: Option<String>,

        /// Save from the most recent synthesis
        #[arg(long)]
        last: bool,

        /// 1-based pick when the last run produced several generations
        #[arg(long, value_name = "N")]
        last_index: Option<u32>,
    },

    /// Delete a saved voice by name
    Delete {
        /// Name of the voice to delete
        #[arg(long, value_name = "NAME")]
        name: String,
    },
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Operate on the session record instead of the global one
    #[arg(long)]
    pub session: bool,

    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Set a key; the value is parsed as JSON when possible
    Set { key: String, value: String },

    /// Print one key's stored value
    Get { key: String },

    /// Remove a key
    Unset { key: String },

    /// Print the whole record
    List,
}
