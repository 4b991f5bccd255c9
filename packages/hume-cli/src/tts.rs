//! The synthesis pipeline: turn resolved options into a wire request, run
//! it buffered or streaming, land audio on disk, record history, play it.

use std::collections::HashMap;
use std::path::PathBuf;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use hume_api::HumeClient;
use hume_api::endpoints::tts::{
    ContextRef, PostTts, PostTtsStream, PostedUtterance, ReturnGeneration, SnippetAudioChunk,
    TtsRequest, VoiceRef,
};
use serde_json::json;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::auth;
use crate::cli::TtsArgs;
use crate::config::{ConfigStore, keys};
use crate::error::CliError;
use crate::history::{GenerationHistory, HistoryStore};
use crate::player::{AudioPlayer, PlayerSink};
use crate::reporter::Reporter;
use crate::settings::{self, EnvSettings, PlayMode, ResolvedTtsOptions, SettingsLayer};

pub async fn run(
    args: &TtsArgs,
    api_key_flag: Option<String>,
    store: &ConfigStore,
    reporter: &Reporter,
) -> Result<(), CliError> {
    let global_record = store.load_global()?;
    let session_record = store.load_session()?;
    let global = SettingsLayer::from_record(&global_record, &store.global_path())?;
    let session = SettingsLayer::from_record(&session_record, &store.session_path())?;
    let opts = settings::resolve(args, &session, &global)?;
    debug!(?opts, "resolved synthesis options");

    if opts.preset_voice {
        reporter.warn("--preset-voice is deprecated; use --provider HUME_AI instead");
    }

    let env = EnvSettings::capture();
    let api_key = settings::resolve_api_key(
        api_key_flag,
        env.api_key.clone(),
        session_record.get_string(keys::API_KEY),
        global_record.get_string(keys::API_KEY),
    )?;

    let history = HistoryStore::new(store.history_path());
    let text = resolve_text(&opts.text).await?;
    let context = resolve_continuation(&opts, &history)?;
    let request = build_request(&opts, text, context)?;

    let client = auth::build_client(api_key, env.base_url.as_deref())?;
    if opts.streaming {
        synthesize_streaming(&client, request, &opts, &history, reporter).await
    } else {
        synthesize_buffered(&client, request, &opts, &history, reporter).await
    }
}

/// `-` means the text arrives on stdin.
async fn resolve_text(text: &str) -> Result<String, CliError> {
    if text != "-" {
        return Ok(text.to_string());
    }
    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .map_err(CliError::Stdin)?;
    Ok(buf.trim().to_string())
}

/// Turn the continuation flags into the generation id to continue from.
/// An explicit `--context-generation-id` never touches history.
pub fn resolve_continuation(
    opts: &ResolvedTtsOptions,
    history: &HistoryStore,
) -> Result<Option<String>, CliError> {
    if let Some(id) = &opts.context_generation_id {
        return Ok(Some(id.clone()));
    }
    if !opts.last && opts.last_index.is_none() {
        return Ok(None);
    }
    pick_from_history(history, opts.last_index).map(Some)
}

/// Pick one id out of the last run. Shared with `voices save --last`.
///
/// Indexes are 1-based. A run with one generation needs no index; a run
/// with several requires one, and out-of-range picks name the valid range.
pub fn pick_from_history(
    history: &HistoryStore,
    last_index: Option<u32>,
) -> Result<String, CliError> {
    let record = history.get().ok_or(CliError::NoHistory)?;
    let count = record.ids.len();
    if count == 0 {
        return Err(CliError::NoHistory);
    }
    let index = match last_index {
        Some(given) => given,
        None if count == 1 => 1,
        None => return Err(CliError::LastIndexRequired { count }),
    };
    if index < 1 || index as usize > count {
        return Err(CliError::LastIndexOutOfRange {
            given: index,
            count,
        });
    }
    Ok(record.ids[index as usize - 1].clone())
}

/// Assemble the wire request. Instant-mode preconditions are checked here,
/// before anything reaches the network.
pub fn build_request(
    opts: &ResolvedTtsOptions,
    text: String,
    context_generation_id: Option<String>,
) -> Result<TtsRequest, CliError> {
    let provider = wire_provider(opts);
    let voice = match (&opts.voice_name, &opts.voice_id) {
        (Some(name), _) => Some(VoiceRef::Name {
            name: name.clone(),
            provider,
        }),
        (_, Some(id)) => Some(VoiceRef::Id {
            id: id.clone(),
            provider,
        }),
        _ => None,
    };

    // An explicit output file holds exactly one generation.
    let num_generations = if opts.output_file.is_some() {
        1
    } else {
        opts.num_generations
    };

    if opts.instant_mode {
        if !opts.streaming {
            return Err(CliError::InstantModeNeedsStreaming);
        }
        if num_generations != 1 {
            return Err(CliError::InstantModeSingleGeneration {
                requested: num_generations,
            });
        }
        if voice.is_none() && context_generation_id.is_none() {
            return Err(CliError::InstantModeNeedsVoice);
        }
    }

    Ok(TtsRequest {
        utterances: vec![PostedUtterance {
            text,
            voice,
            description: opts.description.clone(),
            speed: opts.speed,
            trailing_silence: opts.trailing_silence,
        }],
        context: context_generation_id.map(|generation_id| ContextRef { generation_id }),
        format: opts.format.to_wire(),
        num_generations: Some(num_generations),
        instant_mode: opts.instant_mode.then_some(true),
        strip_headers: opts.streaming.then_some(true),
    })
}

/// Explicit `--provider` wins; the deprecated `--preset-voice` maps to the
/// Hume library only when no provider is given.
fn wire_provider(opts: &ResolvedTtsOptions) -> Option<hume_api::endpoints::tts::VoiceProvider> {
    match opts.provider {
        Some(provider) => Some(provider.to_wire()),
        None if opts.preset_voice => Some(hume_api::endpoints::tts::VoiceProvider::HumeAi),
        None => None,
    }
}

/// Where finished audio lands.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputPlan {
    /// Exactly one generation, at exactly this path.
    File(PathBuf),
    /// One file per generation, named `{prefix}{generation_id}.{extension}`.
    Directory {
        dir: PathBuf,
        prefix: String,
        extension: &'static str,
    },
}

impl OutputPlan {
    pub fn from_options(opts: &ResolvedTtsOptions) -> Self {
        match &opts.output_file {
            Some(path) => OutputPlan::File(path.clone()),
            None => OutputPlan::Directory {
                dir: opts.output_dir.clone(),
                prefix: opts.prefix.clone(),
                extension: opts.format.extension(),
            },
        }
    }

    pub fn path_for(&self, generation_id: &str) -> PathBuf {
        match self {
            OutputPlan::File(path) => path.clone(),
            OutputPlan::Directory {
                dir,
                prefix,
                extension,
            } => dir.join(format!("{prefix}{generation_id}.{extension}")),
        }
    }

    /// Create the directory audio will be written into.
    pub async fn prepare(&self) -> Result<(), CliError> {
        let dir = match self {
            OutputPlan::File(path) => match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => return Ok(()),
            },
            OutputPlan::Directory { dir, .. } => dir,
        };
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| CliError::WriteAudio {
                path: dir.to_path_buf(),
                source,
            })
    }
}

/// Per-generation audio gathered while a stream is live.
///
/// The order generations first produced audio is preserved; it decides both
/// file naming order and the order ids land in history.
#[derive(Debug, Default)]
pub struct StreamingAccumulator {
    order: Vec<String>,
    chunks: HashMap<String, Vec<Bytes>>,
}

impl StreamingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, generation_id: &str, audio: Bytes) {
        if !self.chunks.contains_key(generation_id) {
            self.order.push(generation_id.to_string());
        }
        self.chunks
            .entry(generation_id.to_string())
            .or_default()
            .push(audio);
    }

    pub fn first_generation(&self) -> Option<&str> {
        self.order.first().map(String::as_str)
    }

    pub fn generation_ids(&self) -> &[String] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// One combined buffer per generation, chunks concatenated in arrival
    /// order, generations in first-observation order.
    pub fn into_buffers(self) -> Vec<(String, Vec<u8>)> {
        let Self { order, mut chunks } = self;
        order
            .into_iter()
            .map(|id| {
                let parts = chunks.remove(&id).unwrap_or_default();
                let mut combined = Vec::with_capacity(parts.iter().map(Bytes::len).sum());
                for part in &parts {
                    combined.extend_from_slice(part);
                }
                (id, combined)
            })
            .collect()
    }
}

async fn synthesize_buffered(
    client: &HumeClient,
    request: TtsRequest,
    opts: &ResolvedTtsOptions,
    history: &HistoryStore,
    reporter: &Reporter,
) -> Result<(), CliError> {
    let response = reporter
        .with_spinner("Synthesizing speech", client.hit(PostTts { body: request }))
        .await?;
    if response.generations.is_empty() {
        return Err(CliError::NoAudioReturned);
    }

    let plan = OutputPlan::from_options(opts);
    plan.prepare().await?;
    let written = write_generations(&response.generations, &plan).await?;
    for (generation_id, path) in &written {
        reporter.info(format!("{generation_id} -> {}", path.display()));
    }

    let ids: Vec<String> = written.iter().map(|(id, _)| id.clone()).collect();
    history.save(&GenerationHistory::now(ids))?;

    play_written(&written, opts, reporter).await?;
    report_summary(reporter, &written);
    Ok(())
}

/// Decode and write each generation, preserving response order.
pub async fn write_generations(
    generations: &[ReturnGeneration],
    plan: &OutputPlan,
) -> Result<Vec<(String, PathBuf)>, CliError> {
    let mut written = Vec::with_capacity(generations.len());
    for generation in generations {
        let path = plan.path_for(&generation.generation_id);
        let audio = generation.audio_bytes()?;
        tokio::fs::write(&path, &audio)
            .await
            .map_err(|source| CliError::WriteAudio {
                path: path.clone(),
                source,
            })?;
        written.push((generation.generation_id.clone(), path));
    }
    Ok(written)
}

async fn play_written(
    written: &[(String, PathBuf)],
    opts: &ResolvedTtsOptions,
    reporter: &Reporter,
) -> Result<(), CliError> {
    let to_play: &[(String, PathBuf)] = match opts.play {
        PlayMode::Off => return Ok(()),
        PlayMode::First => &written[..written.len().min(1)],
        PlayMode::All => written,
    };
    let player = AudioPlayer::from_options(opts.play_command.as_deref());
    for (_, path) in to_play {
        reporter.info(format!("Playing {}", path.display()));
        player.play_file(path).await?;
    }
    Ok(())
}

async fn synthesize_streaming(
    client: &HumeClient,
    request: TtsRequest,
    opts: &ResolvedTtsOptions,
    history: &HistoryStore,
    reporter: &Reporter,
) -> Result<(), CliError> {
    let plan = OutputPlan::from_options(opts);
    plan.prepare().await?;

    let mut sink = match opts.play {
        PlayMode::Off => None,
        _ => {
            let player = AudioPlayer::from_options(opts.play_command.as_deref());
            Some(player.open_sink().await?)
        }
    };

    let mut acc = StreamingAccumulator::new();
    let outcome = stream_into(client, request, &mut acc, sink.as_mut(), opts.play).await;

    // The sink is closed and waited on before the outcome is judged, so no
    // exit path leaves a player running. When both sides fail, the remote
    // error is the one reported.
    let sink_outcome = match sink {
        Some(sink) => sink.finish().await,
        None => Ok(()),
    };
    outcome?;
    sink_outcome?;

    if acc.is_empty() {
        return Err(CliError::NoAudioReturned);
    }

    let ids = acc.generation_ids().to_vec();
    let written = write_buffers(acc.into_buffers(), &plan).await?;
    for (generation_id, path) in &written {
        reporter.info(format!("{generation_id} -> {}", path.display()));
    }

    history.save(&GenerationHistory::now(ids))?;
    report_summary(reporter, &written);
    Ok(())
}

async fn stream_into(
    client: &HumeClient,
    request: TtsRequest,
    acc: &mut StreamingAccumulator,
    sink: Option<&mut PlayerSink>,
    play: PlayMode,
) -> Result<(), CliError> {
    let stream = client.hit(PostTtsStream { body: request }).await?;
    consume_stream(stream, acc, sink, play).await
}

/// Drain the chunk stream, accumulating audio per generation and piping the
/// playable part to the sink as it arrives. Chunks with no audio payload
/// are keep-alives and are skipped; a malformed chunk aborts the stream.
pub async fn consume_stream<S>(
    mut stream: S,
    acc: &mut StreamingAccumulator,
    mut sink: Option<&mut PlayerSink>,
    play: PlayMode,
) -> Result<(), CliError>
where
    S: Stream<Item = hume_api::Result<SnippetAudioChunk>> + Unpin,
{
    let mut chunks = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let audio = chunk.audio_bytes()?;
        if audio.is_empty() {
            continue;
        }
        acc.push(&chunk.generation_id, audio.clone());
        chunks += 1;
        if let Some(sink) = sink.as_deref_mut() {
            if plays_now(play, acc.first_generation(), &chunk.generation_id) {
                sink.write(&audio).await?;
            }
        }
    }
    debug!(
        chunks,
        generations = acc.generation_ids().len(),
        "stream drained"
    );
    Ok(())
}

/// In `first` mode only the generation that spoke first is piped; every
/// generation still accumulates and lands on disk.
fn plays_now(play: PlayMode, first: Option<&str>, generation_id: &str) -> bool {
    match play {
        PlayMode::Off => false,
        PlayMode::All => true,
        PlayMode::First => first == Some(generation_id),
    }
}

/// Write one combined file per generation.
pub async fn write_buffers(
    buffers: Vec<(String, Vec<u8>)>,
    plan: &OutputPlan,
) -> Result<Vec<(String, PathBuf)>, CliError> {
    let mut written = Vec::with_capacity(buffers.len());
    for (generation_id, audio) in buffers {
        let path = plan.path_for(&generation_id);
        tokio::fs::write(&path, &audio)
            .await
            .map_err(|source| CliError::WriteAudio {
                path: path.clone(),
                source,
            })?;
        written.push((generation_id, path));
    }
    Ok(written)
}

fn report_summary(reporter: &Reporter, written: &[(String, PathBuf)]) {
    let generations: Vec<_> = written
        .iter()
        .map(|(id, path)| json!({"generation_id": id, "file": path.display().to_string()}))
        .collect();
    reporter.json(&json!({ "generations": generations }));
}
