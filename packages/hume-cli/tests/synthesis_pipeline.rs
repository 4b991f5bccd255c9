//! End-to-end pipeline checks, short of the network: options resolve from
//! real config files, requests build, a fake chunk stream lands on disk,
//! and history rolls over.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::stream;
use hume_api::endpoints::tts::SnippetAudioChunk;
use serde_json::json;

use hume_cli::cli::TtsArgs;
use hume_cli::config::{ConfigRecord, ConfigStore, keys};
use hume_cli::history::{GenerationHistory, HistoryStore};
use hume_cli::settings::{self, PlayMode, SettingsLayer};
use hume_cli::tts::{
    OutputPlan, StreamingAccumulator, build_request, consume_stream, resolve_continuation,
    write_buffers,
};

fn chunk(generation_id: &str, audio: &[u8]) -> SnippetAudioChunk {
    SnippetAudioChunk {
        generation_id: generation_id.to_string(),
        audio: if audio.is_empty() {
            String::new()
        } else {
            BASE64.encode(audio)
        },
        chunk_index: None,
        is_last_chunk: None,
    }
}

#[tokio::test]
async fn streaming_run_continues_from_history_and_rolls_it_over() {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::at(dir.path().join("hume"));

    // Global config supplies the voice; the previous run left one id behind.
    let mut global = ConfigRecord::default();
    global.set(keys::VOICE_NAME, json!("narrator"));
    global.set(keys::OUTPUT_DIR, json!(dir.path().join("out").to_str().unwrap()));
    store.save_global(&global).unwrap();

    let history = HistoryStore::new(store.history_path());
    history
        .save(&GenerationHistory::now(vec!["gen_0".into()]))
        .unwrap();

    let args = TtsArgs {
        text: "hello again".into(),
        last: true,
        ..TtsArgs::default()
    };
    let global_layer =
        SettingsLayer::from_record(&store.load_global().unwrap(), &store.global_path()).unwrap();
    let opts = settings::resolve(&args, &SettingsLayer::default(), &global_layer).unwrap();
    assert!(opts.streaming);
    assert_eq!(opts.voice_name.as_deref(), Some("narrator"));

    let context = resolve_continuation(&opts, &history).unwrap();
    assert_eq!(context.as_deref(), Some("gen_0"));

    let request = build_request(&opts, opts.text.clone(), context).unwrap();
    assert_eq!(
        request.context.as_ref().map(|c| c.generation_id.as_str()),
        Some("gen_0")
    );
    assert_eq!(request.strip_headers, Some(true));

    // The service streams two audio chunks and one keep-alive.
    let feed = stream::iter(vec![
        Ok(chunk("gen_1", b"first-half ")),
        Ok(chunk("gen_1", b"")),
        Ok(chunk("gen_1", b"second-half")),
    ]);
    let mut acc = StreamingAccumulator::new();
    consume_stream(feed, &mut acc, None, PlayMode::Off)
        .await
        .unwrap();

    let plan = OutputPlan::from_options(&opts);
    plan.prepare().await.unwrap();
    let ids = acc.generation_ids().to_vec();
    let written = write_buffers(acc.into_buffers(), &plan).await.unwrap();

    assert_eq!(written.len(), 1);
    assert_eq!(
        written[0].1,
        dir.path().join("out").join("tts-gen_1.wav")
    );
    assert_eq!(
        std::fs::read(&written[0].1).unwrap(),
        b"first-half second-half".to_vec()
    );

    // History is replaced, not appended to.
    history.save(&GenerationHistory::now(ids)).unwrap();
    assert_eq!(history.get().unwrap().ids, vec!["gen_1"]);
}

#[tokio::test]
async fn session_record_outranks_global_but_not_flags() {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::at(dir.path());

    let mut global = ConfigRecord::default();
    global.set(keys::PREFIX, json!("global-"));
    global.set(keys::STREAMING, json!(false));
    store.save_global(&global).unwrap();

    let mut session = ConfigRecord::default();
    session.set(keys::PREFIX, json!("session-"));
    store.save_session(&session).unwrap();

    let global_layer =
        SettingsLayer::from_record(&store.load_global().unwrap(), &store.global_path()).unwrap();
    let session_layer =
        SettingsLayer::from_record(&store.load_session().unwrap(), &store.session_path()).unwrap();

    let args = TtsArgs {
        text: "hi".into(),
        ..TtsArgs::default()
    };
    let opts = settings::resolve(&args, &session_layer, &global_layer).unwrap();
    assert_eq!(opts.prefix, "session-");
    assert!(!opts.streaming);

    let args = TtsArgs {
        text: "hi".into(),
        prefix: Some("flag-".into()),
        streaming: true,
        ..TtsArgs::default()
    };
    let opts = settings::resolve(&args, &session_layer, &global_layer).unwrap();
    assert_eq!(opts.prefix, "flag-");
    assert!(opts.streaming);
}

#[tokio::test]
async fn multiple_generations_interleaved_on_the_wire_land_separately() {
    let dir = tempfile::tempdir().unwrap();

    let feed = stream::iter(vec![
        Ok(chunk("gen_a", b"A1")),
        Ok(chunk("gen_b", b"B1")),
        Ok(chunk("gen_a", b"A2")),
        Ok(chunk("gen_b", b"B2")),
    ]);
    let mut acc = StreamingAccumulator::new();
    consume_stream(feed, &mut acc, None, PlayMode::Off)
        .await
        .unwrap();

    let plan = OutputPlan::Directory {
        dir: dir.path().to_path_buf(),
        prefix: "tts-".into(),
        extension: "wav",
    };
    let written = write_buffers(acc.into_buffers(), &plan).await.unwrap();

    assert_eq!(written.len(), 2);
    assert_eq!(std::fs::read(&written[0].1).unwrap(), b"A1A2".to_vec());
    assert_eq!(std::fs::read(&written[1].1).unwrap(), b"B1B2".to_vec());
}
