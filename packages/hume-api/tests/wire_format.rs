//! Serialized request shapes, pinned against the service's documented JSON.

use hume_api::endpoints::HumeEndpoint;
use hume_api::endpoints::tts::{
    ContextRef, Format, PostedUtterance, TtsRequest, VoiceProvider, VoiceRef,
};
use hume_api::endpoints::voices::ListVoices;
use reqwest::Url;
use serde_json::json;

fn utterance(text: &str) -> PostedUtterance {
    PostedUtterance {
        text: text.to_string(),
        voice: None,
        description: None,
        speed: None,
        trailing_silence: None,
    }
}

#[test]
fn minimal_request_omits_unset_fields() {
    let body = TtsRequest {
        utterances: vec![utterance("hi")],
        context: None,
        format: Format::Wav,
        num_generations: Some(1),
        instant_mode: None,
        strip_headers: None,
    };
    assert_eq!(
        serde_json::to_value(&body).unwrap(),
        json!({
            "utterances": [{"text": "hi"}],
            "format": {"type": "wav"},
            "num_generations": 1,
        })
    );
}

#[test]
fn voice_by_name_and_by_id_serialize_flat() {
    let by_name = VoiceRef::Name {
        name: "narrator".into(),
        provider: Some(VoiceProvider::HumeAi),
    };
    assert_eq!(
        serde_json::to_value(&by_name).unwrap(),
        json!({"name": "narrator", "provider": "HUME_AI"})
    );

    let by_id = VoiceRef::Id {
        id: "9d0ccf79".into(),
        provider: None,
    };
    assert_eq!(
        serde_json::to_value(&by_id).unwrap(),
        json!({"id": "9d0ccf79"})
    );
}

#[test]
fn full_request_carries_every_field() {
    let body = TtsRequest {
        utterances: vec![PostedUtterance {
            text: "hi".into(),
            voice: Some(VoiceRef::Name {
                name: "narrator".into(),
                provider: None,
            }),
            description: Some("calm".into()),
            speed: Some(1.5),
            trailing_silence: Some(0.5),
        }],
        context: Some(ContextRef {
            generation_id: "gen_0".into(),
        }),
        format: Format::Pcm,
        num_generations: Some(2),
        instant_mode: Some(true),
        strip_headers: Some(true),
    };
    assert_eq!(
        serde_json::to_value(&body).unwrap(),
        json!({
            "utterances": [{
                "text": "hi",
                "voice": {"name": "narrator"},
                "description": "calm",
                "speed": 1.5,
                "trailing_silence": 0.5,
            }],
            "context": {"generation_id": "gen_0"},
            "format": {"type": "pcm"},
            "num_generations": 2,
            "instant_mode": true,
            "strip_headers": true,
        })
    );
}

#[test]
fn list_voices_builds_provider_query() {
    let base = Url::parse("https://api.hume.ai").unwrap();
    let url = ListVoices::default().url(&base);
    assert_eq!(url.path(), "/v0/tts/voices");
    let query: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert!(query.contains(&("provider".into(), "CUSTOM_VOICE".into())));
    assert!(query.contains(&("page_number".into(), "0".into())));
}
