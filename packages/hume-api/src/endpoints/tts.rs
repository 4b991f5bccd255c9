//! Speech synthesis endpoints.
//!
//! `POST /v0/tts` returns every generation in one JSON body once synthesis
//! finishes. `POST /v0/tts/stream/json` returns newline-delimited JSON chunks
//! as audio becomes available; [`PostTtsStream`] decodes that framing into a
//! stream of [`SnippetAudioChunk`]s.

use std::pin::Pin;

use async_stream::try_stream;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt, pin_mut};

use super::*;

const TTS_PATH: &str = "/v0/tts";
const TTS_STREAM_PATH: &str = "/v0/tts/stream/json";

/// Synthesize speech and receive the complete audio in the response body.
#[derive(Debug, Clone)]
pub struct PostTts {
    pub body: TtsRequest,
}

impl HumeEndpoint for PostTts {
    const PATH: &'static str = TTS_PATH;

    const METHOD: Method = Method::POST;

    type ResponseBody = TtsResponse;

    fn request_body(&self) -> Result<RequestBody> {
        Ok(RequestBody::Json(serde_json::to_value(&self.body)?))
    }

    async fn response_body(self, resp: Response) -> Result<Self::ResponseBody> {
        Ok(resp.json().await?)
    }
}

/// Synthesize speech and receive audio chunks as they are produced.
#[derive(Debug, Clone)]
pub struct PostTtsStream {
    pub body: TtsRequest,
}

impl HumeEndpoint for PostTtsStream {
    const PATH: &'static str = TTS_STREAM_PATH;

    const METHOD: Method = Method::POST;

    type ResponseBody = SnippetStream;

    fn request_body(&self) -> Result<RequestBody> {
        Ok(RequestBody::Json(serde_json::to_value(&self.body)?))
    }

    async fn response_body(self, resp: Response) -> Result<Self::ResponseBody> {
        Ok(decode_chunks(resp.bytes_stream()))
    }
}

pub type SnippetStream = Pin<Box<dyn Stream<Item = Result<SnippetAudioChunk>> + Send>>;

/// Split an NDJSON byte stream into parsed chunks.
///
/// Lines may arrive fragmented across network reads, so bytes are carried
/// over until a newline completes them. A malformed line ends the stream
/// with an error.
pub(crate) fn decode_chunks<S, E>(body: S) -> SnippetStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    Box::pin(try_stream! {
        pin_mut!(body);
        let mut carry = BytesMut::new();
        while let Some(piece) = body.next().await {
            let piece = piece.map_err(Into::into)?;
            carry.extend_from_slice(&piece);
            while let Some(pos) = carry.iter().position(|&b| b == b'\n') {
                let line = carry.split_to(pos + 1);
                if let Some(chunk) = parse_line(&line[..pos])? {
                    yield chunk;
                }
            }
        }
        if let Some(chunk) = parse_line(&carry)? {
            yield chunk;
        }
    })
}

fn parse_line(line: &[u8]) -> Result<Option<SnippetAudioChunk>> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(line)?))
}

#[derive(Debug, Clone, Serialize)]
pub struct TtsRequest {
    pub utterances: Vec<PostedUtterance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextRef>,
    pub format: Format,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_generations: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instant_mode: Option<bool>,
    /// Strip container headers from each chunk so they can be concatenated.
    /// Only meaningful on the streaming endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strip_headers: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostedUtterance {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_silence: Option<f64>,
}

/// Reference to the voice an utterance is spoken with, by name or by id.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum VoiceRef {
    Name {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        provider: Option<VoiceProvider>,
    },
    Id {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        provider: Option<VoiceProvider>,
    },
}

/// Prior generation to continue from, for prosodic consistency.
#[derive(Debug, Clone, Serialize)]
pub struct ContextRef {
    pub generation_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceProvider {
    #[serde(rename = "HUME_AI")]
    HumeAi,
    #[serde(rename = "CUSTOM_VOICE")]
    CustomVoice,
}

impl VoiceProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceProvider::HumeAi => "HUME_AI",
            VoiceProvider::CustomVoice => "CUSTOM_VOICE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Format {
    Wav,
    Mp3,
    Pcm,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TtsResponse {
    pub generations: Vec<ReturnGeneration>,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReturnGeneration {
    pub generation_id: String,
    /// Base64-encoded audio for the whole generation.
    pub audio: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

impl ReturnGeneration {
    pub fn audio_bytes(&self) -> Result<Bytes> {
        decode_audio(&self.audio)
    }
}

/// One streamed chunk. The service sends keep-alive chunks whose `audio`
/// field is empty or absent.
#[derive(Debug, Clone, Deserialize)]
pub struct SnippetAudioChunk {
    pub generation_id: String,
    #[serde(default)]
    pub audio: String,
    #[serde(default)]
    pub chunk_index: Option<u64>,
    #[serde(default)]
    pub is_last_chunk: Option<bool>,
}

impl SnippetAudioChunk {
    pub fn audio_bytes(&self) -> Result<Bytes> {
        decode_audio(&self.audio)
    }
}

fn decode_audio(encoded: &str) -> Result<Bytes> {
    if encoded.is_empty() {
        return Ok(Bytes::new());
    }
    Ok(Bytes::from(BASE64.decode(encoded)?))
}
