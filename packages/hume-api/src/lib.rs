//! Typed client for the Hume speech-synthesis REST API.
//!
//! ```no_run
//! use hume_api::HumeClient;
//! use hume_api::endpoints::tts::{Format, PostTts, PostedUtterance, TtsRequest};
//!
//! # async fn run() -> hume_api::Result<()> {
//! let client = HumeClient::new("my-api-key")?;
//! let resp = client
//!     .hit(PostTts {
//!         body: TtsRequest {
//!             utterances: vec![PostedUtterance {
//!                 text: "Hello from Hume".into(),
//!                 voice: None,
//!                 description: None,
//!                 speed: None,
//!                 trailing_silence: None,
//!             }],
//!             context: None,
//!             format: Format::Wav,
//!             num_generations: Some(1),
//!             instant_mode: None,
//!             strip_headers: None,
//!         },
//!     })
//!     .await?;
//! for generation in &resp.generations {
//!     println!("{}", generation.generation_id);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
pub mod endpoints;
mod error;

pub use client::{DEFAULT_BASE_URL, HumeClient};
pub use error::{Error, Result};
