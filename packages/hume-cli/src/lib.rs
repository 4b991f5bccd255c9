//! Library side of the `hume` binary, exposed so integration tests can
//! drive the pipeline without a terminal.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod player;
pub mod reporter;
pub mod settings;
pub mod tts;
pub mod voices;

pub use error::CliError;
