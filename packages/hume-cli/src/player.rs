//! External audio playback.
//!
//! Playback always goes through a child process: either the command the user
//! configured (`--play-command` / `tts.playCommand`) or the first known
//! player found on the PATH. Buffered synthesis plays finished files;
//! streaming synthesis pipes raw audio into the player's stdin through a
//! [`PlayerSink`].

use std::io;
use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tracing::debug;

use crate::error::CliError;

/// Literal replaced with the file path in a custom play command.
const FILE_PLACEHOLDER: &str = "$AUDIO_FILE";

struct Candidate {
    bin: &'static str,
    base_args: &'static [&'static str],
    /// Argument that makes the player read from stdin, if it can.
    stdin_arg: Option<&'static str>,
}

const CANDIDATES: &[Candidate] = &[
    Candidate {
        bin: "ffplay",
        base_args: &["-autoexit", "-nodisp", "-loglevel", "error"],
        stdin_arg: Some("-"),
    },
    Candidate {
        bin: "mpv",
        base_args: &["--really-quiet"],
        stdin_arg: Some("-"),
    },
    Candidate {
        bin: "afplay",
        base_args: &[],
        stdin_arg: None,
    },
    Candidate {
        bin: "mpg123",
        base_args: &["-q"],
        stdin_arg: Some("-"),
    },
];

#[derive(Debug, Clone)]
pub struct AudioPlayer {
    custom: Option<Vec<String>>,
}

impl AudioPlayer {
    pub fn from_options(play_command: Option<&str>) -> Self {
        let custom = play_command
            .map(|raw| raw.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|argv| !argv.is_empty());
        Self { custom }
    }

    /// Play one finished file and wait for the player to exit.
    pub async fn play_file(&self, path: &Path) -> Result<(), CliError> {
        let (mut child, command) = spawn_first(self.file_commands(path), false)?;
        let status = child.wait().await.map_err(|source| CliError::PlayerIo {
            command: command.clone(),
            source,
        })?;
        if !status.success() {
            return Err(CliError::PlayerFailed { command, status });
        }
        Ok(())
    }

    /// Spawn a player that reads raw audio from stdin. The caller owns the
    /// sink and must call [`PlayerSink::finish`] on every exit path.
    pub async fn open_sink(&self) -> Result<PlayerSink, CliError> {
        let (mut child, command) = spawn_first(self.stream_commands(), true)?;
        let stdin = child.stdin.take().ok_or_else(|| CliError::PlayerIo {
            command: command.clone(),
            source: io::Error::other("player stdin was not captured"),
        })?;
        Ok(PlayerSink {
            child,
            stdin: Some(stdin),
            command,
        })
    }

    fn file_commands(&self, path: &Path) -> Vec<Vec<String>> {
        let path = path.display().to_string();
        if let Some(custom) = &self.custom {
            let mut argv: Vec<String> = custom
                .iter()
                .map(|arg| arg.replace(FILE_PLACEHOLDER, &path))
                .collect();
            if !custom.iter().any(|arg| arg.contains(FILE_PLACEHOLDER)) {
                argv.push(path);
            }
            return vec![argv];
        }
        CANDIDATES
            .iter()
            .map(|c| {
                let mut argv: Vec<String> = std::iter::once(c.bin)
                    .chain(c.base_args.iter().copied())
                    .map(str::to_string)
                    .collect();
                argv.push(path.clone());
                argv
            })
            .collect()
    }

    fn stream_commands(&self) -> Vec<Vec<String>> {
        if let Some(custom) = &self.custom {
            let argv: Vec<String> = custom
                .iter()
                .filter(|arg| !arg.contains(FILE_PLACEHOLDER))
                .cloned()
                .collect();
            return vec![argv];
        }
        CANDIDATES
            .iter()
            .filter_map(|c| {
                let stdin_arg = c.stdin_arg?;
                let mut argv: Vec<String> = std::iter::once(c.bin)
                    .chain(c.base_args.iter().copied())
                    .map(str::to_string)
                    .collect();
                argv.push(stdin_arg.to_string());
                Some(argv)
            })
            .collect()
    }
}

/// Try each candidate in order; a binary missing from the PATH moves on to
/// the next, any other spawn failure is fatal.
fn spawn_first(commands: Vec<Vec<String>>, piped_stdin: bool) -> Result<(Child, String), CliError> {
    let mut tried = Vec::new();
    for argv in commands {
        if argv.is_empty() {
            continue;
        }
        let command = argv.join(" ");
        match spawn_one(&argv, piped_stdin) {
            Ok(child) => {
                debug!(%command, "audio player started");
                return Ok((child, command));
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => tried.push(argv[0].clone()),
            Err(source) => return Err(CliError::PlayerIo { command, source }),
        }
    }
    let tried = if tried.is_empty() {
        "none".to_string()
    } else {
        tried.join(", ")
    };
    Err(CliError::PlayerNotFound { tried })
}

fn spawn_one(argv: &[String], piped_stdin: bool) -> io::Result<Child> {
    let mut command = Command::new(&argv[0]);
    command
        .args(&argv[1..])
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if piped_stdin {
        // Kill the player if the sink is dropped without finish().
        command.stdin(Stdio::piped()).kill_on_drop(true);
    } else {
        command.stdin(Stdio::null());
    }
    command.spawn()
}

/// Writable handle on a running player's stdin.
pub struct PlayerSink {
    child: Child,
    stdin: Option<ChildStdin>,
    command: String,
}

impl PlayerSink {
    pub async fn write(&mut self, audio: &[u8]) -> Result<(), CliError> {
        let stdin = self.stdin.as_mut().ok_or_else(|| CliError::PlayerIo {
            command: self.command.clone(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "sink already closed"),
        })?;
        stdin
            .write_all(audio)
            .await
            .map_err(|source| CliError::PlayerIo {
                command: self.command.clone(),
                source,
            })
    }

    /// Close stdin and wait for the player to drain and exit.
    pub async fn finish(mut self) -> Result<(), CliError> {
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .await
            .map_err(|source| CliError::PlayerIo {
                command: self.command.clone(),
                source,
            })?;
        if !status.success() {
            return Err(CliError::PlayerFailed {
                command: self.command,
                status,
            });
        }
        Ok(())
    }
}
