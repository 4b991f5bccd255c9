//! User-facing output.
//!
//! Human mode prints progress and results on stdout with a spinner around
//! long waits; `--json` mode keeps stdout as pure JSON and drops everything
//! else. Warnings always go to stderr so they survive both modes.

use std::future::Future;
use std::time::Duration;

use indicatif::ProgressBar;
use serde_json::Value;

const TICK_INTERVAL: Duration = Duration::from_millis(120);

#[derive(Debug, Clone)]
pub struct Reporter {
    json: bool,
}

impl Reporter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn json_mode(&self) -> bool {
        self.json
    }

    pub fn info(&self, message: impl AsRef<str>) {
        if !self.json {
            println!("{}", message.as_ref());
        }
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        eprintln!("warning: {}", message.as_ref());
    }

    /// Machine-readable summary; only emitted in `--json` mode.
    pub fn json(&self, value: &Value) {
        if self.json {
            let rendered =
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            println!("{rendered}");
        }
    }

    /// Show a spinner while `fut` runs, then clear it. The future's output
    /// comes back untouched, errors included.
    pub async fn with_spinner<F, T>(&self, label: impl Into<String>, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let bar = if self.json {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        bar.set_message(label.into());
        bar.enable_steady_tick(TICK_INTERVAL);
        let out = fut.await;
        bar.finish_and_clear();
        out
    }
}
