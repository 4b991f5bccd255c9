//! API-key handling: login, logout, and client construction.

use hume_api::HumeClient;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::{ConfigStore, keys};
use crate::error::CliError;
use crate::reporter::Reporter;
use crate::settings::{self, EnvSettings};

/// Where API keys are minted.
const PORTAL_URL: &str = "https://platform.hume.ai/settings/keys";

/// Client pointed at the default host, or at `HUME_BASE_URL` when set.
pub fn build_client(api_key: String, base_url: Option<&str>) -> Result<HumeClient, CliError> {
    let client = match base_url {
        Some(base) => HumeClient::with_base_url(api_key, base),
        None => HumeClient::new(api_key),
    };
    client.map_err(CliError::from)
}

/// Resolve the key from flag, environment, and both config records, then
/// build a client with it.
pub fn client_from_store(
    store: &ConfigStore,
    api_key_flag: Option<String>,
) -> Result<HumeClient, CliError> {
    let env = EnvSettings::capture();
    let session = store.load_session()?;
    let global = store.load_global()?;
    let api_key = settings::resolve_api_key(
        api_key_flag,
        env.api_key.clone(),
        session.get_string(keys::API_KEY),
        global.get_string(keys::API_KEY),
    )?;
    build_client(api_key, env.base_url.as_deref())
}

/// Store a key in the global config. Without `--api-key` the browser is
/// pointed at the key portal and the key is read from stdin.
pub async fn login(
    api_key_flag: Option<String>,
    store: &ConfigStore,
    reporter: &Reporter,
) -> Result<(), CliError> {
    let api_key = match api_key_flag {
        Some(key) => key,
        None => {
            reporter.info(format!("Opening {PORTAL_URL}"));
            if let Err(err) = open::that(PORTAL_URL) {
                reporter.warn(format!("could not open a browser: {err}"));
                reporter.info(format!("Visit {PORTAL_URL} to create a key."));
            }
            prompt_line("Paste your API key: ").await?
        }
    };
    if api_key.is_empty() {
        return Err(CliError::MissingApiKey);
    }

    let mut record = store.load_global()?;
    record.set(keys::API_KEY, Value::String(api_key));
    store.save_global(&record)?;
    reporter.info(format!("API key saved to {}", store.global_path().display()));
    Ok(())
}

pub fn logout(store: &ConfigStore, reporter: &Reporter) -> Result<(), CliError> {
    let mut record = store.load_global()?;
    if record.unset(keys::API_KEY) {
        store.save_global(&record)?;
        reporter.info("API key removed.");
    } else {
        reporter.info("No API key was stored.");
    }
    Ok(())
}

async fn prompt_line(prompt: &str) -> Result<String, CliError> {
    eprint!("{prompt}");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .map_err(CliError::Stdin)?;
    Ok(line.trim().to_string())
}
