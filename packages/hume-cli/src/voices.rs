//! `hume voices` subcommands.

use hume_api::endpoints::voices::{CreateVoice, DeleteVoice, ListVoices};
use serde_json::json;

use crate::auth;
use crate::cli::VoicesCommand;
use crate::config::ConfigStore;
use crate::error::CliError;
use crate::history::HistoryStore;
use crate::reporter::Reporter;
use crate::tts::pick_from_history;

pub async fn run(
    command: &VoicesCommand,
    api_key_flag: Option<String>,
    store: &ConfigStore,
    reporter: &Reporter,
) -> Result<(), CliError> {
    let client = auth::client_from_store(store, api_key_flag)?;

    match command {
        VoicesCommand::List { provider } => {
            let page = reporter
                .with_spinner(
                    "Fetching voices",
                    client.hit(ListVoices {
                        provider: provider.to_wire(),
                        ..ListVoices::default()
                    }),
                )
                .await?;

            if reporter.json_mode() {
                let voices: Vec<_> = page
                    .voices_page
                    .iter()
                    .map(|v| json!({"id": v.id, "name": v.name}))
                    .collect();
                reporter.json(&json!({ "voices": voices }));
            } else if page.voices_page.is_empty() {
                reporter.info("No voices found.");
            } else {
                for voice in &page.voices_page {
                    reporter.info(format!("{}  ({})", voice.name, voice.id));
                }
            }
        }

        VoicesCommand::Save {
            name,
            generation_id,
            last,
            last_index,
        } => {
            let generation_id = match generation_id {
                Some(id) => id.clone(),
                None if *last || last_index.is_some() => {
                    let history = HistoryStore::new(store.history_path());
                    pick_from_history(&history, *last_index)?
                }
                None => return Err(CliError::MissingVoiceSource),
            };

            let saved = reporter
                .with_spinner(
                    "Saving voice",
                    client.hit(CreateVoice {
                        generation_id: generation_id.clone(),
                        name: name.clone(),
                    }),
                )
                .await?;

            reporter.info(format!(
                "Saved voice {} ({}) from generation {generation_id}",
                saved.name, saved.id
            ));
            reporter.json(&json!({"id": saved.id, "name": saved.name}));
        }

        VoicesCommand::Delete { name } => {
            reporter
                .with_spinner("Deleting voice", client.hit(DeleteVoice { name: name.clone() }))
                .await?;
            reporter.info(format!("Deleted voice {name}"));
            reporter.json(&json!({"deleted": name}));
        }
    }
    Ok(())
}
