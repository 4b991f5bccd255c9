use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hume_cli::cli::{Cli, Commands};
use hume_cli::config::ConfigStore;
use hume_cli::reporter::Reporter;
use hume_cli::{auth, config, tts, voices};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let reporter = Reporter::new(cli.json);
    let store = ConfigStore::open_default()?;

    match &cli.command {
        Commands::Tts(args) => tts::run(args, cli.api_key.clone(), &store, &reporter).await?,
        Commands::Voices(command) => {
            voices::run(command, cli.api_key.clone(), &store, &reporter).await?
        }
        Commands::Config(args) => config::run_command(args, &store, &reporter)?,
        Commands::Login => auth::login(cli.api_key.clone(), &store, &reporter).await?,
        Commands::Logout => auth::logout(&store, &reporter)?,
    }
    Ok(())
}
