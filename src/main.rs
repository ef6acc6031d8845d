mod chat;
mod chat_context;
mod cli;
mod commands;
mod config;
mod conversation;
mod error;
mod file_ops;
mod llm;
mod paths;
mod render;
mod reply;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::chat::run_chat;
use crate::cli::{Cli, Commands};
use crate::commands::{handle_config, run_doctor};
use crate::config::{Config, Overrides, load_config_or_default};

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    // Before parsing so `.env` values reach clap's env fallbacks.
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => debug!(error = %e, "ignoring unreadable .env"),
    }

    let cli = Cli::parse();
    let overrides = Overrides::from(cli.endpoint);

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let cfg = effective_config(&overrides)?;
            run_chat(&cfg).await?;
        }
        Commands::Config { command } => handle_config(command, &overrides)?,
        Commands::Doctor => {
            let cfg = effective_config(&overrides)?;
            run_doctor(&cfg).await?;
        }
    }

    Ok(())
}

fn effective_config(overrides: &Overrides) -> Result<Config> {
    let mut cfg = load_config_or_default()?;
    cfg.apply_overrides(overrides);
    Ok(cfg)
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
