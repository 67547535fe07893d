use anyhow::{Context, Result};
use ask_core::config::get_default_config_file;
use ask_core::{AnswerKind, AnswerShape, AskConfig, GenericAnswer, HttpAnswerClient, ReservationAnswer};
use clap::Parser;
use colored::*;
use tracing::{debug, info};

mod app;
mod cli;
mod logging;
mod output;

use crate::cli::Args;
use crate::logging::init_logging;
use crate::output::print_usage_instructions;

#[derive(Debug, PartialEq)]
enum Mode {
    Interactive,
    Single(String),
}

/// `-i` wins over a positional query; `None` means there is nothing to run
fn select_mode(args: &Args) -> Option<Mode> {
    match (args.interactive, &args.query) {
        (true, _) => Some(Mode::Interactive),
        (false, Some(query)) => Some(Mode::Single(query.clone())),
        (false, None) => None,
    }
}

/// Loads the file config, then layers environment and command-line overrides on top
fn load_config(args: &Args) -> Result<AskConfig> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => get_default_config_file().ok(),
    };

    let file_config = match &path {
        Some(path) => AskConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AskConfig::default(),
    };

    Ok(file_config.with_env_overrides().merge(&args.overrides()))
}

/// Main function - Sends queries to the Answer Service
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env before anything reads them
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging(config.log_level.as_deref().unwrap_or("info"));
    debug!("Effective configuration: {:?}", config);

    let Some(mode) = select_mode(&args) else {
        print_usage_instructions();
        return Ok(());
    };

    let result = match config.answer_kind() {
        AnswerKind::Generic => run::<GenericAnswer>(mode, &args, &config).await,
        AnswerKind::Reservation => run::<ReservationAnswer>(mode, &args, &config).await,
    };

    if let Err(e) = result {
        debug!("{:?}", e);
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }

    Ok(())
}

async fn run<A: AnswerShape>(mode: Mode, args: &Args, config: &AskConfig) -> Result<()> {
    let client = HttpAnswerClient::<A>::new(config)
        .context("Failed to initialize Answer Service client")?;
    info!(kind = %A::KIND, "Using Answer Service at {}", client.url());

    match mode {
        Mode::Interactive => app::run_interactive(client, args.json)
            .await
            .context("Interactive session failed"),
        Mode::Single(query) => app::run_single_query(query, &client, args.json).await,
    }
}
