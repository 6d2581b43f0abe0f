//! Mai-Sale CLI
//!
//! Chat with the store assistant from the terminal.

use anyhow::Result;
use clap::Parser;
use maisale_core::error::exit_codes;
use maisale_core::{ChatService, Config, Database, MaiSaleError, OllamaClient};
use std::sync::Arc;

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<MaiSaleError>()
            .map(MaiSaleError::exit_code)
            .unwrap_or(exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    config.validate()?;
    if !matches!(cli.command, Commands::Status) {
        config.authorize(cli.api_key.as_deref())?;
    }

    // Open database (use MAISALE_DB env var if set, otherwise use default)
    let db_path = std::env::var("MAISALE_DB")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| Database::default_path());
    let db = Arc::new(Database::open(&db_path)?);
    db.initialize()?;

    let llm = Arc::new(OllamaClient::new(config.llm_service.clone())?);
    let service = ChatService::from_database(Arc::clone(&db), llm, &config)?;

    let result = match cli.command {
        Commands::Conversation(args) => {
            commands::conversation::run(args, &service, &db, cli.format).await
        }
        Commands::Send(args) => commands::send::run(args, &service, cli.format).await,
        Commands::Stream(args) => commands::stream::run(args, &service, cli.format).await,
        Commands::Chat(args) => commands::chat::run(args, &service).await,
        Commands::History(args) => commands::history::run(args, &service, cli.format).await,
        Commands::Index(args) => commands::index::run(args, &db, &config, cli.format).await,
        Commands::Status => commands::status::run(&service, &db, &config, cli.format).await,
    };

    service.wait_for_indexing().await;
    result
}
