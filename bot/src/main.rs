//! # docqa-bot Main Entry Point
//!
//! File: bot/src/main.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! A chat bot that answers questions about a single JSON document. Each user
//! message arrives as a Bot Framework activity on `POST /api/messages`; the bot
//! pastes the document and the question into a prompt, asks the completion
//! provider, and replies with the answer.
//!
//! This file handles:
//! - Command-line / environment parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Building the application context and starting the HTTP listener
//!
//! ## Examples
//!
//! ```bash
//! # Local emulator, no credentials
//! OPENAI_API_KEY=sk-... docqa-bot --document company.json
//!
//! # Registered bot, legacy adapter, more logging
//! MicrosoftAppId=... MicrosoftAppPassword=... docqa-bot --adapter legacy -v
//! ```
//!
//! Startup flow:
//! 1. Parse args via Clap (flags fall back to environment variables)
//! 2. Configure logging based on verbosity level
//! 3. Merge configuration and load the document; failures exit with status 1
//! 4. Serve until Ctrl+C / SIGTERM
//!
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

mod conversation; // Activities, turn context, state, handler
mod core; // Core infrastructure (config, errors, application context)
mod qa; // Document, prompt, completion client
mod server; // HTTP listener
mod transport; // Cloud and legacy adapters, connector client

use crate::core::config::{self, BotArgs};
use crate::core::context::AppContext;

/// Top-level command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "docqa-bot",
    about = "Document Q&A chat bot",
    long_about = "Answers chat questions about a JSON document by forwarding them, \
                  together with the document, to a chat-completion model.",
    version
)]
struct Cli {
    #[command(flatten)]
    args: BotArgs,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    if let Err(e) = run(cli.args).await {
        tracing::error!("docqa-bot failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(args: BotArgs) -> core::error::Result<()> {
    let config = config::load_and_merge_config(args)?;
    tracing::info!("Effective bot config: {:?}", config);

    let app = Arc::new(AppContext::from_config(&config)?);
    server::run_server(&config, app).await
}
