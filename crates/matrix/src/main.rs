//! Matrix - terminal assistant for large language models
//!
//! Main entry point for the Matrix CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

mod commands;

use commands::{auth, config, providers};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Matrix - terminal assistant for large language models
#[derive(Parser)]
#[command(name = "matrix")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Load this config file only, skipping global/project discovery
    #[arg(long, global = true, env = "MATRIX_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configuration inspection
    Config(config::ConfigArgs),

    /// Provider metadata management
    Providers(providers::ProvidersArgs),

    /// Authentication and provider setup
    Auth(auth::AuthArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        config_file: cli.config,
        cancel: CancellationToken::new(),
    };

    // Console (human-readable) plus a daily rolling JSON file
    let filter = if cli.verbose {
        "matrix=debug,matrix_config=debug,matrix_llm=debug,matrix_oauth=debug,info"
    } else {
        "matrix=info,matrix_config=warn,matrix_llm=warn,matrix_oauth=warn,warn"
    };

    let log_dir = ctx
        .data_dir()
        .unwrap_or_else(|_| matrix_config::default_data_dir())
        .join("logs");
    let file_appender = tracing_appender::rolling::daily(&log_dir, "matrix.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "matrix=trace,matrix_config=trace,matrix_llm=trace,matrix_oauth=trace,info",
                )),
        )
        .init();

    // Ctrl-C cancels in-flight network calls
    {
        let cancel = ctx.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Config(args) => config::run(args, &ctx).await,
        Commands::Providers(args) => providers::run(args, &ctx).await,
        Commands::Auth(args) => auth::run(args, &ctx).await,
    }
}
