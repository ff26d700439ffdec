//! Providers command - provider metadata management.

use anyhow::Result;
use clap::{Args, Subcommand};

use matrix_config::{ProviderSource, ProviderSync};

use super::Context;

/// Arguments for the providers command.
#[derive(Args, Debug)]
pub struct ProvidersArgs {
    #[command(subcommand)]
    pub command: ProvidersCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProvidersCommand {
    /// Refresh the provider metadata cache
    Update {
        /// "embedded", an http(s) URL, or a JSON file (default: the catwalk service)
        source: Option<String>,
    },

    /// List known providers
    List,
}

/// Run the providers command.
pub async fn run(args: ProvidersArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ProvidersCommand::Update { source } => cmd_update(source, ctx).await,
        ProvidersCommand::List => cmd_list(ctx).await,
    }
}

/// Synchronizer over the same cache the config loader reads.
fn provider_sync(ctx: &Context) -> Result<ProviderSync> {
    Ok(ProviderSync::new(&ctx.data_dir()?))
}

async fn cmd_update(source: Option<String>, ctx: &Context) -> Result<()> {
    let sync = provider_sync(ctx)?;
    let source = match source {
        Some(s) => ProviderSource::parse(&s),
        None => ProviderSource::Url(sync.url().to_string()),
    };

    let providers = sync.update(&source, &ctx.cancel).await?;

    if ctx.json_output {
        println!(
            "{}",
            serde_json::json!({
                "providers": providers.len(),
                "cache": sync.cache_path().display().to_string(),
            })
        );
    } else {
        println!(
            "Updated {} providers ({})",
            providers.len(),
            sync.cache_path().display()
        );
    }
    Ok(())
}

async fn cmd_list(ctx: &Context) -> Result<()> {
    let providers = provider_sync(ctx)?.load(&ctx.cancel).await;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&providers)?);
        return Ok(());
    }

    for p in &providers {
        let kind = p
            .provider_type
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:<14} {:<14} {} models", p.id, kind, p.models.len());
        if ctx.verbose {
            println!("    large: {}", p.default_large_model_id);
            println!("    small: {}", p.default_small_model_id);
            if !p.api_key.is_empty() {
                println!("    key:   {}", p.api_key);
            }
        }
    }
    Ok(())
}
