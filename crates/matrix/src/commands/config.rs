//! Config command - configuration inspection.

use anyhow::Result;
use clap::{Args, Subcommand};

use matrix_config::{Credential, Tier};
use matrix_llm::Builder;

use super::{Context, mask_secret};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved tiers and providers
    Show,

    /// Show which config files are used
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx).await,
        ConfigCommand::Path => cmd_path(ctx),
    }
}

async fn cmd_show(ctx: &Context) -> Result<()> {
    let resolved = ctx.load_config().await?;
    let config = &resolved.config;

    let mut builder = Builder::new(config);
    let models = builder.build_models();

    if ctx.json_output {
        let mut providers = serde_json::Map::new();
        for (id, p) in &config.providers {
            providers.insert(
                id.clone(),
                serde_json::json!({
                    "name": p.name,
                    "type": p.provider_type.as_ref().map(|t| t.to_string()),
                    "base_url": p.base_url,
                    "api_key": mask_secret(&p.api_key),
                    "auth": credential_kind(p.credential.as_ref()),
                    "disabled": p.disable,
                    "models": p.models.len(),
                }),
            );
        }
        let output = serde_json::json!({
            "models": config.models,
            "providers": providers,
            "options": config.options,
            "known_providers": resolved.known_providers.len(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("# Matrix Configuration\n");

    println!("## Models");
    for tier in Tier::ALL {
        match config.models.get(&tier) {
            Some(selected) => {
                print!("  {:<6} {} ({})", tier, selected.model, selected.provider);
                if selected.think {
                    print!(" [think]");
                }
                println!();
            }
            None => println!("  {:<6} (falls back to large)", tier),
        }
    }

    match &models {
        Ok((large, small)) => {
            println!();
            println!("  endpoint:       {}", large.model.endpoint());
            if large.metadata.context_window > 0 {
                println!("  context window: {} tokens", large.metadata.context_window);
            }
            if ctx.verbose && small.model.endpoint() != large.model.endpoint() {
                println!("  small endpoint: {}", small.model.endpoint());
            }
        }
        Err(e) => println!("\n  warning: models cannot be built: {}", e),
    }

    println!("\n## Providers");
    let mut ids: Vec<&String> = config.providers.keys().collect();
    ids.sort();
    for id in ids {
        let p = &config.providers[id];
        let state = if p.disable { " (disabled)" } else { "" };
        println!("  {}{}", id, state);
        if let Some(kind) = &p.provider_type {
            println!("    type:     {}", kind);
        }
        if !p.base_url.is_empty() {
            println!("    base_url: {}", p.base_url);
        }
        println!("    auth:     {}", credential_kind(p.credential.as_ref()));
        if !p.api_key.is_empty() {
            println!("    api_key:  {}", mask_secret(&p.api_key));
        }
        if let Some(Credential::OAuth(token)) = &p.credential {
            let status = if token.is_expired() {
                "needs refresh".to_string()
            } else {
                format!("{}s remaining", token.remaining_secs())
            };
            println!("    oauth:    {}", status);
        }
        if ctx.verbose {
            println!("    models:   {}", p.models.len());
        }
    }

    println!("\n## Options");
    println!("  data directory: {}", config.data_dir().display());
    println!("  debug:          {}", config.debug());
    println!(
        "  known providers: {}",
        resolved.known_providers.len()
    );

    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    if let Some(path) = &ctx.config_file {
        println!("config: {} (explicit)", path.display());
        return Ok(());
    }

    match matrix_config::global_config_path() {
        Ok(path) => {
            let state = if path.is_file() { "" } else { " (not found)" };
            println!("global:  {}{}", path.display(), state);
        }
        Err(e) => println!("global:  unavailable ({})", e),
    }

    let project = std::env::current_dir()
        .ok()
        .and_then(|dir| matrix_config::find_project_config(&dir));
    match project {
        Some(path) => println!("project: {}", path.display()),
        None => println!("project: (none)"),
    }
    Ok(())
}

fn credential_kind(credential: Option<&Credential>) -> &'static str {
    match credential {
        Some(Credential::ApiKey(_)) => "api key",
        Some(Credential::Bearer(_)) => "bearer token",
        Some(Credential::OAuth(_)) => "oauth",
        None => "none",
    }
}
