//! Auth command - provider credentials and setup.

use std::io::Write;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};

use matrix_config::Credential;
use matrix_oauth::{FlowAction, OAuthConfig, OAuthFlow};

use super::{Context, mask_secret};

const ANTHROPIC: &str = "anthropic";

/// Arguments for the auth command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Sign in with a Claude subscription via OAuth
    Login {
        /// Large tier model (default: the provider's default)
        #[arg(long)]
        large: Option<String>,

        /// Small tier model (default: the provider's default)
        #[arg(long)]
        small: Option<String>,
    },

    /// Configure a provider with an API key
    Setup {
        /// Provider id, e.g. "openai"
        #[arg(long)]
        provider: String,

        /// API key, or a $VAR reference
        #[arg(long)]
        api_key: String,

        /// Large tier model (default: the provider's default)
        #[arg(long)]
        large: Option<String>,

        /// Small tier model (default: the provider's default)
        #[arg(long)]
        small: Option<String>,
    },

    /// Show setup and credential status
    Status,

    /// Refresh expired OAuth tokens and save them
    Refresh,
}

/// Run the auth command.
pub async fn run(args: AuthArgs, ctx: &Context) -> Result<()> {
    match args.command {
        AuthCommand::Login { large, small } => cmd_login(large, small, ctx).await,
        AuthCommand::Setup {
            provider,
            api_key,
            large,
            small,
        } => cmd_setup(&provider, &api_key, large, small, ctx),
        AuthCommand::Status => cmd_status(ctx).await,
        AuthCommand::Refresh => cmd_refresh(ctx).await,
    }
}

/// Resolve tier models, falling back to the bundled defaults for the provider.
fn tier_models(
    provider_id: &str,
    large: Option<String>,
    small: Option<String>,
) -> Result<(String, String)> {
    let descriptor = matrix_config::embedded_providers()
        .into_iter()
        .find(|p| p.id == provider_id);
    let default = |id: Option<&str>| id.filter(|id| !id.is_empty()).map(str::to_string);

    let large = large
        .or_else(|| default(descriptor.as_ref().map(|d| d.default_large_model_id.as_str())))
        .with_context(|| format!("no default large model for {}; pass --large", provider_id))?;
    let small = small
        .or_else(|| default(descriptor.as_ref().map(|d| d.default_small_model_id.as_str())))
        .unwrap_or_else(|| large.clone());
    Ok((large, small))
}

async fn cmd_login(large: Option<String>, small: Option<String>, ctx: &Context) -> Result<()> {
    let (large, small) = tier_models(ANTHROPIC, large, small)?;
    let path = ctx.target_config_path()?;
    let oauth = OAuthConfig::anthropic();
    let mut flow = OAuthFlow::new(&oauth);

    println!("Claude Subscription Sign-in");
    println!("===========================");
    println!();

    if let FlowAction::OpenBrowser(url) = flow.confirm() {
        println!("Open this URL in your browser:");
        println!();
        println!("  {}", url);
        println!();
        if open_url(&url).is_err() {
            println!("(Could not open browser automatically)");
            println!();
        }
    }

    println!("After signing in, copy the code shown and paste it here.");

    let token = loop {
        print!("code> ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            anyhow::bail!("sign-in aborted");
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        flow.set_code(input);
        match flow.confirm() {
            FlowAction::Validate { code, verifier } => {
                println!("Verifying...");
                let result = matrix_oauth::exchange_code(&oauth, &code, &verifier, &ctx.cancel).await;
                flow.validation_completed(result);
                if let Some(err) = flow.last_error() {
                    println!("Invalid code: {}", err);
                    println!("Paste the code again, or press Ctrl-D to abort.");
                    continue;
                }
            }
            FlowAction::Complete(token) => break token,
            FlowAction::Idle | FlowAction::OpenBrowser(_) => continue,
        }

        if let FlowAction::Complete(token) = flow.confirm() {
            break token;
        }
    };

    matrix_config::save_wizard_result_with_oauth(&path, ANTHROPIC, &token, &large, &small)?;

    println!();
    println!("Signed in.");
    println!("Token expires in {} seconds", token.remaining_secs());
    println!("Saved to {}", path.display());
    Ok(())
}

fn cmd_setup(
    provider: &str,
    api_key: &str,
    large: Option<String>,
    small: Option<String>,
    ctx: &Context,
) -> Result<()> {
    if api_key.trim().is_empty() {
        anyhow::bail!("API key must not be empty");
    }
    let (large, small) = tier_models(provider, large, small)?;
    let path = ctx.target_config_path()?;

    matrix_config::save_wizard_result(&path, provider, api_key, &large, &small)?;

    if ctx.json_output {
        println!(
            "{}",
            serde_json::json!({
                "provider": provider,
                "large": large,
                "small": small,
                "path": path.display().to_string(),
            })
        );
    } else {
        println!("Configured {} ({})", provider, mask_secret(api_key));
        println!("  large: {}", large);
        println!("  small: {}", small);
        println!("Saved to {}", path.display());
    }
    Ok(())
}

async fn cmd_status(ctx: &Context) -> Result<()> {
    if matrix_config::is_first_run(&ctx.loader(), &ctx.cancel).await {
        println!("Not set up.");
        println!("  Run 'matrix auth setup' or 'matrix auth login' to get started.");
        return Ok(());
    }

    let resolved = ctx.load_config().await?;
    let config = &resolved.config;

    println!("Authentication Status");
    println!("---------------------");

    let mut ids: Vec<&String> = config.providers.keys().collect();
    ids.sort();
    for id in ids {
        let provider = &config.providers[id];
        let status = match &provider.credential {
            _ if provider.disable => "disabled".to_string(),
            Some(Credential::ApiKey(_)) => "api key".to_string(),
            Some(Credential::Bearer(_)) => "bearer token".to_string(),
            Some(Credential::OAuth(token)) if token.is_expired() => {
                "oauth (expired, run 'matrix auth refresh')".to_string()
            }
            Some(Credential::OAuth(token)) => {
                format!("oauth (expires in {}s)", token.remaining_secs())
            }
            None => "no credential".to_string(),
        };
        println!("{:<14} {}", id, status);
    }

    println!();
    if matrix_config::needs_setup(&resolved) {
        println!("Setup incomplete: a model tier has no usable provider.");
    } else {
        println!("Ready.");
    }
    Ok(())
}

async fn cmd_refresh(ctx: &Context) -> Result<()> {
    let path = ctx.target_config_path()?;
    if !path.is_file() {
        anyhow::bail!("no config file at {}", path.display());
    }

    let mut config = matrix_config::read_config_file(&path)?;
    let oauth = OAuthConfig::anthropic();

    let ids: Vec<String> = config
        .providers
        .iter()
        .filter(|(_, p)| p.oauth.is_some())
        .map(|(id, _)| id.clone())
        .collect();

    let mut refreshed = 0;
    for id in &ids {
        if matrix_config::refresh_provider_token(&mut config, id, &oauth, &ctx.cancel).await?
            && let Some(token) = config.providers.get(id).and_then(|p| p.oauth.as_ref())
        {
            matrix_config::save_provider_oauth(&path, id, token)?;
            println!("Refreshed {}", id);
            refreshed += 1;
        }
    }

    if refreshed > 0 {
        println!("Saved to {}", path.display());
    } else {
        println!("No tokens needed refreshing.");
    }
    Ok(())
}

/// Try to open a URL in the default browser.
fn open_url(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).status()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).status()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .status()?;
    }
    Ok(())
}
