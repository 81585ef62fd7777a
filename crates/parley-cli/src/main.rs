//! Parley - stream chat completions in the terminal

mod chat;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use parley_core::auth::FileSecretStore;
use parley_core::{ChatClient, ClientConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "parley",
    version,
    about = "Stream chat completions from OpenAI-compatible APIs"
)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Secret store file (defaults to the platform data dir)
    #[arg(long, global = true)]
    secrets: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a message and stream the reply
    Chat(chat::ChatArgs),
    /// Manage provider API keys
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

#[derive(Subcommand)]
enum SecretAction {
    /// Store the API key for a provider
    Set { provider: String, value: String },
    /// Remove the API key for a provider
    Remove { provider: String },
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "parley=debug,parley_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let secrets_path = match cli.secrets {
        Some(path) => path,
        None => FileSecretStore::default_path()
            .ok_or_else(|| anyhow!("No data directory available; pass --secrets"))?,
    };
    let secrets = FileSecretStore::new(secrets_path).await?;

    match cli.command {
        Command::Secret { action } => match action {
            SecretAction::Set { provider, value } => {
                secrets.set_secret(&provider, &value).await?;
                eprintln!("Stored API key for '{}'", provider);
            }
            SecretAction::Remove { provider } => {
                if secrets.remove_secret(&provider).await? {
                    eprintln!("Removed API key for '{}'", provider);
                } else {
                    eprintln!("No API key stored for '{}'", provider);
                }
            }
        },
        Command::Chat(args) => {
            let config = match cli.config.or_else(ClientConfig::default_path) {
                Some(path) => ClientConfig::load(&path)?,
                None => ClientConfig::default(),
            };
            let client = ChatClient::new(config, Arc::new(secrets))
                .context("Failed to create chat client")?;
            chat::run(&client, args).await?;
        }
    }

    Ok(())
}
