//! `parley chat` - one streamed exchange

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use futures::StreamExt;
use parley_core::{ChatClient, ChatTurn, RequestConfig, StreamSignal};
use tracing::debug;

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Message to send
    pub message: String,

    /// Model id (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    #[arg(short, long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// System prompt placed before any history
    #[arg(short, long)]
    pub system: Option<String>,

    /// JSON array of prior turns: [{"role": "user", "content": "..."}]
    #[arg(long)]
    pub history: Option<PathBuf>,
}

impl ChatArgs {
    fn request_config(&self, defaults: &RequestConfig) -> RequestConfig {
        let mut config = defaults.clone();
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        config
    }

    fn prior_turns(&self) -> Result<Vec<ChatTurn>> {
        let mut turns = Vec::new();
        if let Some(system) = &self.system {
            turns.push(ChatTurn::system(system.as_str()));
        }
        if let Some(path) = &self.history {
            turns.extend(load_history(path)?);
        }
        Ok(turns)
    }
}

/// Read prior turns from a JSON file
pub fn load_history(path: &Path) -> Result<Vec<ChatTurn>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {:?}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse history file {:?}", path))
}

/// Stream one reply to stdout. Ctrl-C cancels and leaves the partial reply.
pub async fn run(client: &ChatClient, args: ChatArgs) -> Result<()> {
    let model = args.request_config(&client.config().model);
    let prior = args.prior_turns()?;

    let mut stream = client.send_message(&args.message, &model, &prior).await?;
    let mut stdout = std::io::stdout();
    let mut interrupted = false;
    let mut failure = None;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let signal = tokio::select! {
            _ = &mut ctrl_c, if !interrupted => {
                debug!("Interrupted, cancelling exchange");
                interrupted = true;
                client.cancel_current_request();
                continue;
            }
            signal = stream.next() => signal,
        };

        match signal {
            Some(StreamSignal::Content { text }) => {
                stdout.write_all(text.as_bytes())?;
                stdout.flush()?;
            }
            Some(error @ StreamSignal::Error { .. }) => {
                failure = error.user_message();
            }
            Some(StreamSignal::Done) | None => break,
        }
    }

    writeln!(stdout)?;
    match failure {
        Some(message) => Err(anyhow!(message)),
        None => Ok(()),
    }
}
