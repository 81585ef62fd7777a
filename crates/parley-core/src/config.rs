//! Client configuration
//!
//! Loaded from `~/.config/parley/config.toml` (platform config dir). A
//! missing file means defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::ai::error::ChatError;
use crate::ai::types::RequestConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// What to do when `send_message` is called while an exchange is in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// Cancel the in-flight exchange, then start the new one
    #[default]
    Supersede,
    /// Fail the new call with `ChatError::ExchangeInFlight`
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the OpenAI-compatible API, without `/chat/completions`
    pub base_url: String,
    /// Key used to look up the API secret
    pub provider_key: String,
    /// Overall request timeout, including the streamed body
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub concurrency: ConcurrencyPolicy,
    /// Default model parameters
    pub model: RequestConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            provider_key: "openai".to_string(),
            request_timeout_secs: 300,
            connect_timeout_secs: 30,
            concurrency: ConcurrencyPolicy::default(),
            model: RequestConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Platform config path, if a config dir exists
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("parley").join("config.toml"))
    }

    /// Load from `path`, falling back to defaults when the file is absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChatError> {
        self.endpoint()?;
        if self.provider_key.trim().is_empty() {
            return Err(ChatError::Config("provider_key is empty".to_string()));
        }
        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(ChatError::Config("timeouts must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Full chat-completions URL
    pub fn endpoint(&self) -> Result<String, ChatError> {
        let trimmed = self.base_url.trim_end_matches('/');
        let base = Url::parse(trimmed)
            .map_err(|e| ChatError::Config(format!("invalid base_url '{trimmed}': {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ChatError::Config(format!(
                "base_url must be http or https, got '{}'",
                base.scheme()
            )));
        }
        Ok(format!("{}/chat/completions", base.as_str().trim_end_matches('/')))
    }
}
