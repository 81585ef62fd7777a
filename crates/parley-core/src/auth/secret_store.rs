//! Provider secret storage
//!
//! Secrets are keyed by provider (e.g. `openai`) and never logged.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Key-value secret lookup consumed by the chat client
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Secret for `provider_key`, or `None` if none is stored
    async fn get_secret(&self, provider_key: &str) -> Result<Option<String>>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSecrets {
    #[serde(default)]
    secrets: HashMap<String, String>,
}

/// JSON file of provider secrets, written with 0600 permissions on Unix
pub struct FileSecretStore {
    secrets: Arc<RwLock<StoredSecrets>>,
    storage_path: PathBuf,
}

impl FileSecretStore {
    pub async fn new(storage_path: PathBuf) -> Result<Self> {
        info!(
            "FileSecretStore: Initializing with path: {:?}",
            storage_path
        );

        let secrets = if storage_path.exists() {
            match fs::read_to_string(&storage_path).await {
                Ok(content) => match serde_json::from_str::<StoredSecrets>(&content) {
                    Ok(secrets) => {
                        debug!(
                            "FileSecretStore: Loaded {} provider secrets",
                            secrets.secrets.len()
                        );
                        secrets
                    }
                    Err(e) => {
                        error!("FileSecretStore: Failed to parse secret file: {}", e);
                        StoredSecrets::default()
                    }
                },
                Err(e) => {
                    error!("FileSecretStore: Failed to read secret file: {}", e);
                    StoredSecrets::default()
                }
            }
        } else {
            warn!(
                "FileSecretStore: Secret file does not exist at {:?}",
                storage_path
            );
            StoredSecrets::default()
        };

        Ok(Self {
            secrets: Arc::new(RwLock::new(secrets)),
            storage_path,
        })
    }

    /// Default location under the platform data dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("parley").join("secrets.json"))
    }

    /// Store or replace the secret for a provider
    pub async fn set_secret(&self, provider_key: &str, secret: &str) -> Result<()> {
        let mut guard = self.secrets.write().await;
        guard
            .secrets
            .insert(provider_key.to_string(), secret.to_string());
        self.save(&guard).await?;
        info!(
            "FileSecretStore: Stored secret for provider '{}'",
            provider_key
        );
        Ok(())
    }

    /// Remove a provider's secret; returns whether one existed
    pub async fn remove_secret(&self, provider_key: &str) -> Result<bool> {
        let mut guard = self.secrets.write().await;
        let existed = guard.secrets.remove(provider_key).is_some();
        if existed {
            self.save(&guard).await?;
            info!(
                "FileSecretStore: Removed secret for provider '{}'",
                provider_key
            );
        }
        Ok(existed)
    }

    /// Save secrets to disk with proper permissions
    async fn save(&self, secrets: &StoredSecrets) -> Result<()> {
        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(secrets)?;
        fs::write(&self.storage_path, json)
            .await
            .with_context(|| format!("Failed to write {:?}", self.storage_path))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = fs::metadata(&self.storage_path).await?;
            let mut permissions = metadata.permissions();
            permissions.set_mode(0o600);
            fs::set_permissions(&self.storage_path, permissions).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get_secret(&self, provider_key: &str) -> Result<Option<String>> {
        Ok(self.secrets.read().await.secrets.get(provider_key).cloned())
    }
}

/// Secrets held only in memory
#[derive(Default)]
pub struct MemorySecretStore {
    secrets: parking_lot::RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, provider_key: &str, secret: &str) -> Self {
        self.insert(provider_key, secret);
        self
    }

    pub fn insert(&self, provider_key: &str, secret: &str) {
        self.secrets
            .write()
            .insert(provider_key.to_string(), secret.to_string());
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get_secret(&self, provider_key: &str) -> Result<Option<String>> {
        Ok(self.secrets.read().get(provider_key).cloned())
    }
}
