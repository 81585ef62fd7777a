//! Chat client core
//!
//! Resolves the provider secret, builds the request, claims the exchange
//! slot and spawns the driver.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::driver::StreamDriver;
use super::slot::ExchangeSlot;
use crate::ai::cancellation::CancellationController;
use crate::ai::error::ChatError;
use crate::ai::request::RequestBuilder;
use crate::ai::streaming::ChatStream;
use crate::ai::transport::{ChatTransport, HttpTransport};
use crate::ai::types::{ChatTurn, RequestConfig};
use crate::auth::SecretStore;
use crate::config::ClientConfig;

/// Streaming chat-completions client
///
/// At most one exchange runs per client; see `ConcurrencyPolicy` for what a
/// second `send_message` does while one is in flight.
pub struct ChatClient {
    config: ClientConfig,
    endpoint: String,
    transport: Arc<dyn ChatTransport>,
    secrets: Arc<dyn SecretStore>,
    slot: ExchangeSlot,
}

impl ChatClient {
    /// Client that talks HTTP using the configured timeouts
    pub fn new(config: ClientConfig, secrets: Arc<dyn SecretStore>) -> Result<Self, ChatError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::with_transport(config, secrets, transport)
    }

    pub fn with_transport(
        config: ClientConfig,
        secrets: Arc<dyn SecretStore>,
        transport: Arc<dyn ChatTransport>,
    ) -> Result<Self, ChatError> {
        config.validate()?;
        let endpoint = config.endpoint()?;
        debug!("ChatClient created for {}", endpoint);
        Ok(Self {
            config,
            endpoint,
            transport,
            secrets,
            slot: ExchangeSlot::default(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send `text` after `prior` turns and stream the reply.
    ///
    /// Local failures (missing secret, invalid parameters, a rejected
    /// concurrent call) are returned here. Everything after the request is
    /// issued arrives through the returned stream.
    pub async fn send_message(
        &self,
        text: &str,
        model: &RequestConfig,
        prior: &[ChatTurn],
    ) -> Result<ChatStream, ChatError> {
        let provider_key = &self.config.provider_key;
        let secret = self
            .secrets
            .get_secret(provider_key)
            .await
            .map_err(|e| ChatError::SecretStore(format!("{:#}", e)))?
            .ok_or_else(|| ChatError::MissingSecret(provider_key.clone()))?;

        let model = model.clone().with_stream(true);
        let builder = RequestBuilder::new(&self.endpoint, &secret);
        let request = builder.build(text, &model, prior)?;

        let cancel = CancellationController::new();
        let id = self.slot.claim(self.config.concurrency, cancel.clone())?;
        info!(
            "Sending exchange #{} to {} (model {}, {} prior turns)",
            id,
            self.endpoint,
            model.model,
            prior.len()
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let driver = StreamDriver::new(
            id,
            self.transport.clone(),
            cancel.clone(),
            tx,
            self.slot.clone(),
        );
        tokio::spawn(driver.run(request));

        Ok(ChatStream::new(rx, cancel))
    }

    /// Send using the configured default model parameters
    pub async fn send(&self, text: &str, prior: &[ChatTurn]) -> Result<ChatStream, ChatError> {
        let model = self.config.model.clone();
        self.send_message(text, &model, prior).await
    }

    /// Cancel the in-flight exchange, if any. Fire-and-forget and idempotent.
    pub fn cancel_current_request(&self) {
        if self.slot.cancel_current() {
            info!("Cancellation requested for current exchange");
        }
    }

    /// Whether an exchange is currently in flight
    pub fn is_busy(&self) -> bool {
        self.slot.is_busy()
    }
}
