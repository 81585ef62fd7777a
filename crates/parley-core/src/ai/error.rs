//! Error taxonomy for chat exchanges
//!
//! Terminal errors reach the consumer as exactly one `StreamSignal::Error`.
//! `FrameDecode` is per-frame and never leaves the driver. The remaining
//! variants are local failures returned before an exchange starts.

use serde_json::Value;
use thiserror::Error;

use super::streaming::ErrorKind;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Connection-level failure: DNS, TLS, timeout, reset mid-body
    #[error("transport error: {0}")]
    Transport(String),

    /// The response was not an event stream
    #[error("invalid response: {0}")]
    InvalidResponseShape(String),

    /// Non-2xx status with the provider's message when one could be read
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// A single data frame failed to decode; recoverable
    #[error("failed to decode frame: {0}")]
    FrameDecode(#[from] serde_json::Error),

    #[error("request cancelled")]
    Cancelled,

    #[error("failed to build request: {0}")]
    RequestBuild(String),

    #[error("no secret stored for provider '{0}'")]
    MissingSecret(String),

    #[error("secret store: {0}")]
    SecretStore(String),

    #[error("an exchange is already in flight")]
    ExchangeInFlight,

    #[error("config: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ChatError::Transport(format!("request timed out: {}", err))
        } else {
            ChatError::Transport(err.to_string())
        }
    }
}

impl ChatError {
    /// Build an `HttpStatus` error from a response body, falling back to
    /// the canonical status text when the body carries no message.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = extract_error_message(body).unwrap_or_else(|| generic_status_message(status));
        ChatError::HttpStatus { status, message }
    }

    /// Kind carried by the terminal error signal, `None` for outcomes that
    /// never surface as an error signal.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ChatError::Transport(_) => Some(ErrorKind::Transport),
            ChatError::InvalidResponseShape(_) => Some(ErrorKind::InvalidResponseShape),
            ChatError::HttpStatus { status, .. } => Some(ErrorKind::HttpStatus { code: *status }),
            _ => None,
        }
    }

    /// Message carried by the terminal error signal
    pub fn signal_message(&self) -> String {
        match self {
            ChatError::Transport(msg) | ChatError::InvalidResponseShape(msg) => msg.clone(),
            ChatError::HttpStatus { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Retryable, human-readable text for display
    pub fn user_message(&self) -> String {
        match self.kind() {
            Some(kind) => kind.user_message(&self.signal_message()),
            None => self.to_string(),
        }
    }
}

/// Pull a human-readable message out of a provider error body.
///
/// Accepts `{"error":{"message":..}}` first, then `{"message":..}`.
pub fn extract_error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .or_else(|| json.get("message").and_then(|m| m.as_str()))
        .map(|m| m.to_string())
}

fn generic_status_message(status: u16) -> String {
    let reason = reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason());
    match reason {
        Some(reason) => format!("request failed with status {} ({})", status, reason),
        None => format!("request failed with status {}", status),
    }
}
