//! Parley core library
//!
//! - Streaming chat-completion client for OpenAI-compatible endpoints
//! - Secret storage for provider API keys
//! - Client configuration

pub mod ai;
pub mod auth;
pub mod config;

pub use ai::client::ChatClient;
pub use ai::error::ChatError;
pub use ai::streaming::{ChatStream, ErrorKind, StreamSignal};
pub use ai::types::{ChatTurn, RequestConfig, Role};
pub use config::{ClientConfig, ConcurrencyPolicy};
