//! Secret storage for Parley
//!
//! - `SecretStore` trait consumed by the chat client
//! - File-backed store with owner-only permissions
//! - In-memory store for embedding and tests

pub mod secret_store;

pub use secret_store::{FileSecretStore, MemorySecretStore, SecretStore};
