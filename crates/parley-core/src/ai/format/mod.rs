//! Provider wire formats
//!
//! Only the OpenAI-compatible chat-completions format is spoken.

pub mod openai;

pub use openai::{ChatCompletionBody, ContentExtractor, WireMessage};
