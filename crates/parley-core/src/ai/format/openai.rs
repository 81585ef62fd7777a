//! OpenAI-compatible chat-completions format
//!
//! Request body serialization and streamed chunk decoding.

use serde::{Deserialize, Serialize};

use crate::ai::error::ChatError;
use crate::ai::types::{ChatTurn, RequestConfig, Role};

/// A message as it appears in the `messages` array
#[derive(Debug, Serialize)]
pub struct WireMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

impl<'a> From<&'a ChatTurn> for WireMessage<'a> {
    fn from(turn: &'a ChatTurn) -> Self {
        Self {
            role: turn.role().as_str(),
            content: turn.content(),
        }
    }
}

/// Request body for `POST /chat/completions`
#[derive(Debug, Serialize)]
pub struct ChatCompletionBody<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage<'a>>,
    pub stream: bool,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "no_stop_sequences")]
    pub stop: &'a [String],
}

fn no_stop_sequences(stop: &&[String]) -> bool {
    stop.is_empty()
}

impl<'a> ChatCompletionBody<'a> {
    /// Prior turns in their given order, then the new user message
    pub fn new(message: &'a str, config: &'a RequestConfig, prior: &'a [ChatTurn]) -> Self {
        let mut messages: Vec<WireMessage<'a>> = prior.iter().map(WireMessage::from).collect();
        messages.push(WireMessage {
            role: Role::User.as_str(),
            content: message,
        });

        Self {
            model: &config.model,
            messages,
            stream: config.stream,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
            frequency_penalty: config.frequency_penalty,
            presence_penalty: config.presence_penalty,
            stop: &config.stop,
        }
    }
}

/// One streamed `chat.completion.chunk`
#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// In-band error some servers send in place of a chunk
    #[serde(default)]
    pub error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkError {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Option<ChunkDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// What a single data frame contributed
#[derive(Debug, Default, PartialEq)]
pub struct FrameDelta {
    /// Non-empty content of the first choice
    pub content: Option<String>,
    pub finish_reason: Option<String>,
    /// Message of an in-band error frame
    pub error: Option<String>,
}

/// Decodes data-frame payloads into content fragments
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentExtractor;

impl ContentExtractor {
    /// Decode one payload. Only the first choice is considered; role-only
    /// and finish-only frames yield no content.
    pub fn decode(&self, payload: &str) -> Result<FrameDelta, ChatError> {
        let chunk: ChatCompletionChunk = serde_json::from_str(payload)?;
        let error = chunk.error.map(|e| e.message.unwrap_or_default());
        let Some(choice) = chunk.choices.into_iter().next() else {
            return Ok(FrameDelta {
                error,
                ..FrameDelta::default()
            });
        };

        let content = choice
            .delta
            .and_then(|d| d.content)
            .filter(|c| !c.is_empty());

        Ok(FrameDelta {
            content,
            finish_reason: choice.finish_reason,
            error,
        })
    }
}
