//! Authenticated request assembly

use tracing::debug;

use super::error::ChatError;
use super::format::openai::ChatCompletionBody;
use super::types::{ChatTurn, RequestConfig};

/// A fully built request, independent of the HTTP client that sends it
#[derive(Clone)]
pub struct PreparedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Whether the body asks for an event stream
    pub stream: bool,
}

impl PreparedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Debug for PreparedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                if k.eq_ignore_ascii_case("authorization") {
                    (k.as_str(), "Bearer <redacted>")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("PreparedRequest")
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body_len", &self.body.len())
            .field("stream", &self.stream)
            .finish()
    }
}

/// Builds chat-completions requests for one endpoint and secret
pub struct RequestBuilder<'a> {
    endpoint: &'a str,
    secret: &'a str,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(endpoint: &'a str, secret: &'a str) -> Self {
        Self { endpoint, secret }
    }

    /// Serialize `prior` in order followed by `message` as the final user turn.
    ///
    /// Prior turns are replayed as given; filtering system turns is the
    /// caller's decision.
    pub fn build(
        &self,
        message: &str,
        config: &RequestConfig,
        prior: &[ChatTurn],
    ) -> Result<PreparedRequest, ChatError> {
        config.validate()?;

        let body = ChatCompletionBody::new(message, config, prior);
        let body = serde_json::to_vec(&body)
            .map_err(|e| ChatError::RequestBuild(format!("unserializable body: {}", e)))?;

        debug!(
            "Built request for model {} ({} prior turns, {} bytes, stream={})",
            config.model,
            prior.len(),
            body.len(),
            config.stream
        );

        let accept = if config.stream {
            "text/event-stream"
        } else {
            "application/json"
        };

        Ok(PreparedRequest {
            url: self.endpoint.to_string(),
            headers: vec![
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.secret),
                ),
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), accept.to_string()),
            ],
            body,
            stream: config.stream,
        })
    }
}
