//! Transport seam between the exchange driver and the network
//!
//! `HttpTransport` sends requests with reqwest. Tests substitute their own
//! `ChatTransport` to control chunk timing.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::debug;

use super::error::ChatError;
use super::request::PreparedRequest;
use crate::config::ClientConfig;

/// Raw body chunks in arrival order
pub type ByteStream = BoxStream<'static, Result<Bytes, ChatError>>;

/// An opened response: status and headers are known, the body is pending
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: ByteStream,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the server answered with a plain JSON document instead of a stream
    pub fn is_json_document(&self) -> bool {
        match &self.content_type {
            Some(ct) => ct.to_ascii_lowercase().starts_with("application/json"),
            None => false,
        }
    }

    /// Read the remaining body into a string (error bodies are small)
    pub async fn text(mut self) -> Result<String, ChatError> {
        let mut bytes = Vec::new();
        while let Some(chunk) = self.body.next().await {
            bytes.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Opens a request and hands back the streamed body
///
/// Dropping the returned body must abort the underlying operation.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open(&self, request: PreparedRequest) -> Result<TransportResponse, ChatError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client with the configured connect and overall timeouts
    pub fn new(config: &ClientConfig) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, request: PreparedRequest) -> Result<TransportResponse, ChatError> {
        debug!("HTTP POST {}", request.url);
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.body(request.body).send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        debug!(
            "HTTP response status={} content-type={:?}",
            status, content_type
        );

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ChatError::from))
            .boxed();

        Ok(TransportResponse {
            status,
            content_type,
            body,
        })
    }
}
