//! Shared helpers for exchange tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use parley_core::ai::request::PreparedRequest;
use parley_core::ai::transport::{ChatTransport, TransportResponse};
use parley_core::auth::MemorySecretStore;
use parley_core::{ChatClient, ChatError, ChatStream, ClientConfig, StreamSignal};
use tokio::sync::{mpsc, Notify};
use tokio_stream::wrappers::UnboundedReceiverStream;

pub const SECRET: &str = "sk-test";

/// Feeds body chunks to an opened exchange under test control
pub struct ChunkFeed {
    tx: mpsc::UnboundedSender<Result<Bytes, ChatError>>,
}

impl ChunkFeed {
    /// Deliver a chunk; returns false once the exchange dropped its body
    pub fn send(&self, chunk: &str) -> bool {
        self.send_bytes(chunk.as_bytes())
    }

    pub fn send_bytes(&self, chunk: &[u8]) -> bool {
        self.tx.send(Ok(Bytes::copy_from_slice(chunk))).is_ok()
    }

    pub fn fail(&self, message: &str) -> bool {
        self.fail_with(ChatError::Transport(message.to_string()))
    }

    pub fn fail_with(&self, error: ChatError) -> bool {
        self.tx.send(Err(error)).is_ok()
    }

    /// Resolves once the exchange has released the transport body
    pub async fn released(&self) {
        self.tx.closed().await
    }
}

enum Script {
    Respond {
        status: u16,
        content_type: Option<String>,
        body: mpsc::UnboundedReceiver<Result<Bytes, ChatError>>,
    },
    Fail(ChatError),
}

/// In-memory transport answering each `open` with the next scripted response
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<PreparedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue an event-stream response whose body is fed through the returned handle
    pub fn respond(&self, status: u16) -> ChunkFeed {
        self.respond_with_type(status, Some("text/event-stream"))
    }

    pub fn respond_with_type(&self, status: u16, content_type: Option<&str>) -> ChunkFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.scripts.lock().push_back(Script::Respond {
            status,
            content_type: content_type.map(|s| s.to_string()),
            body: rx,
        });
        ChunkFeed { tx }
    }

    /// Queue a response whose whole body is known up front
    pub fn respond_body(&self, status: u16, content_type: Option<&str>, chunks: &[&str]) {
        let feed = self.respond_with_type(status, content_type);
        for chunk in chunks {
            feed.send(chunk);
        }
    }

    pub fn fail_open(&self, message: &str) {
        self.fail_open_with(ChatError::Transport(message.to_string()));
    }

    pub fn fail_open_with(&self, error: ChatError) {
        self.scripts.lock().push_back(Script::Fail(error));
    }

    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn open(&self, request: PreparedRequest) -> Result<TransportResponse, ChatError> {
        self.requests.lock().push(request);
        let script = self.scripts.lock().pop_front();
        match script {
            Some(Script::Respond {
                status,
                content_type,
                body,
            }) => Ok(TransportResponse {
                status,
                content_type,
                body: UnboundedReceiverStream::new(body).boxed(),
            }),
            Some(Script::Fail(error)) => Err(error),
            None => Err(ChatError::Transport("no scripted response".to_string())),
        }
    }
}

/// Transport whose `open` never completes, like a stalled connect
#[derive(Default)]
pub struct StalledTransport {
    opened: Notify,
}

impl StalledTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Resolves once an exchange is waiting inside `open`
    pub async fn opened(&self) {
        self.opened.notified().await
    }
}

#[async_trait]
impl ChatTransport for StalledTransport {
    async fn open(&self, _request: PreparedRequest) -> Result<TransportResponse, ChatError> {
        self.opened.notify_one();
        futures::future::pending().await
    }
}

pub fn client_with(transport: Arc<dyn ChatTransport>, config: ClientConfig) -> ChatClient {
    let secrets = Arc::new(MemorySecretStore::new().with_secret(&config.provider_key, SECRET));
    ChatClient::with_transport(config, secrets, transport).unwrap()
}

pub fn client(transport: Arc<dyn ChatTransport>) -> ChatClient {
    client_with(transport, ClientConfig::default())
}

/// Drain a stream to its end, failing the test if it stalls
pub async fn collect(stream: ChatStream) -> Vec<StreamSignal> {
    tokio::time::timeout(Duration::from_secs(5), stream.collect::<Vec<_>>())
        .await
        .expect("stream did not terminate")
}

/// Next signal, failing the test if none arrives in time
pub async fn next_signal(stream: &mut ChatStream) -> Option<StreamSignal> {
    tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("no signal arrived")
}

pub fn frame(content: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({"choices": [{"delta": {"content": content}}]})
    )
}

pub fn contents(signals: &[StreamSignal]) -> Vec<String> {
    signals
        .iter()
        .filter_map(|s| s.as_content().map(|c| c.to_string()))
        .collect()
}
