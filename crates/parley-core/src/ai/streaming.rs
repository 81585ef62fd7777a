//! Streaming types for chat exchanges

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::cancellation::CancellationController;

/// Terminal error categories visible to the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    InvalidResponseShape,
    HttpStatus { code: u16 },
}

impl ErrorKind {
    /// Render a message a user can act on. All terminal errors are retryable.
    pub fn user_message(&self, detail: &str) -> String {
        match self {
            ErrorKind::Transport => {
                format!("Couldn't reach the server ({detail}). Check your connection and retry.")
            }
            ErrorKind::InvalidResponseShape => {
                format!("The server sent an unexpected response ({detail}). Please try again.")
            }
            ErrorKind::HttpStatus { code: 401 | 403 } => {
                format!("The API key was rejected: {detail}. Update it and try again.")
            }
            ErrorKind::HttpStatus { code: 429 } => {
                format!("The provider is rate limiting requests: {detail}. Try again shortly.")
            }
            ErrorKind::HttpStatus { code } => {
                format!("Request failed ({code}): {detail}. Please try again.")
            }
        }
    }
}

/// The only unit that flows from an exchange to its consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamSignal {
    /// Incremental content fragment, in frame order
    #[serde(rename = "content")]
    Content { text: String },

    /// Exchange ended; nothing follows
    #[serde(rename = "done")]
    Done,

    /// Terminal failure; only `Done` follows
    #[serde(rename = "error")]
    Error { kind: ErrorKind, message: String },
}

impl StreamSignal {
    pub fn content(text: impl Into<String>) -> Self {
        StreamSignal::Content { text: text.into() }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamSignal::Content { .. })
    }

    pub fn as_content(&self) -> Option<&str> {
        match self {
            StreamSignal::Content { text } => Some(text),
            _ => None,
        }
    }

    /// Display text for an error signal
    pub fn user_message(&self) -> Option<String> {
        match self {
            StreamSignal::Error { kind, message } => Some(kind.user_message(message)),
            _ => None,
        }
    }
}

/// Consumer end of one exchange
///
/// Yields signals in emission order and ends after `Done`. Dropping it
/// cancels the exchange.
pub struct ChatStream {
    signals: UnboundedReceiverStream<StreamSignal>,
    cancel: CancellationController,
}

impl ChatStream {
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<StreamSignal>,
        cancel: CancellationController,
    ) -> Self {
        Self {
            signals: UnboundedReceiverStream::new(rx),
            cancel,
        }
    }

    /// Cancel this exchange. Idempotent.
    pub fn cancel(&self) {
        self.cancel.request_cancel();
    }

    /// Handle that can cancel this exchange from another task
    pub fn cancel_handle(&self) -> CancellationController {
        self.cancel.clone()
    }
}

impl Stream for ChatStream {
    type Item = StreamSignal;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.signals).poll_next(cx)
    }
}

impl Drop for ChatStream {
    fn drop(&mut self) {
        self.cancel.request_cancel();
    }
}
