//! Exchange driver
//!
//! Runs one exchange from request to terminal signal. The driver owns the
//! frame buffer (through the SSE processor), the sender half of the signal
//! channel and the transport body; all of it is dropped when `run` returns.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::slot::ExchangeSlot;
use crate::ai::cancellation::CancellationController;
use crate::ai::error::{extract_error_message, ChatError};
use crate::ai::request::PreparedRequest;
use crate::ai::sse::{ChunkOutcome, SseStreamProcessor};
use crate::ai::streaming::{ErrorKind, StreamSignal};
use crate::ai::transport::{ChatTransport, TransportResponse};

/// Lifecycle of a single exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    Sending,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl ExchangeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExchangeState::Completed | ExchangeState::Cancelled | ExchangeState::Failed
        )
    }

    pub fn can_transition_to(&self, next: ExchangeState) -> bool {
        use ExchangeState::*;
        match (self, next) {
            (Idle, Sending) => true,
            (Sending, Streaming) => true,
            // An empty 2xx body ends before any chunk arrives
            (Sending, Completed) | (Streaming, Completed) => true,
            (Sending, Failed) | (Streaming, Failed) => true,
            (Idle | Sending | Streaming, Cancelled) => true,
            _ => false,
        }
    }
}

enum ExchangeOutcome {
    Completed,
    Cancelled,
    Failed(ChatError),
}

pub(crate) struct StreamDriver {
    id: u64,
    transport: Arc<dyn ChatTransport>,
    cancel: CancellationController,
    tx: mpsc::UnboundedSender<StreamSignal>,
    slot: ExchangeSlot,
    state: ExchangeState,
    started: Instant,
}

impl StreamDriver {
    pub fn new(
        id: u64,
        transport: Arc<dyn ChatTransport>,
        cancel: CancellationController,
        tx: mpsc::UnboundedSender<StreamSignal>,
        slot: ExchangeSlot,
    ) -> Self {
        Self {
            id,
            transport,
            cancel,
            tx,
            slot,
            state: ExchangeState::Idle,
            started: Instant::now(),
        }
    }

    /// Drive the exchange to a terminal state and emit its final signals
    pub async fn run(mut self, request: PreparedRequest) {
        info!("Exchange #{} started: {}", self.id, request.url);
        let outcome = self.drive(request).await;
        // Free the slot first so a consumer that has seen Done finds the client idle
        self.slot.release(self.id);
        self.finish(outcome);
    }

    async fn drive(&mut self, request: PreparedRequest) -> ExchangeOutcome {
        let cancel = self.cancel.clone();
        let transport = self.transport.clone();

        self.transition(ExchangeState::Sending);
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return ExchangeOutcome::Cancelled,
            opened = transport.open(request) => opened,
        };

        if cancel.is_cancelled() {
            return ExchangeOutcome::Cancelled;
        }
        let response = match opened {
            Ok(response) => response,
            Err(ChatError::Cancelled) => return ExchangeOutcome::Cancelled,
            Err(e) => return ExchangeOutcome::Failed(e),
        };

        if !response.is_success() {
            let status = response.status;
            let body = match read_body(response, &cancel).await {
                Some(body) => body,
                None => return ExchangeOutcome::Cancelled,
            };
            return ExchangeOutcome::Failed(ChatError::from_status(status, &body));
        }

        if response.is_json_document() {
            let body = match read_body(response, &cancel).await {
                Some(body) => body,
                None => return ExchangeOutcome::Cancelled,
            };
            let message = extract_error_message(&body)
                .unwrap_or_else(|| "expected an event stream, got a JSON document".to_string());
            return ExchangeOutcome::Failed(ChatError::InvalidResponseShape(message));
        }

        let mut body = response.body;
        let mut processor = SseStreamProcessor::new(self.tx.clone(), cancel.clone());

        let outcome = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break ExchangeOutcome::Cancelled,
                next = body.next() => next,
            };

            if cancel.is_cancelled() {
                break ExchangeOutcome::Cancelled;
            }

            match next {
                Some(Ok(chunk)) => {
                    if self.state == ExchangeState::Sending {
                        self.transition(ExchangeState::Streaming);
                    }
                    match processor.process_chunk(&chunk) {
                        ChunkOutcome::Continue => {}
                        ChunkOutcome::Terminal => break ExchangeOutcome::Completed,
                        ChunkOutcome::Cancelled => break ExchangeOutcome::Cancelled,
                    }
                }
                Some(Err(ChatError::Cancelled)) => break ExchangeOutcome::Cancelled,
                Some(Err(e)) => break ExchangeOutcome::Failed(e),
                None => {
                    debug!(
                        "Exchange #{}: end of data without [DONE], completing",
                        self.id
                    );
                    match processor.finish() {
                        ChunkOutcome::Cancelled => break ExchangeOutcome::Cancelled,
                        _ => break ExchangeOutcome::Completed,
                    }
                }
            }
        };

        info!(
            "Exchange #{} stream closed after {:?}: {} fragments, {} dropped frames, {} bytes",
            self.id,
            self.started.elapsed(),
            processor.fragment_count(),
            processor.dropped_frames(),
            processor.bytes_received()
        );
        outcome
    }

    fn finish(&mut self, outcome: ExchangeOutcome) {
        match outcome {
            ExchangeOutcome::Completed => {
                self.transition(ExchangeState::Completed);
            }
            ExchangeOutcome::Cancelled => {
                self.transition(ExchangeState::Cancelled);
                info!(
                    "Exchange #{} cancelled after {:?}",
                    self.id,
                    self.started.elapsed()
                );
            }
            ExchangeOutcome::Failed(err) => {
                self.transition(ExchangeState::Failed);
                warn!("Exchange #{} failed: {}", self.id, err);
                let _ = self.tx.send(StreamSignal::Error {
                    kind: err.kind().unwrap_or(ErrorKind::Transport),
                    message: err.signal_message(),
                });
            }
        }
        let _ = self.tx.send(StreamSignal::Done);
    }

    fn transition(&mut self, next: ExchangeState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid exchange transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("Exchange #{}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }
}

/// Read an error body, giving up if the exchange is cancelled meanwhile
async fn read_body(response: TransportResponse, cancel: &CancellationController) -> Option<String> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        body = response.text() => Some(body.unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        use ExchangeState::*;
        assert!(Idle.can_transition_to(Sending));
        assert!(Sending.can_transition_to(Streaming));
        assert!(Sending.can_transition_to(Failed));
        assert!(Streaming.can_transition_to(Completed));
        assert!(Streaming.can_transition_to(Cancelled));
    }

    #[test]
    fn test_terminal_states_are_final() {
        use ExchangeState::*;
        for terminal in [Completed, Cancelled, Failed] {
            assert!(terminal.is_terminal());
            for next in [Idle, Sending, Streaming, Completed, Cancelled, Failed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
        assert!(!Idle.can_transition_to(Streaming));
        assert!(!Streaming.can_transition_to(Sending));
    }
}
