//! SSE (Server-Sent Events) stream processing
//!
//! Turns raw body chunks from a chat-completions endpoint into ordered
//! content signals.

use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::cancellation::CancellationController;
use super::format::openai::ContentExtractor;
use super::frame_buffer::FrameBuffer;
use super::streaming::StreamSignal;

/// Payload that marks the end of the stream
pub const DONE_SENTINEL: &str = "[DONE]";

const DATA_PREFIX: &str = "data:";

/// A complete line, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// Frame separator
    Blank,
    /// Provider keep-alive or comment
    Comment,
    Data(&'a str),
    Terminal,
    /// `event:`, `id:`, `retry:` or anything else; ignored
    Unrecognized,
}

impl<'a> SseLine<'a> {
    pub fn classify(line: &'a str) -> Self {
        if line.is_empty() {
            return SseLine::Blank;
        }
        if line.starts_with(':') {
            return SseLine::Comment;
        }
        match line.strip_prefix(DATA_PREFIX) {
            Some(rest) => {
                let payload = rest.strip_prefix(' ').unwrap_or(rest);
                if payload.trim() == DONE_SENTINEL {
                    SseLine::Terminal
                } else {
                    SseLine::Data(payload)
                }
            }
            None => SseLine::Unrecognized,
        }
    }
}

/// How processing of a chunk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Ready for more data
    Continue,
    /// `[DONE]` seen; remaining buffered lines were not processed
    Terminal,
    /// Cancellation observed at a checkpoint
    Cancelled,
}

/// SSE stream processor that handles partial lines and buffering
///
/// Owned by exactly one exchange.
pub struct SseStreamProcessor {
    buffer: FrameBuffer,
    extractor: ContentExtractor,
    /// Channel to send content signals
    tx: mpsc::UnboundedSender<StreamSignal>,
    cancel: CancellationController,
    /// When the stream started
    stream_start: Instant,
    /// Data frames seen, for logging
    event_count: usize,
    fragment_count: usize,
    dropped_frames: usize,
    bytes_received: usize,
}

impl SseStreamProcessor {
    pub fn new(tx: mpsc::UnboundedSender<StreamSignal>, cancel: CancellationController) -> Self {
        debug!("SSE stream processor created");
        Self {
            buffer: FrameBuffer::new(),
            extractor: ContentExtractor,
            tx,
            cancel,
            stream_start: Instant::now(),
            event_count: 0,
            fragment_count: 0,
            dropped_frames: 0,
            bytes_received: 0,
        }
    }

    /// Process a chunk of bytes from the SSE stream
    pub fn process_chunk(&mut self, bytes: &[u8]) -> ChunkOutcome {
        self.bytes_received += bytes.len();
        debug!(
            "SSE chunk received: {} bytes (total: {} bytes)",
            bytes.len(),
            self.bytes_received
        );

        self.buffer.append(bytes);
        for line in self.buffer.extract_lines() {
            let outcome = self.process_line(&line);
            if outcome != ChunkOutcome::Continue {
                return outcome;
            }
        }
        ChunkOutcome::Continue
    }

    /// Process whatever is left once the transport reports end-of-data
    pub fn finish(&mut self) -> ChunkOutcome {
        match self.buffer.finish() {
            Some(line) => {
                debug!("SSE processing unterminated final line");
                self.process_line(&line)
            }
            None => ChunkOutcome::Continue,
        }
    }

    fn process_line(&mut self, line: &str) -> ChunkOutcome {
        if self.cancel.is_cancelled() {
            return ChunkOutcome::Cancelled;
        }

        match SseLine::classify(line) {
            SseLine::Blank | SseLine::Comment | SseLine::Unrecognized => ChunkOutcome::Continue,
            SseLine::Terminal => {
                info!(
                    "SSE stream [DONE] marker received after {:?}, {} events, {} bytes",
                    self.stream_start.elapsed(),
                    self.event_count,
                    self.bytes_received
                );
                ChunkOutcome::Terminal
            }
            SseLine::Data(payload) => self.process_data(payload),
        }
    }

    fn process_data(&mut self, payload: &str) -> ChunkOutcome {
        self.event_count += 1;

        let delta = match self.extractor.decode(payload) {
            Ok(delta) => delta,
            Err(e) => {
                self.dropped_frames += 1;
                warn!(
                    "Dropping undecodable SSE frame (event #{}): {}",
                    self.event_count, e
                );
                return ChunkOutcome::Continue;
            }
        };

        if let Some(message) = &delta.error {
            warn!(
                "Provider reported an error mid-stream (event #{}): {}",
                self.event_count, message
            );
        }

        if let Some(reason) = &delta.finish_reason {
            info!(
                "SSE finish_reason={} at {:?}",
                reason,
                self.stream_start.elapsed()
            );
        }

        let Some(text) = delta.content else {
            return ChunkOutcome::Continue;
        };

        if self.cancel.is_cancelled() {
            return ChunkOutcome::Cancelled;
        }

        debug!("  -> Content: {} chars", text.len());
        if self.tx.send(StreamSignal::Content { text }).is_err() {
            debug!("SSE consumer dropped, cancelling exchange");
            self.cancel.request_cancel();
            return ChunkOutcome::Cancelled;
        }
        self.fragment_count += 1;
        ChunkOutcome::Continue
    }

    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    pub fn dropped_frames(&self) -> usize {
        self.dropped_frames
    }

    pub fn bytes_received(&self) -> usize {
        self.bytes_received
    }
}
