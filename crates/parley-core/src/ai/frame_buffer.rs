//! Line accumulator for SSE bodies
//!
//! Raw chunks arrive at arbitrary byte offsets. Complete lines are handed
//! out in arrival order; the trailing partial line stays for the next chunk.

use bytes::{Buf, BytesMut};

/// Holds at most one unterminated line between calls to `extract_lines`
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: BytesMut,
    /// Bytes before this offset are known to contain no newline
    scanned: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw chunk as delivered by the transport
    pub fn append(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Drain every complete line, trimmed of line-ending whitespace.
    ///
    /// Decoding happens per line so a multi-byte character split across
    /// chunks is reassembled before it is interpreted.
    pub fn extract_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(pos) = self.pending[self.scanned..]
            .iter()
            .position(|&b| b == b'\n')
        {
            let end = self.scanned + pos;
            let line = String::from_utf8_lossy(&self.pending[..end])
                .trim_end()
                .to_string();
            self.pending.advance(end + 1);
            self.scanned = 0;
            lines.push(line);
        }
        self.scanned = self.pending.len();
        lines
    }

    /// Take the unterminated remainder once the transport reports end-of-data
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        if self.pending.is_empty() {
            return None;
        }
        let rest = self.pending.split();
        let line = String::from_utf8_lossy(&rest).trim_end().to_string();
        if line.is_empty() {
            None
        } else {
            Some(line)
        }
    }

    /// Bytes held for the partial line
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
