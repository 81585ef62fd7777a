//! AI streaming client
//!
//! Request building, SSE framing, content extraction and the exchange driver.

pub mod cancellation;
pub mod client;
pub mod error;
pub mod format;
pub mod frame_buffer;
pub mod request;
pub mod sse;
pub mod streaming;
pub mod transport;
pub mod types;
