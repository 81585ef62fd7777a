//! Chat client
//!
//! `ChatClient` is the public entry point. Each call to `send_message`
//! spawns one `StreamDriver` that owns its exchange state end to end.

mod core;
mod driver;
mod slot;

pub use self::core::ChatClient;
pub use driver::ExchangeState;
