//! Single in-flight exchange bookkeeping

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::ai::cancellation::CancellationController;
use crate::ai::error::ChatError;
use crate::config::ConcurrencyPolicy;

struct ActiveExchange {
    id: u64,
    cancel: CancellationController,
}

/// Tracks the exchange currently allowed to run for one client
///
/// Only the id and the cancel handle live here; buffers and channels stay
/// with the exchange itself.
#[derive(Clone, Default)]
pub(crate) struct ExchangeSlot {
    current: Arc<Mutex<Option<ActiveExchange>>>,
    next_id: Arc<AtomicU64>,
}

impl ExchangeSlot {
    /// Register a new exchange under `policy`, returning its id
    pub fn claim(
        &self,
        policy: ConcurrencyPolicy,
        cancel: CancellationController,
    ) -> Result<u64, ChatError> {
        let mut current = self.current.lock();

        // A cancelled exchange is already terminating and never blocks a new one
        if let Some(active) = current.as_ref().filter(|a| !a.cancel.is_cancelled()) {
            match policy {
                ConcurrencyPolicy::Reject => {
                    debug!("Rejecting new exchange, #{} still in flight", active.id);
                    return Err(ChatError::ExchangeInFlight);
                }
                ConcurrencyPolicy::Supersede => {
                    info!("Superseding in-flight exchange #{}", active.id);
                    active.cancel.request_cancel();
                }
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        *current = Some(ActiveExchange { id, cancel });
        Ok(id)
    }

    /// Clear the slot if it still belongs to exchange `id`
    pub fn release(&self, id: u64) {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|active| active.id == id) {
            *current = None;
        }
    }

    /// Cancel whatever is in flight. Returns whether anything was.
    pub fn cancel_current(&self) -> bool {
        match self.current.lock().take() {
            Some(active) => {
                debug!("Cancelling exchange #{}", active.id);
                active.cancel.request_cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.current.lock().is_some()
    }
}
