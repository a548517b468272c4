use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{RemoteError, RemoteResult};

/// Bounds the number of ranged reads in flight across every reader that
/// shares it.
///
/// Cloning yields another handle to the same gate. Independently configured
/// stores each build their own.
#[derive(Clone, Debug)]
pub struct RateLimitGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held slot. Dropping it frees the slot, whatever path the read took.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl RateLimitGate {
    /// A gate admitting `capacity` concurrent reads (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> RemoteResult<GatePermit> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| RemoteError::GateClosed)?;
        Ok(GatePermit { _permit: permit })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Reject every waiting and future `acquire`. Permits already handed out
    /// stay valid.
    pub fn close(&self) {
        self.semaphore.close();
    }
}
