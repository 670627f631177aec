//! Bounds simultaneous per-process resolution work.
//!
//! A thin wrapper over `tokio::sync::Semaphore` with owned permits, so a
//! permit can ride into a `spawn_blocking` closure and release on drop. Four
//! permits by default — enough to keep sweeps moving without saturating the
//! accessibility subsystem or starving the foreground.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct ConcurrencyGate {
    sem: Arc<Semaphore>,
}

/// Held for the duration of one gated task; releases its permit on drop.
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    pub fn new(permits: usize) -> Self {
        Self {
            sem: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Wait cooperatively until a permit is available.
    pub async fn acquire(&self) -> GatePermit {
        // The semaphore is never closed, so acquisition cannot fail.
        let permit = self
            .sem
            .clone()
            .acquire_owned()
            .await
            .expect("gate semaphore closed");
        GatePermit { _permit: permit }
    }

    pub fn available(&self) -> usize {
        self.sem.available_permits()
    }
}
