//! Process-wide limit on simultaneously active transfers
//!
//! All download jobs, across every group of a run, share one [`TransferLimiter`].
//! A job holds a [`TransferPermit`] for the whole of its transfer; dropping the
//! permit hands the slot to the next waiting job, whether the job succeeded,
//! failed, panicked or was cancelled mid-await.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};

/// Counting gate shared by every transfer of a run (cheap to clone)
#[derive(Clone, Debug)]
pub struct TransferLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Slot held by one active transfer; released on drop
#[derive(Debug)]
pub struct TransferPermit {
    _permit: OwnedSemaphorePermit,
}

impl TransferLimiter {
    /// Create a limiter admitting `capacity` concurrent transfers
    ///
    /// A capacity of zero would deadlock every job, so it is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot
    pub async fn acquire(&self) -> Result<TransferPermit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Cancelled)?;
        Ok(TransferPermit { _permit: permit })
    }

    /// Configured number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Stop admitting transfers; pending and future `acquire` calls fail
    pub fn close(&self) {
        self.semaphore.close();
    }
}
