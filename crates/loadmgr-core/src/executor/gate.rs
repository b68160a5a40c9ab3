use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::controller::{MAX_CONCURRENCY, MIN_CONCURRENCY};

/// Resizable counting gate for one executor run.
///
/// Shrinking never revokes permits already handed out: permits that cannot be taken back right away become `debt`, and the next permits returned to the gate are forgotten until the debt is paid.
/// Invariant: `available + held - debt == limit`, so a new permit is only handed out while fewer than `limit` are held.
pub(crate) struct AdmissionGate {
    permits: Arc<Semaphore>,
    limit: usize,
    debt: usize,
}

impl AdmissionGate {
    pub fn new(limit: usize) -> Self {
        let limit = limit.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY);
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
            debt: 0,
        }
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the limit for future admissions.
    pub fn resize(&mut self, limit: usize) {
        let limit = limit.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY);
        if limit > self.limit {
            let mut grow = limit - self.limit;
            let repaid = grow.min(self.debt);
            self.debt -= repaid;
            grow -= repaid;
            if grow > 0 {
                self.permits.add_permits(grow);
            }
        } else if limit < self.limit {
            let mut shrink = self.limit - limit;
            while shrink > 0 {
                match self.permits.try_acquire() {
                    Ok(permit) => {
                        permit.forget();
                        shrink -= 1;
                    }
                    Err(_) => break,
                }
            }
            self.debt += shrink;
        }
        self.limit = limit;
    }

    /// Wait for a slot. The permit releases the slot when dropped.
    ///
    /// Cancel safe. Returns `None` only if the semaphore was closed, which this gate never does.
    pub async fn acquire(&mut self) -> Option<OwnedSemaphorePermit> {
        loop {
            let permit = Arc::clone(&self.permits).acquire_owned().await.ok()?;
            if self.debt > 0 {
                permit.forget();
                self.debt -= 1;
                continue;
            }
            return Some(permit);
        }
    }
}
