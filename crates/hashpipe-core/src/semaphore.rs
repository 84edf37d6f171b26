//! Counting semaphore bounding in-flight items per stage.
//!
//! A stage reader takes one permit per item before handing it to the worker
//! pool and the worker releases it when done, so a saturated pool pushes back
//! on the upstream stream instead of queueing without limit.

use std::sync::{Condvar, Mutex, MutexGuard};

/// A counting semaphore that limits concurrent access to a shared resource.
#[derive(Debug)]
pub struct Semaphore {
    state: Mutex<usize>,
    cond: Condvar,
}

/// RAII guard that releases one permit on drop.
#[derive(Debug)]
pub struct SemaphoreGuard<'a>(&'a Semaphore);

impl Semaphore {
    /// Create a semaphore with `permits` initial permits.
    pub fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(permits),
            cond: Condvar::new(),
        }
    }

    fn count(&self) -> MutexGuard<'_, usize> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block until a permit is available, then acquire it.
    pub fn acquire(&self) -> SemaphoreGuard<'_> {
        let mut count = self.count();
        while *count == 0 {
            count = self.cond.wait(count).unwrap_or_else(|e| e.into_inner());
        }
        *count -= 1;
        SemaphoreGuard(self)
    }
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        let mut count = self.0.count();
        *count += 1;
        self.0.cond.notify_one();
    }
}
