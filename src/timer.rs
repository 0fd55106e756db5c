//! One-shot timer capability.
//!
//! The engine consumes timers through the [`TimerService`] trait so tests
//! can substitute a manually driven clock. [`TokioTimers`] is the default
//! implementation, backed by `tokio::time::sleep` tasks.
//!
//! Cancellation is race-free with expiry: the firing task and `cancel`
//! both race for a single removal from the pending-timer map, and only
//! the winner proceeds. A timer therefore fires at most once, and a
//! cancelled timer whose sleep has not yet completed never fires.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Opaque handle to a scheduled one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw timer id, for logging.
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Callback invoked when a timer expires, receiving its own handle.
pub type TimerCallback = Box<dyn FnOnce(TimerHandle) + Send>;

/// Schedules one-shot callbacks and cancels them by handle.
pub trait TimerService: Send + Sync {
    /// Schedule `callback` to run once after `after`.
    fn schedule(&self, after: Duration, callback: TimerCallback) -> TimerHandle;

    /// Cancel a pending timer. A no-op for handles that already fired or
    /// were never issued.
    fn cancel(&self, handle: TimerHandle);
}

/// Default [`TimerService`] backed by spawned `tokio::time::sleep` tasks.
///
/// Requires a running tokio runtime. Dropping the service aborts every
/// still-pending timer.
pub struct TokioTimers {
    next_id: AtomicU64,
    pending: Arc<Mutex<HashMap<u64, JoinHandle<()>>>>,
}

impl TokioTimers {
    /// Create an empty timer service.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of timers scheduled but not yet fired or cancelled.
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }
}

impl Default for TokioTimers {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerService for TokioTimers {
    fn schedule(&self, after: Duration, callback: TimerCallback) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = TimerHandle(id);
        let pending = Arc::clone(&self.pending);

        // Hold the map lock across spawn + insert so the task cannot reach
        // its own removal before the entry exists.
        let mut map = lock(&self.pending);
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // Removal is the commit point: losing the race to cancel()
            // means this timer must not fire.
            let armed = lock(&pending).remove(&id).is_some();
            if armed {
                callback(handle);
            }
        });
        map.insert(id, task);
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(task) = lock(&self.pending).remove(&handle.0) {
            task.abort();
        }
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        for (_, task) in lock(&self.pending).drain() {
            task.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
