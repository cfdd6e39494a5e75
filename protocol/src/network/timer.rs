//! # Round Timeout Service
//!
//! Replaces ad-hoc deferred callbacks with a single-slot, cancelable timer
//! (Design Note, §9). At most one `(number, round)` pair is armed at a
//! time; a newer pair supersedes an older one, and a strictly-older pair is
//! rejected outright. The firing handler re-checks liveness against a
//! generation counter so a timer that was superseded between being armed
//! and firing quietly does nothing (§7, Transient errors).

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Slot {
    number: u64,
    round: u64,
    generation: u64,
}

/// A single-slot, cancelable, monotonic timer keyed by `(number, round)`.
#[derive(Clone)]
pub struct TimerService {
    armed: Arc<Mutex<Option<Slot>>>,
    generation: Arc<AtomicU64>,
}

impl TimerService {
    pub fn new() -> Self {
        Self {
            armed: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Arms a timer for `(number, round)` firing `handler` after `duration`,
    /// unless the currently-armed slot is already at or past that pair.
    /// Returns whether the timer was actually armed.
    pub fn arm<F, Fut>(&self, number: u64, round: u64, duration: Duration, handler: F) -> bool
    where
        F: FnOnce(u64, u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut armed = self.armed.lock();
        if let Some(current) = *armed {
            if (number, round) < (current.number, current.round) {
                return false;
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let slot = Slot { number, round, generation };
        *armed = Some(slot);
        drop(armed);

        let armed_cell = Arc::clone(&self.armed);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let still_live = matches!(*armed_cell.lock(), Some(s) if s == slot);
            if still_live {
                handler(number, round).await;
            }
        });

        true
    }

    /// Cancels the currently-armed timer, if any. Any in-flight sleep still
    /// fires but finds itself stale and no-ops.
    pub fn cancel(&self) {
        *self.armed.lock() = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed.lock().is_some()
    }
}

impl Default for TimerService {
    fn default() -> Self {
        Self::new()
    }
}
