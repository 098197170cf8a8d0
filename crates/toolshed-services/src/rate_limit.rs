//! Fixed-window admission control.
//!
//! Each window admits up to `limit` job starts. The counter resets once
//! `now - window_start >= window`. A denied caller is told how many whole
//! seconds remain (rounded up, never zero).
//!
//! The window lives behind a `std::sync::Mutex`; the lock is never held
//! across an await point. Time comes from `tokio::time::Instant` so
//! paused-clock tests can drive it.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied { retry_after: Duration },
}

#[derive(Debug)]
struct RateWindow {
    window_start: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct FixedWindowLimiter {
    state: Mutex<RateWindow>,
    limit: u32,
    window: Duration,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            state: Mutex::new(RateWindow {
                window_start: Instant::now(),
                count: 0,
            }),
            limit,
            window,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RateWindow> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consume one unit of budget if the current window has room.
    pub fn try_acquire(&self) -> Admission {
        let mut state = self.lock();
        let now = Instant::now();

        let elapsed = now.duration_since(state.window_start);
        if elapsed >= self.window {
            state.count = 0;
            state.window_start = now;
        }

        if state.count < self.limit {
            state.count += 1;
            return Admission::Allowed;
        }

        let remaining = self
            .window
            .saturating_sub(now.duration_since(state.window_start));
        Admission::Denied {
            retry_after: ceil_secs(remaining),
        }
    }

    /// `(count, limit)` of the current window, for status reporting.
    pub fn snapshot(&self) -> (u32, u32) {
        let state = self.lock();
        let count = if state.window_start.elapsed() >= self.window {
            0
        } else {
            state.count
        };
        (count, self.limit)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

/// Round up to whole seconds, at least one.
fn ceil_secs(d: Duration) -> Duration {
    let mut secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs += 1;
    }
    Duration::from_secs(secs.max(1))
}
