//! Process-wide send rate limiting.
//!
//! Two sliding windows (hourly, daily) behind one mutex. The check and the
//! increment happen inside the same critical section, so concurrent callers
//! can never both observe "space available" and overrun the limit. This is
//! the only cross-run mutable state in the crate.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use thiserror::Error;

const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Which window rejected the send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitScope {
    Hourly,
    Daily,
}

impl RateLimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitScope::Hourly => "hourly",
            RateLimitScope::Daily => "daily",
        }
    }
}

/// A sliding window is exhausted
#[derive(Debug, Clone, Error)]
#[error("{} limit reached: {count}/{limit} sends", .scope.as_str())]
pub struct LimitExceeded {
    pub scope: RateLimitScope,
    pub count: u32,
    pub limit: u32,
}

/// One counting window
#[derive(Debug)]
struct Window {
    count: u32,
    started: Instant,
    limit: u32,
    duration: Duration,
}

impl Window {
    fn new(limit: u32, duration: Duration) -> Self {
        Self {
            count: 0,
            started: Instant::now(),
            limit,
            duration,
        }
    }

    /// Lazily reset when the window has elapsed. No timer involved:
    /// reset happens on the next access.
    fn roll(&mut self, now: Instant) {
        if now.duration_since(self.started) > self.duration {
            self.count = 0;
            self.started = now;
        }
    }

    fn exhausted(&self) -> bool {
        self.count >= self.limit
    }

    fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.count)
    }
}

/// Snapshot of current limiter state
#[derive(Debug, Clone, Copy)]
pub struct RateLimitStats {
    pub sent_this_hour: u32,
    pub sent_today: u32,
    pub hourly_limit: u32,
    pub daily_limit: u32,
    pub hourly_remaining: u32,
    pub daily_remaining: u32,
}

/// Process-wide sliding-window rate limiter.
///
/// Callers receive a shared reference (typically `Arc`), never an ambient
/// global.
#[derive(Debug)]
pub struct RateLimiter {
    windows: Mutex<(Window, Window)>,
}

impl RateLimiter {
    /// Create a limiter with hourly and daily send limits
    pub fn new(hourly_limit: u32, daily_limit: u32) -> Self {
        Self::with_windows(hourly_limit, HOUR, daily_limit, DAY)
    }

    /// Create a limiter with explicit window durations (used by tests)
    pub fn with_windows(
        hourly_limit: u32,
        hourly_window: Duration,
        daily_limit: u32,
        daily_window: Duration,
    ) -> Self {
        Self {
            windows: Mutex::new((
                Window::new(hourly_limit, hourly_window),
                Window::new(daily_limit, daily_window),
            )),
        }
    }

    /// Atomic check-and-increment.
    ///
    /// Succeeds and records one send, or rejects without recording anything.
    /// A recorded send is never rolled back, even if the transport later
    /// fails or the run is cancelled.
    pub fn try_acquire(&self) -> Result<(), LimitExceeded> {
        let mut guard = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let (hourly, daily) = &mut *guard;

        let now = Instant::now();
        hourly.roll(now);
        daily.roll(now);

        if hourly.exhausted() {
            return Err(LimitExceeded {
                scope: RateLimitScope::Hourly,
                count: hourly.count,
                limit: hourly.limit,
            });
        }
        if daily.exhausted() {
            return Err(LimitExceeded {
                scope: RateLimitScope::Daily,
                count: daily.count,
                limit: daily.limit,
            });
        }

        hourly.count += 1;
        daily.count += 1;
        Ok(())
    }

    /// Current window counts and remaining capacity
    pub fn stats(&self) -> RateLimitStats {
        let mut guard = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let (hourly, daily) = &mut *guard;

        let now = Instant::now();
        hourly.roll(now);
        daily.roll(now);

        RateLimitStats {
            sent_this_hour: hourly.count,
            sent_today: daily.count,
            hourly_limit: hourly.limit,
            daily_limit: daily.limit,
            hourly_remaining: hourly.remaining(),
            daily_remaining: daily.remaining(),
        }
    }
}
