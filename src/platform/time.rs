//! Monotonic time sources
//!
//! Everything in the sim reads time through [`Clock`] so tests can drive
//! expiration and move deadlines with a [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Longest single nap in [`suspend_until`], so a clock moved by another
/// thread is noticed promptly
const MAX_NAP: Duration = Duration::from_millis(2);

/// A monotonic clock measured from an arbitrary epoch
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's epoch (sub-millisecond resolution)
    fn now(&self) -> Duration;

    /// Millisecond-resolution view of [`Clock::now`]
    fn now_ms(&self) -> u64 {
        self.now().as_millis() as u64
    }
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Simulated clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Jump to an absolute time; never moves backwards
    pub fn set(&self, to: Duration) {
        self.nanos.fetch_max(to.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

/// Suspend the calling thread until `clock` reads at least `deadline`
pub fn suspend_until(clock: &dyn Clock, deadline: Duration) {
    loop {
        let now = clock.now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(MAX_NAP));
    }
}
