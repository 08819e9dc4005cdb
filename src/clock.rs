//! Time source for settle delays and readiness waits.
//!
//! Every wait in the scan loop goes through a [`Clock`] so the loop can run
//! against a [`ManualClock`] in tests without sleeping.

use std::cell::Cell;
use std::time::{Duration, Instant};

pub trait Clock {
    /// Monotonic time elapsed since the clock was created
    fn elapsed(&self) -> Duration;

    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::thread::sleep`
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Virtual clock: `sleep` advances time instantly
#[derive(Default)]
pub struct ManualClock {
    now: Cell<Duration>,
    sleeps: Cell<usize>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }

    /// Number of `sleep` calls so far
    pub fn sleep_count(&self) -> usize {
        self.sleeps.get()
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        self.advance(duration);
    }
}

/// Poll `condition` every `interval` until it holds or `timeout` passes.
///
/// The condition is always checked at least once. Returns whether it held.
pub fn poll_until<C, F>(clock: &C, timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    C: Clock + ?Sized,
    F: FnMut() -> bool,
{
    let start = clock.elapsed();

    loop {
        if condition() {
            return true;
        }

        if clock.elapsed().saturating_sub(start) >= timeout {
            return false;
        }

        // A zero interval would spin forever on a manual clock
        clock.sleep(interval.max(Duration::from_millis(1)));
    }
}
