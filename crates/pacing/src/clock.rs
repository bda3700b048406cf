use std::fmt;
use std::time::{Duration, Instant};

#[cfg(any(test, feature = "test-support"))]
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Maximum duration handed to [`std::thread::sleep`] in one call.
const MAX_SLEEP_CHUNK: Duration = Duration::from_secs(u32::MAX as u64);

/// Source of monotonic time and blocking sleeps.
///
/// Every delay in the client goes through a `Clock` so tests can substitute a
/// clock that records the requested pauses instead of waiting for them.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> Instant;

    /// Blocks the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by [`Instant::now`] and [`std::thread::sleep`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        let mut remaining = duration;
        while !remaining.is_zero() {
            let chunk = remaining.min(MAX_SLEEP_CHUNK);
            std::thread::sleep(chunk);
            remaining = remaining.saturating_sub(chunk);
        }
    }
}

/// Deterministic clock that advances only when told to.
///
/// Sleeps are recorded and advance the clock instantly, which makes pacing,
/// cooldown and verification delays observable in tests without waiting.
/// The clock is usually shared through an `Arc` between the code under test
/// and the fake transport, which can call [`ManualClock::advance`] to simulate
/// request latency.
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
struct ManualState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

#[cfg(any(test, feature = "test-support"))]
impl ManualClock {
    /// Creates a clock anchored at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the clock forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.lock();
        state.elapsed = state.elapsed.saturating_add(duration);
    }

    /// Returns how far the clock has moved since it was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    /// Returns the instant `offset` after the clock's origin.
    #[must_use]
    pub fn at(&self, offset: Duration) -> Instant {
        self.origin + offset
    }

    /// Returns a copy of every sleep requested so far, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    /// Drains and returns the recorded sleeps.
    pub fn take_sleeps(&self) -> Vec<Duration> {
        std::mem::take(&mut self.lock().sleeps)
    }

    /// Returns the sum of all recorded sleeps.
    #[must_use]
    pub fn total_slept(&self) -> Duration {
        self.lock()
            .sleeps
            .iter()
            .fold(Duration::ZERO, |acc, chunk| acc.saturating_add(*chunk))
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.lock().elapsed
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.sleeps.push(duration);
        state.elapsed = state.elapsed.saturating_add(duration);
    }
}
