use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::clock::Clock;

/// Granularity at which [`pause`] re-checks a [`CancelToken`].
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Shared flag used by callers to abandon in-flight work.
///
/// Cloning a token yields a handle to the same flag, so a supervisor thread can
/// keep one clone and hand another to the client.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the "not cancelled" state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Reports whether [`CancelToken::cancel`] has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Reason a blocking step stopped before completing.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum Interrupted {
    /// The caller's [`CancelToken`] fired.
    #[error("operation cancelled by caller")]
    Cancelled,
    /// The caller's deadline passed.
    #[error("caller deadline exceeded")]
    DeadlineExceeded,
}

/// Deadline and cancellation settings threaded through one logical call.
///
/// The default context has neither, which reproduces the behaviour of a caller
/// that simply waits for the call to resolve.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl CallContext {
    /// Returns a context without deadline or cancellation.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            deadline: None,
            cancel: None,
        }
    }

    /// Sets an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline `timeout` after the clock's current instant.
    #[must_use]
    pub fn with_timeout(self, clock: &dyn Clock, timeout: Duration) -> Self {
        let deadline = clock.now() + timeout;
        self.with_deadline(deadline)
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the configured deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the attached cancellation token, if any.
    #[must_use]
    pub const fn cancel_token(&self) -> Option<&CancelToken> {
        self.cancel.as_ref()
    }

    /// Reports whether the attached token has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Returns the time left before the deadline, or `None` without a deadline.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Fails when the call has been cancelled or its deadline has passed.
    ///
    /// Cancellation is reported ahead of an expired deadline.
    pub fn check(&self, now: Instant) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        match self.remaining(now) {
            Some(left) if left.is_zero() => Err(Interrupted::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Shortens `timeout` so it does not run past the deadline.
    #[must_use]
    pub fn clamp(&self, now: Instant, timeout: Duration) -> Duration {
        match self.remaining(now) {
            Some(left) => timeout.min(left),
            None => timeout,
        }
    }
}

/// Sleeps for `duration` while honouring the caller's context.
///
/// Without a cancellation token the pause is a single call to
/// [`Clock::sleep`]. With a token the pause is split into short slices and the
/// token is checked between them. If the deadline falls inside the pause, the
/// function sleeps until the deadline and reports
/// [`Interrupted::DeadlineExceeded`].
pub fn pause(clock: &dyn Clock, duration: Duration, ctx: &CallContext) -> Result<(), Interrupted> {
    ctx.check(clock.now())?;
    if duration.is_zero() {
        return Ok(());
    }

    let (budget, hits_deadline) = match ctx.remaining(clock.now()) {
        Some(left) if left < duration => (left, true),
        _ => (duration, false),
    };

    if ctx.cancel_token().is_none() {
        clock.sleep(budget);
    } else {
        let mut remaining = budget;
        while !remaining.is_zero() {
            if ctx.is_cancelled() {
                return Err(Interrupted::Cancelled);
            }
            let slice = remaining.min(CANCEL_POLL_INTERVAL);
            clock.sleep(slice);
            remaining = remaining.saturating_sub(slice);
        }
        if ctx.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
    }

    if hits_deadline {
        Err(Interrupted::DeadlineExceeded)
    } else {
        Ok(())
    }
}
