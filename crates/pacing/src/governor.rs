use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::cancel::{CallContext, Interrupted, pause};
use crate::clock::Clock;

/// Minimum spacing between two sends to the same site.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(3);

/// Pause applied after the remote reports that the caller is rate limited.
///
/// Chosen to outlast a one-minute limiting window on the remote side.
pub const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(65);

/// Describes the wait [`RateGovernor::pace`] imposed before a send.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[must_use]
pub struct GovernorWait {
    waited: Duration,
    since_previous: Option<Duration>,
}

impl GovernorWait {
    /// Constructs a record from the imposed wait and the gap since the previous send.
    pub const fn new(waited: Duration, since_previous: Option<Duration>) -> Self {
        Self {
            waited,
            since_previous,
        }
    }

    /// Returns how long the governor paused before letting the send through.
    #[must_use]
    pub const fn waited(&self) -> Duration {
        self.waited
    }

    /// Returns the time that had elapsed since the previous send, if there was one.
    #[must_use]
    pub const fn since_previous(&self) -> Option<Duration> {
        self.since_previous
    }

    /// Returns `true` when the send went out without any pause.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.waited.is_zero()
    }
}

/// Serialises and spaces the requests issued to one remote site.
///
/// The governor keeps only the instant of the last send. [`RateGovernor::pace`]
/// takes the governor's lock, waits out whatever is left of the minimum
/// interval, stamps the send time and runs the send while still holding the
/// lock, so at most one request is in flight per governor.
#[derive(Debug)]
pub struct RateGovernor {
    clock: Arc<dyn Clock>,
    min_interval: Duration,
    cooldown: Duration,
    last_send: Mutex<Option<Instant>>,
}

impl RateGovernor {
    /// Creates a governor with explicit spacing and cooldown.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, min_interval: Duration, cooldown: Duration) -> Self {
        Self {
            clock,
            min_interval,
            cooldown,
            last_send: Mutex::new(None),
        }
    }

    /// Creates a governor using [`DEFAULT_MIN_INTERVAL`] and [`DEFAULT_RATE_LIMIT_COOLDOWN`].
    #[must_use]
    pub fn with_defaults(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, DEFAULT_MIN_INTERVAL, DEFAULT_RATE_LIMIT_COOLDOWN)
    }

    /// Returns the minimum spacing between sends.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Returns the pause applied by [`RateGovernor::cool_down`].
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Returns the clock driving this governor.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Returns the instant of the most recent send, if any.
    #[must_use]
    pub fn last_send(&self) -> Option<Instant> {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Instant>> {
        self.last_send.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `send` once the minimum interval since the previous send has elapsed.
    ///
    /// The slot stays locked while `send` runs. When the caller's context is
    /// cancelled or its deadline expires while waiting, `send` is not invoked
    /// and the last-send timestamp is left untouched.
    pub fn pace<R>(
        &self,
        ctx: &CallContext,
        send: impl FnOnce() -> R,
    ) -> Result<(R, GovernorWait), Interrupted> {
        let mut last_send = self.lock();
        let now = self.clock.now();
        let since_previous = last_send.map(|previous| now.saturating_duration_since(previous));
        let waited = since_previous
            .map_or(Duration::ZERO, |gap| self.min_interval.saturating_sub(gap));

        if waited.is_zero() {
            ctx.check(now)?;
        } else {
            logging::trace_pacing!(
                wait_ms = waited.as_millis() as u64,
                "holding request to honour minimum interval"
            );
            pause(self.clock.as_ref(), waited, ctx)?;
        }

        *last_send = Some(self.clock.now());
        let result = send();
        Ok((result, GovernorWait::new(waited, since_previous)))
    }

    /// Blocks for the rate-limit cooldown.
    ///
    /// The slot is held during the cooldown so no other request to the same
    /// site slips out while the remote is still limiting the caller.
    pub fn cool_down(&self, ctx: &CallContext) -> Result<(), Interrupted> {
        let _slot = self.lock();
        tracing::warn!(
            target: "sitewarden::pacing",
            cooldown_secs = self.cooldown.as_secs(),
            "remote rate limit hit; cooling down before retrying"
        );
        pause(self.clock.as_ref(), self.cooldown, ctx)
    }
}
