#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Overview
//!
//! `pacing` owns the time-related plumbing of the sitewarden client: the
//! [`Clock`] abstraction, caller cancellation via [`CallContext`], and the
//! per-site [`RateGovernor`] that keeps requests to one remote management agent
//! spaced apart.
//!
//! # Design
//!
//! - [`RateGovernor::pace`] holds the governor's slot for the whole duration of
//!   a send. Concurrent callers sharing a governor are therefore executed one
//!   after another, and each send starts no sooner than the configured floor
//!   after the previous one. The state is a single last-send timestamp; there
//!   is no queue.
//! - [`RateGovernor::cool_down`] implements the long pause that follows a
//!   rate-limited response. Retrying is left to the caller, which keeps the
//!   retry budget visible at the call site.
//! - [`pause`] is the only place that blocks. It honours the caller's
//!   [`CallContext`] by sleeping in short slices when a [`CancelToken`] is
//!   attached and by stopping at the context deadline.
//!
//! # Invariants
//!
//! - Two sends through the same governor never start closer together than
//!   [`RateGovernor::min_interval`].
//! - Governors never share state; one governor corresponds to one remote site.
//!
//! # Examples
//!
//! ```
//! use pacing::{CallContext, RateGovernor, SystemClock};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let governor = RateGovernor::new(Arc::new(SystemClock), Duration::ZERO, Duration::ZERO);
//! let (value, wait) = governor.pace(&CallContext::none(), || 7).unwrap();
//! assert_eq!(value, 7);
//! assert!(wait.is_noop());
//! ```

mod cancel;
mod clock;
mod governor;

pub use crate::cancel::{CallContext, CancelToken, Interrupted, pause};
#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub use crate::clock::ManualClock;
pub use crate::clock::{Clock, SystemClock};
pub use crate::governor::{
    DEFAULT_MIN_INTERVAL, DEFAULT_RATE_LIMIT_COOLDOWN, GovernorWait, RateGovernor,
};
