#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` centralises how sitewarden produces diagnostics. Library crates
//! emit `tracing` events through the subsystem macros exported here
//! ([`trace_transport!`], [`trace_pacing!`], [`trace_negotiate!`],
//! [`trace_inventory!`], [`trace_mutation!`], [`trace_verify!`],
//! [`trace_batch!`]). Binaries pick a [`Verbosity`] from the command line and
//! call [`init_tracing`] once.
//!
//! # Invariants
//!
//! - All targets live below `sitewarden::`, so one directive selects every
//!   client subsystem.
//! - Credentials are never passed to these macros; request traces carry the
//!   method, namespace, path, status and elapsed time only.
//!
//! # Examples
//!
//! ```
//! use logging::Verbosity;
//!
//! let verbosity = Verbosity::from_count(2);
//! assert_eq!(verbosity, Verbosity::Debug);
//! assert_eq!(verbosity.directive(), "warn,sitewarden=debug");
//! ```

mod subscriber;
mod tracing_macros;
mod verbosity;

pub use subscriber::{LOG_ENV_VAR, build_filter, init_tracing};
pub use verbosity::{ParseVerbosityError, Verbosity};
