#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Overview
//!
//! `client` talks to the management agent installed on a remote site. It
//! reads inventory (status, health, pending updates, plugins, themes, users
//! and comments) and performs mutations (software updates, plugin activation
//! and installation, maintenance mode, comment cleanup) while coping with
//! slow, rate-limited and only partially compatible remotes.
//!
//! # Design
//!
//! Every logical call flows through the same layers:
//!
//! 1. [`SiteClient`] turns a method call into a [`wire::OperationRequest`].
//! 2. The negotiator tries the current agent namespace first and retries once
//!    on the legacy namespace when the route is missing.
//! 3. The dispatcher paces each attempt through the site's
//!    [`pacing::RateGovernor`] and retries exactly once after a rate-limit
//!    cooldown.
//! 4. The transport builds headers and the URL and hands the request to an
//!    [`HttpBackend`], normally [`ReqwestBackend`].
//!
//! Mutations wrap this pipeline with a baseline observation and, when the
//! request times out, a delayed re-check that decides between a verified
//! success and an [`MutationOutcome::Uncertain`] result.
//!
//! # Invariants
//!
//! - A client handle never sends two requests to its site closer together
//!   than the configured minimum interval, whatever the number of clones.
//! - A timeout on a mutation is never reported as a plain failure.
//! - Constructing a client performs no network activity.
//!
//! # Examples
//!
//! ```no_run
//! use client::{SiteClient, UpdateGroup};
//!
//! let site = SiteClient::new("https://blog.example.com/", "secret")?;
//! let updates = site.get_updates()?;
//! println!("{} pending updates", updates.counts.total);
//!
//! let report = site.perform_updates(&[UpdateGroup::plugins(["akismet"])]);
//! assert_eq!(report.entries().len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod batch;
mod client;
mod config;
mod dispatch;
mod error;
mod inventory;
mod mutation;
mod negotiate;
#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod testing;
mod transport;

pub use crate::batch::{BatchEntry, BatchMode, BatchReport, UpdateGroup};
pub use crate::client::{CredentialCheck, SiteClient};
pub use crate::config::{
    ClientConfig, ClientConfigBuilder, ConfigError, DEFAULT_BULK_TIMEOUT,
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, DEFAULT_UPDATE_TIMEOUT, DEFAULT_VERIFY_DELAY,
    ENV_BULK_TIMEOUT_SECS, ENV_MIN_INTERVAL_MS, ENV_RATE_LIMIT_COOLDOWN_SECS, ENV_TIMEOUT_SECS,
    ENV_UPDATE_TIMEOUT_SECS, ENV_USER_AGENT, ENV_VERIFY_DELAY_SECS, SiteCredential,
};
pub use crate::error::{ClientError, ErrorKind};
pub use crate::inventory::{
    Comment, CommentBucket, CommentCounts, CommentFilter, CommentStatus, CommentSummary,
    HealthIssue, HealthRating, InstalledPlugin, InstalledTheme, IssueSeverity,
    ParseCommentStatusError, ParseUpdateKindError, PendingUpdate, PendingUpdates, SiteHealth,
    SiteStatus, SiteUser, UpdateCounts, UpdateKind,
};
pub use crate::mutation::{
    MutationOutcome, MutationSuccess, UncertainMutation, UpdateItem, VerificationResult,
};
pub use crate::transport::{HttpBackend, HttpRequest, ReqwestBackend};
pub use pacing::{CallContext, CancelToken, DEFAULT_MIN_INTERVAL, DEFAULT_RATE_LIMIT_COOLDOWN};
pub use wire::{FailureKind, Method, Namespace, NamespaceLayout, Operation, RawResponse, SendFailure};
