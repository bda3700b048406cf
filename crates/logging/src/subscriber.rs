//! crates/logging/src/subscriber.rs
//! Installation of the process-wide `tracing` subscriber.
//!
//! Library crates only emit events. Binaries call [`init_tracing`] once at
//! startup to route those events to standard error, filtered by the selected
//! [`Verbosity`] unless [`LOG_ENV_VAR`] supplies an explicit filter.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::verbosity::Verbosity;

/// Environment variable holding an `EnvFilter` directive that overrides `-v`.
pub const LOG_ENV_VAR: &str = "SITEWARDEN_LOG";

/// Builds the filter for `verbosity`, preferring a valid `override_directive`.
///
/// An override that fails to parse is ignored and the verbosity default is
/// used instead, so a typo in the environment never silences errors.
#[must_use]
pub fn build_filter(verbosity: Verbosity, override_directive: Option<&str>) -> EnvFilter {
    override_directive
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(verbosity.directive()))
}

/// Installs a formatting subscriber writing to standard error.
///
/// Returns `false` when a global subscriber was already installed, which
/// happens when several in-process CLI runs share one test binary.
pub fn init_tracing(verbosity: Verbosity) -> bool {
    let override_directive = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(verbosity, override_directive.as_deref());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= Verbosity::Debug),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn default_filter_follows_verbosity() {
        let filter = build_filter(Verbosity::Debug, None);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let filter = build_filter(Verbosity::Normal, None);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn valid_override_wins() {
        let filter = build_filter(Verbosity::Normal, Some("sitewarden::batch=trace"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn blank_or_invalid_override_is_ignored() {
        let filter = build_filter(Verbosity::Quiet, Some("   "));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::ERROR));

        let filter = build_filter(Verbosity::Quiet, Some("sitewarden=[[["));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::ERROR));
    }
}
