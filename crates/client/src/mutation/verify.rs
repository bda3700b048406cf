//! Observation and comparison behind the timeout verifier.
//!
//! Observations never fail: an inventory read that errors is logged and
//! yields an empty [`Snapshot`], which can never prove a mutation completed.
//! The verifier is advisory, so a failed re-check leads to an uncertain
//! outcome and never to a failure.

use crate::client::SiteClient;
use crate::inventory::{
    CommentBucket, CommentFilter, InstalledPlugin, InstalledTheme, UpdateKind,
};

use super::outcome::VerificationResult;

/// Value observed for one check, plus the version an update advertised.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Snapshot {
    pub(crate) value: Option<String>,
    pub(crate) target: Option<String>,
}

impl Snapshot {
    fn of(value: Option<String>) -> Self {
        Self {
            value,
            target: None,
        }
    }
}

/// What to observe for one mutation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Watch {
    Version(UpdateKind, String),
    PluginActive(String),
    PluginInstalled(String),
    Maintenance,
    CommentTotal,
    Bucket(CommentBucket),
}

/// What the re-check must show for the mutation to count as done.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Expectation {
    /// The version changed or reached the advertised one.
    NewVersion,
    /// The observed state equals the given one.
    State(&'static str),
    /// The observed count went down.
    Decrease,
    /// The observed count is zero.
    Zero,
}

fn log_failure(what: &str, error: &crate::error::ClientError) {
    tracing::warn!(
        target: "sitewarden::verify",
        check = what,
        kind = error.kind().as_str(),
        "inventory read for verification failed"
    );
}

impl Watch {
    pub(crate) fn observe(&self, client: &SiteClient) -> Snapshot {
        match self {
            Self::Version(kind, identifier) => {
                SiteView::capture(client, &[*kind]).snapshot(*kind, identifier)
            }
            Self::PluginActive(identifier) => match client.get_plugins() {
                Ok(plugins) => Snapshot::of(
                    plugins
                        .iter()
                        .find(|plugin| plugin.matches(identifier))
                        .map(|plugin| if plugin.active { "active" } else { "inactive" }.to_owned()),
                ),
                Err(error) => {
                    log_failure("plugin state", &error);
                    Snapshot::default()
                }
            },
            Self::PluginInstalled(identifier) => match client.get_plugins() {
                Ok(plugins) => Snapshot::of(Some(
                    if plugins.iter().any(|plugin| plugin.matches(identifier)) {
                        "installed"
                    } else {
                        "missing"
                    }
                    .to_owned(),
                )),
                Err(error) => {
                    log_failure("plugin presence", &error);
                    Snapshot::default()
                }
            },
            Self::Maintenance => match client.get_status() {
                Ok(status) => Snapshot::of(Some(
                    if status.maintenance_mode { "on" } else { "off" }.to_owned(),
                )),
                Err(error) => {
                    log_failure("maintenance mode", &error);
                    Snapshot::default()
                }
            },
            Self::CommentTotal => match client.get_comments(&CommentFilter::new()) {
                Ok(summary) => Snapshot::of(Some(summary.counts.total.to_string())),
                Err(error) => {
                    log_failure("comment total", &error);
                    Snapshot::default()
                }
            },
            Self::Bucket(bucket) => match client.get_comments(&CommentFilter::new()) {
                Ok(summary) => Snapshot::of(Some(summary.counts.bucket(*bucket).to_string())),
                Err(error) => {
                    log_failure("comment bucket", &error);
                    Snapshot::default()
                }
            },
        }
    }
}

/// Versions of installed software, read once per kind.
#[derive(Clone, Debug, Default)]
pub(crate) struct SiteView {
    plugins: Option<Vec<InstalledPlugin>>,
    themes: Option<Vec<InstalledTheme>>,
    core: Option<Snapshot>,
}

impl SiteView {
    /// Reads the inventory needed for `kinds`, one query per distinct kind.
    pub(crate) fn capture(client: &SiteClient, kinds: &[UpdateKind]) -> Self {
        let mut view = Self::default();
        if kinds.contains(&UpdateKind::Plugin) {
            view.plugins = client
                .get_plugins()
                .inspect_err(|error| log_failure("plugin versions", error))
                .ok();
        }
        if kinds.contains(&UpdateKind::Theme) {
            view.themes = client
                .get_themes()
                .inspect_err(|error| log_failure("theme versions", error))
                .ok();
        }
        if kinds.contains(&UpdateKind::Core) {
            view.core = Some(core_snapshot(client));
        }
        view
    }

    pub(crate) fn snapshot(&self, kind: UpdateKind, identifier: &str) -> Snapshot {
        match kind {
            UpdateKind::Plugin => self
                .plugins
                .as_deref()
                .and_then(|plugins| plugins.iter().find(|plugin| plugin.matches(identifier)))
                .map(|plugin| Snapshot {
                    value: plugin.version.clone(),
                    target: plugin.update_version.clone(),
                })
                .unwrap_or_default(),
            UpdateKind::Theme => self
                .themes
                .as_deref()
                .and_then(|themes| themes.iter().find(|theme| theme.stylesheet == identifier))
                .map(|theme| Snapshot {
                    value: theme.version.clone(),
                    target: theme.update_version.clone(),
                })
                .unwrap_or_default(),
            UpdateKind::Core => self.core.clone().unwrap_or_default(),
        }
    }
}

/// Core version from the update list, falling back to the status report.
fn core_snapshot(client: &SiteClient) -> Snapshot {
    let mut snapshot = match client.get_updates() {
        Ok(updates) => updates
            .core
            .map(|core| Snapshot {
                value: core.current_version,
                target: core.new_version,
            })
            .unwrap_or_default(),
        Err(error) => {
            log_failure("core update", &error);
            Snapshot::default()
        }
    };
    if snapshot.value.is_none() {
        match client.get_status() {
            Ok(status) => snapshot.value = status.core_version,
            Err(error) => log_failure("core version", &error),
        }
    }
    snapshot
}

fn as_count(snapshot: &Snapshot) -> Option<u64> {
    snapshot.value.as_deref().and_then(|value| value.parse().ok())
}

/// Compares the baseline with the re-check.
pub(crate) fn evaluate(
    expectation: Expectation,
    before: &Snapshot,
    after: &Snapshot,
) -> VerificationResult {
    let after_value = after.value.as_deref();
    let (updated, matched_expectation) = match expectation {
        Expectation::NewVersion => {
            let reached = before.target.as_deref().map(|target| after_value == Some(target));
            let changed = match (before.value.as_deref(), after_value) {
                (Some(previous), Some(current)) => previous != current,
                _ => false,
            };
            (changed || reached == Some(true), reached)
        }
        Expectation::State(expected) => {
            let reached = after_value == Some(expected);
            (reached, Some(reached))
        }
        Expectation::Decrease => {
            let decreased = matches!(
                (as_count(before), as_count(after)),
                (Some(previous), Some(current)) if current < previous
            );
            (decreased, None)
        }
        Expectation::Zero => {
            let empty = as_count(after) == Some(0);
            (empty, Some(empty))
        }
    };
    VerificationResult {
        updated,
        version_before: before.value.clone(),
        version_after: after.value.clone(),
        matched_expectation,
    }
}
