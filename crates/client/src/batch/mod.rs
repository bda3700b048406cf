//! Batch software updates.
//!
//! [`SiteClient::perform_updates`] first tries one bulk call covering every
//! item. When neither agent namespace serves the bulk route it falls back to
//! one single-item update per item, strictly in input order. Baselines are
//! read once per kind before anything is sent, and a bulk call that times out
//! is verified with one re-read per kind.


use serde::Serialize;
use serde_json::{Map, Value, json};
use wire::{Operation, OperationRequest};

use crate::client::SiteClient;
use crate::error::{ClientError, ErrorKind};
use crate::inventory::UpdateKind;
use crate::mutation::verify::{SiteView, Snapshot};
use crate::mutation::{MutationOutcome, MutationPlan, MutationSuccess, UncertainMutation, UpdateItem};

/// Components of one kind to update.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UpdateGroup {
    /// Kind shared by every item.
    pub kind: UpdateKind,
    /// Identifiers. Ignored for [`UpdateKind::Core`].
    pub items: Vec<String>,
}

impl UpdateGroup {
    /// Creates a group of `kind`.
    pub fn new<I, S>(kind: UpdateKind, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    /// Plugin updates.
    pub fn plugins<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(UpdateKind::Plugin, items)
    }

    /// Theme updates.
    pub fn themes<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(UpdateKind::Theme, items)
    }

    /// The core update.
    #[must_use]
    pub fn core() -> Self {
        Self {
            kind: UpdateKind::Core,
            items: Vec::new(),
        }
    }
}

/// How a batch was executed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// Nothing to do; no request was sent.
    Empty,
    /// One bulk call covered every item.
    Bulk,
    /// One call per item.
    Sequential,
}

/// Result for one item of a batch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchEntry {
    /// The component and its version before the batch.
    pub item: UpdateItem,
    /// Final outcome.
    pub outcome: MutationOutcome,
}

/// Ordered per-item results of a batch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchReport {
    entries: Vec<BatchEntry>,
    all_succeeded: bool,
    mode: BatchMode,
}

impl BatchReport {
    fn new(entries: Vec<BatchEntry>, mode: BatchMode) -> Self {
        let all_succeeded = entries.iter().all(|entry| entry.outcome.is_success());
        Self {
            entries,
            all_succeeded,
            mode,
        }
    }

    /// Entries in input order.
    #[must_use]
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    /// True only when every item succeeded.
    #[must_use]
    pub const fn all_succeeded(&self) -> bool {
        self.all_succeeded
    }

    /// Execution mode.
    #[must_use]
    pub const fn mode(&self) -> BatchMode {
        self.mode
    }

    /// Number of items that succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.count(MutationOutcome::is_success)
    }

    /// Number of items whose outcome is pending.
    #[must_use]
    pub fn uncertain(&self) -> usize {
        self.count(MutationOutcome::is_uncertain)
    }

    /// Number of items that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded() - self.uncertain()
    }

    fn count(&self, predicate: fn(&MutationOutcome) -> bool) -> usize {
        self.entries
            .iter()
            .filter(|entry| predicate(&entry.outcome))
            .count()
    }

    /// Process exit code: failures win over pending items.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.entries
            .iter()
            .map(|entry| entry.outcome.exit_code())
            .find(|code| *code != 0 && *code != ErrorKind::UpdateUncertain.exit_code())
            .or_else(|| (self.uncertain() > 0).then_some(ErrorKind::UpdateUncertain.exit_code()))
            .unwrap_or(0)
    }
}

/// One item with its plan and baseline.
struct Pending {
    plan: MutationPlan,
    item: UpdateItem,
    baseline: Snapshot,
}

fn flatten(groups: &[UpdateGroup]) -> Vec<(UpdateKind, String)> {
    let mut items: Vec<(UpdateKind, String)> = Vec::new();
    for group in groups {
        let identifiers = match group.kind {
            UpdateKind::Core => vec!["core".to_owned()],
            UpdateKind::Plugin | UpdateKind::Theme => group
                .items
                .iter()
                .map(|item| item.trim().to_owned())
                .filter(|item| !item.is_empty())
                .collect(),
        };
        for identifier in identifiers {
            if !items
                .iter()
                .any(|(kind, existing)| *kind == group.kind && *existing == identifier)
            {
                items.push((group.kind, identifier));
            }
        }
    }
    items
}

/// Reports whether a bulk result names `identifier`.
fn same_component(reported: &str, identifier: &str) -> bool {
    let (reported, identifier) = (reported.trim_matches('/'), identifier.trim_matches('/'));
    reported == identifier
        || reported
            .strip_prefix(identifier)
            .is_some_and(|rest| rest.starts_with('/'))
        || identifier
            .strip_prefix(reported)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn result_id(entry: &Map<String, Value>) -> Option<&str> {
    ["id", "identifier", "slug", "plugin", "theme", "file", "stylesheet"]
        .iter()
        .find_map(|key| entry.get(*key).and_then(Value::as_str))
}

fn result_kind(entry: &Map<String, Value>) -> Option<UpdateKind> {
    ["type", "kind"]
        .iter()
        .find_map(|key| entry.get(*key).and_then(Value::as_str))
        .and_then(|kind| kind.parse().ok())
}

/// Finds the bulk result entry for one item.
fn find_result<'a>(payload: &'a Value, kind: UpdateKind, identifier: &str) -> Option<&'a Map<String, Value>> {
    let listed = payload
        .get("results")
        .or_else(|| payload.get("items"))
        .or(Some(payload))
        .and_then(Value::as_array);
    if let Some(results) = listed {
        return results.iter().filter_map(Value::as_object).find(|entry| {
            let reported_kind = result_kind(entry);
            if kind == UpdateKind::Core && reported_kind == Some(UpdateKind::Core) {
                return true;
            }
            reported_kind.is_none_or(|reported| reported == kind)
                && result_id(entry).is_some_and(|reported| same_component(reported, identifier))
        });
    }

    let section = match kind {
        UpdateKind::Core => return payload.get("core").and_then(Value::as_object),
        UpdateKind::Plugin => payload.get("plugins"),
        UpdateKind::Theme => payload.get("themes"),
    }?;
    match section {
        Value::Object(map) => map
            .iter()
            .find(|(key, _)| same_component(key, identifier))
            .and_then(|(_, entry)| entry.as_object()),
        Value::Array(entries) => entries
            .iter()
            .filter_map(Value::as_object)
            .find(|entry| result_id(entry).is_some_and(|reported| same_component(reported, identifier))),
        _ => None,
    }
}

fn result_succeeded(entry: &Map<String, Value>) -> bool {
    if let Some(flag) = entry.get("success").and_then(Value::as_bool) {
        return flag;
    }
    entry
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|status| matches!(status, "success" | "updated" | "ok" | "done"))
}

fn result_message(entry: &Map<String, Value>) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|key| entry.get(*key).and_then(Value::as_str))
        .map(str::to_owned)
}

impl SiteClient {
    /// Updates every component listed in `groups`.
    ///
    /// Duplicates are dropped; a core group stands for the single core update.
    /// An empty request returns an empty, successful report without any
    /// network activity.
    pub fn perform_updates(&self, groups: &[UpdateGroup]) -> BatchReport {
        let items = flatten(groups);
        if items.is_empty() {
            return BatchReport::new(Vec::new(), BatchMode::Empty);
        }

        let mut kinds: Vec<UpdateKind> = items.iter().map(|(kind, _)| *kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        let view = SiteView::capture(self, &kinds);
        let pending: Vec<Pending> = items
            .iter()
            .map(|(kind, identifier)| {
                let baseline = view.snapshot(*kind, identifier);
                Pending {
                    plan: MutationPlan::update(*kind, identifier),
                    item: UpdateItem {
                        kind: *kind,
                        identifier: identifier.clone(),
                        version_before: baseline.value.clone(),
                    },
                    baseline,
                }
            })
            .collect();

        let updates: Vec<Value> = items
            .iter()
            .map(|(kind, identifier)| json!({"type": kind.as_str(), "id": identifier}))
            .collect();
        let request = OperationRequest::new(Operation::BulkUpdate)
            .with_body(json!({"updates": updates}));
        logging::trace_batch!(items = pending.len(), "sending bulk update");

        let report = match self.query(request) {
            Ok(payload) => BatchReport::new(self.bulk_entries(pending, &payload), BatchMode::Bulk),
            Err(error) if error.kind() == ErrorKind::AgentNotInstalled => {
                logging::trace_batch!(
                    items = pending.len(),
                    "bulk route unavailable; updating items one at a time"
                );
                let entries = pending
                    .into_iter()
                    .map(|pending| BatchEntry {
                        outcome: self.run_plan(&pending.plan, Some(pending.baseline)),
                        item: pending.item,
                    })
                    .collect();
                BatchReport::new(entries, BatchMode::Sequential)
            }
            Err(error) if error.is_timeout_class() => {
                BatchReport::new(self.verify_bulk(pending, &kinds, &error), BatchMode::Bulk)
            }
            Err(error) => {
                let entries = pending
                    .into_iter()
                    .map(|pending| BatchEntry {
                        item: pending.item,
                        outcome: MutationOutcome::Failed(error.clone()),
                    })
                    .collect();
                BatchReport::new(entries, BatchMode::Bulk)
            }
        };

        logging::trace_batch!(
            succeeded = report.succeeded(),
            uncertain = report.uncertain(),
            failed = report.failed(),
            "batch finished"
        );
        report
    }

    /// Verifies every item of a bulk call that timed out.
    fn verify_bulk(&self, pending: Vec<Pending>, kinds: &[UpdateKind], cause: &ClientError) -> Vec<BatchEntry> {
        let cause = cause.clone().with_operation(Operation::BulkUpdate);
        if let Err(interrupted) = self.pause(self.config().verify_delay()) {
            return pending
                .into_iter()
                .map(|pending| BatchEntry {
                    outcome: MutationOutcome::Uncertain(UncertainMutation {
                        operation: Operation::BulkUpdate,
                        target: pending.item.identifier.clone(),
                        message: format!(
                            "{} may still be completing in the background; verification was interrupted ({interrupted}); re-check later",
                            pending.plan.label()
                        ),
                        cause: cause.clone(),
                        verification: None,
                    }),
                    item: pending.item,
                })
                .collect();
        }

        let view = SiteView::capture(self, kinds);
        pending
            .into_iter()
            .map(|pending| {
                let after = view.snapshot(pending.item.kind, &pending.item.identifier);
                BatchEntry {
                    outcome: self.settle(&pending.plan, &pending.baseline, &after, cause.clone(), false),
                    item: pending.item,
                }
            })
            .collect()
    }

    /// Maps a bulk response onto the items.
    ///
    /// Items the response does not mention are re-read once per kind and
    /// settled against their baselines.
    fn bulk_entries(&self, pending: Vec<Pending>, payload: &Value) -> Vec<BatchEntry> {
        let reported: Vec<Option<MutationOutcome>> = pending
            .iter()
            .map(|pending| reported_outcome(pending, payload))
            .collect();

        let mut unreported: Vec<UpdateKind> = pending
            .iter()
            .zip(&reported)
            .filter(|(_, outcome)| outcome.is_none())
            .map(|(pending, _)| pending.item.kind)
            .collect();
        unreported.sort_unstable();
        unreported.dedup();
        let view = if unreported.is_empty() {
            None
        } else {
            logging::trace_batch!(
                kinds = unreported.len(),
                "bulk response omitted some items; re-reading inventory"
            );
            Some(SiteView::capture(self, &unreported))
        };

        pending
            .into_iter()
            .zip(reported)
            .map(|(pending, outcome)| {
                let outcome = outcome.unwrap_or_else(|| {
                    let cause = ClientError::new(
                        ErrorKind::MalformedRemoteResponse,
                        "bulk response did not mention this item",
                    )
                    .with_operation(Operation::BulkUpdate);
                    let after = view
                        .as_ref()
                        .map(|view| view.snapshot(pending.item.kind, &pending.item.identifier))
                        .unwrap_or_default();
                    self.settle(&pending.plan, &pending.baseline, &after, cause, false)
                });
                BatchEntry {
                    item: pending.item,
                    outcome,
                }
            })
            .collect()
    }
}

/// Outcome an explicit bulk result reports for one item, if any.
fn reported_outcome(pending: &Pending, payload: &Value) -> Option<MutationOutcome> {
    let item = &pending.item;
    let entry = find_result(payload, item.kind, &item.identifier)?;
    Some(if result_succeeded(entry) {
        MutationOutcome::Success(MutationSuccess {
            operation: Operation::BulkUpdate,
            target: item.identifier.clone(),
            message: result_message(entry)
                .unwrap_or_else(|| format!("{} completed", pending.plan.label())),
            verified_after_timeout: false,
            verification: None,
            payload: Value::Object(entry.clone()),
            via_rest_fallback: false,
        })
    } else {
        MutationOutcome::Failed(
            ClientError::new(
                ErrorKind::RemoteRejected,
                result_message(entry).unwrap_or_else(|| format!("{} failed", pending.plan.label())),
            )
            .with_operation(Operation::BulkUpdate),
        )
    })
}
