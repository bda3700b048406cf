//! State-changing operations and the timeout verifier.
//!
//! Every mutation runs the same routine:
//!
//! 1. observe a baseline (version, state or count) of what it will change;
//! 2. send the negotiated request;
//! 3. for software updates whose agent route is missing or rejects the key,
//!    retry once through the generic REST surface with a bearer token;
//! 4. when the request fails with a timeout-class error, wait the verification
//!    delay, observe again and compare.
//!
//! A re-check that proves the change turns the timeout into a success. Any
//! other re-check result, including an interrupted one, yields
//! [`MutationOutcome::Uncertain`].

mod outcome;
pub(crate) mod verify;

#[cfg(test)]
mod tests;

use serde_json::{Value, json};
use wire::{Operation, OperationRequest};

use crate::client::SiteClient;
use crate::error::{ClientError, ErrorKind};
use crate::inventory::{CommentBucket, UpdateKind};

pub use self::outcome::{
    MutationOutcome, MutationSuccess, UncertainMutation, UpdateItem, VerificationResult,
};
use self::verify::{Expectation, Snapshot, Watch, evaluate};

/// Everything needed to run and verify one mutation.
#[derive(Clone, Debug)]
pub(crate) struct MutationPlan {
    request: OperationRequest,
    target: String,
    label: String,
    watch: Watch,
    expectation: Expectation,
    rest_path: Option<String>,
}

impl MutationPlan {
    fn new(
        request: OperationRequest,
        target: impl Into<String>,
        label: impl Into<String>,
        watch: Watch,
        expectation: Expectation,
    ) -> Self {
        Self {
            request,
            target: target.into(),
            label: label.into(),
            watch,
            expectation,
            rest_path: None,
        }
    }

    /// Plan for updating one component.
    pub(crate) fn update(kind: UpdateKind, identifier: &str) -> Self {
        let (operation, body, rest_path) = match kind {
            UpdateKind::Plugin => (
                Operation::UpdatePlugin,
                json!({"plugin": identifier}),
                format!("plugins/{}", rest_plugin_id(identifier)),
            ),
            UpdateKind::Theme => (
                Operation::UpdateTheme,
                json!({"theme": identifier}),
                format!("themes/{identifier}"),
            ),
            UpdateKind::Core => (Operation::UpdateCore, json!({}), "core/update".to_owned()),
        };
        let mut plan = Self::new(
            OperationRequest::new(operation).with_body(body),
            identifier,
            match kind {
                UpdateKind::Core => "update of core".to_owned(),
                UpdateKind::Plugin | UpdateKind::Theme => format!("update of {kind} {identifier}"),
            },
            Watch::Version(kind, identifier.to_owned()),
            Expectation::NewVersion,
        );
        plan.rest_path = Some(rest_path);
        plan
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }
}

/// REST plugin id: the plugin file without `.php`, `slug/slug` for a bare slug.
fn rest_plugin_id(identifier: &str) -> String {
    let identifier = identifier.trim_matches('/');
    match identifier.strip_suffix(".php") {
        Some(stem) => stem.to_owned(),
        None if identifier.contains('/') => identifier.to_owned(),
        None => format!("{identifier}/{identifier}"),
    }
}

impl SiteClient {
    /// Updates one plugin, identified by file or slug.
    pub fn update_plugin(&self, identifier: &str) -> MutationOutcome {
        self.run_plan(&MutationPlan::update(UpdateKind::Plugin, identifier), None)
    }

    /// Updates one theme, identified by stylesheet.
    pub fn update_theme(&self, stylesheet: &str) -> MutationOutcome {
        self.run_plan(&MutationPlan::update(UpdateKind::Theme, stylesheet), None)
    }

    /// Updates the core.
    pub fn update_core(&self) -> MutationOutcome {
        self.run_plan(&MutationPlan::update(UpdateKind::Core, "core"), None)
    }

    /// Activates a plugin.
    pub fn activate_plugin(&self, identifier: &str) -> MutationOutcome {
        let plan = MutationPlan::new(
            OperationRequest::new(Operation::ActivatePlugin)
                .with_body(json!({"plugin": identifier})),
            identifier,
            format!("activation of plugin {identifier}"),
            Watch::PluginActive(identifier.to_owned()),
            Expectation::State("active"),
        );
        self.run_plan(&plan, None)
    }

    /// Deactivates a plugin.
    pub fn deactivate_plugin(&self, identifier: &str) -> MutationOutcome {
        let plan = MutationPlan::new(
            OperationRequest::new(Operation::DeactivatePlugin)
                .with_body(json!({"plugin": identifier})),
            identifier,
            format!("deactivation of plugin {identifier}"),
            Watch::PluginActive(identifier.to_owned()),
            Expectation::State("inactive"),
        );
        self.run_plan(&plan, None)
    }

    /// Installs a plugin from the public directory, optionally activating it.
    pub fn install_plugin(&self, slug: &str, activate: bool) -> MutationOutcome {
        let (watch, expectation) = if activate {
            (Watch::PluginActive(slug.to_owned()), Expectation::State("active"))
        } else {
            (
                Watch::PluginInstalled(slug.to_owned()),
                Expectation::State("installed"),
            )
        };
        let plan = MutationPlan::new(
            OperationRequest::new(Operation::InstallPlugin)
                .with_body(json!({"slug": slug, "activate": activate})),
            slug,
            format!("installation of plugin {slug}"),
            watch,
            expectation,
        );
        self.run_plan(&plan, None)
    }

    /// Turns maintenance mode on or off.
    pub fn toggle_maintenance(&self, enabled: bool, message: Option<&str>) -> MutationOutcome {
        let mut body = json!({"enabled": enabled});
        if let Some(message) = message {
            body["message"] = Value::from(message);
        }
        let state = if enabled { "on" } else { "off" };
        let plan = MutationPlan::new(
            OperationRequest::new(Operation::ToggleMaintenance).with_body(body),
            "maintenance",
            format!("maintenance mode {state}"),
            Watch::Maintenance,
            Expectation::State(state),
        );
        self.run_plan(&plan, None)
    }

    /// Deletes comments by id. An empty list succeeds without a request.
    pub fn delete_comments(&self, ids: &[u64]) -> MutationOutcome {
        let target = format!("{} comment(s)", ids.len());
        if ids.is_empty() {
            return MutationOutcome::Success(MutationSuccess {
                operation: Operation::DeleteComments,
                target,
                message: "no comments to delete".to_owned(),
                verified_after_timeout: false,
                verification: None,
                payload: Value::Null,
                via_rest_fallback: false,
            });
        }
        let plan = MutationPlan::new(
            OperationRequest::new(Operation::DeleteComments).with_body(json!({"ids": ids})),
            target.clone(),
            format!("deletion of {target}"),
            Watch::CommentTotal,
            Expectation::Decrease,
        );
        self.run_plan(&plan, None)
    }

    /// Permanently empties the spam or trash bucket.
    pub fn clean_comments(&self, bucket: CommentBucket) -> MutationOutcome {
        let plan = MutationPlan::new(
            OperationRequest::new(Operation::CleanComments)
                .with_body(json!({"status": bucket.as_str()})),
            bucket.as_str(),
            format!("cleaning of {bucket} comments"),
            Watch::Bucket(bucket),
            Expectation::Zero,
        );
        self.run_plan(&plan, None)
    }

    /// Runs `plan`, observing the baseline unless one is supplied.
    pub(crate) fn run_plan(&self, plan: &MutationPlan, baseline: Option<Snapshot>) -> MutationOutcome {
        let operation = plan.request.operation();
        let baseline = baseline.unwrap_or_else(|| plan.watch.observe(self));

        let (result, via_rest_fallback) = match self.query(plan.request.clone()) {
            Err(error) if plan.rest_path.is_some() && needs_rest_fallback(&error) => {
                match self.rest_fallback(plan, error) {
                    Ok(payload) => (Ok(payload), true),
                    Err(error) => (Err(error), true),
                }
            }
            other => (other, false),
        };

        match result {
            Ok(payload) => {
                logging::trace_mutation!(
                    operation = operation.name(),
                    target = %plan.target,
                    via_rest_fallback,
                    "mutation accepted"
                );
                let message = payload
                    .get("message")
                    .and_then(Value::as_str)
                    .map_or_else(|| format!("{} completed", plan.label), str::to_owned);
                MutationOutcome::Success(MutationSuccess {
                    operation,
                    target: plan.target.clone(),
                    message,
                    verified_after_timeout: false,
                    verification: None,
                    payload,
                    via_rest_fallback,
                })
            }
            Err(error) if error.is_timeout_class() => {
                self.verify_after_timeout(plan, &baseline, error, via_rest_fallback)
            }
            Err(error) => MutationOutcome::Failed(error.with_operation(operation)),
        }
    }

    fn rest_fallback(&self, plan: &MutationPlan, primary: ClientError) -> Result<Value, ClientError> {
        let Some(path) = plan.rest_path.as_deref() else {
            return Err(primary);
        };
        logging::trace_mutation!(
            operation = plan.request.operation().name(),
            path,
            primary = primary.kind().as_str(),
            "agent route unavailable; falling back to the REST surface"
        );
        match self.rest(path, &json!({"action": "update"}), self.config().update_timeout()) {
            Ok(payload) => Ok(payload),
            Err(error) if error.is_timeout_class() || error.kind() == ErrorKind::Cancelled => {
                Err(error)
            }
            Err(error) => Err(primary.with_context(format!(
                "REST fallback also failed: {}",
                error.message()
            ))),
        }
    }

    /// Waits, re-observes and decides between a verified success and an
    /// uncertain outcome.
    pub(crate) fn verify_after_timeout(
        &self,
        plan: &MutationPlan,
        baseline: &Snapshot,
        cause: ClientError,
        via_rest_fallback: bool,
    ) -> MutationOutcome {
        let operation = plan.request.operation();
        let cause = cause.with_operation(operation);
        logging::trace_verify!(
            operation = operation.name(),
            target = %plan.target,
            delay_secs = self.config().verify_delay().as_secs(),
            "request timed out; re-checking before reporting"
        );

        if let Err(interrupted) = self.pause(self.config().verify_delay()) {
            return MutationOutcome::Uncertain(UncertainMutation {
                operation,
                target: plan.target.clone(),
                message: format!(
                    "{} may still be completing in the background; verification was interrupted ({interrupted}); re-check later",
                    plan.label
                ),
                cause,
                verification: None,
            });
        }

        let after = plan.watch.observe(self);
        self.settle(plan, baseline, &after, cause, via_rest_fallback)
    }

    /// Turns a baseline and a re-check into the final outcome.
    pub(crate) fn settle(
        &self,
        plan: &MutationPlan,
        baseline: &Snapshot,
        after: &Snapshot,
        cause: ClientError,
        via_rest_fallback: bool,
    ) -> MutationOutcome {
        let operation = plan.request.operation();
        let verification = evaluate(plan.expectation, baseline, after);
        logging::trace_verify!(
            operation = operation.name(),
            target = %plan.target,
            updated = verification.updated,
            before = verification.version_before.as_deref().unwrap_or("?"),
            after = verification.version_after.as_deref().unwrap_or("?"),
            "post-timeout re-check finished"
        );

        if verification.updated {
            MutationOutcome::Success(MutationSuccess {
                operation,
                target: plan.target.clone(),
                message: format!(
                    "{} verified after timeout ({} -> {})",
                    plan.label,
                    verification.version_before.as_deref().unwrap_or("unknown"),
                    verification.version_after.as_deref().unwrap_or("unknown"),
                ),
                verified_after_timeout: true,
                verification: Some(verification),
                payload: Value::Null,
                via_rest_fallback,
            })
        } else {
            MutationOutcome::Uncertain(UncertainMutation {
                operation,
                target: plan.target.clone(),
                message: format!(
                    "{} may still be completing in the background; re-check later",
                    plan.label
                ),
                cause,
                verification: Some(verification),
            })
        }
    }
}

fn needs_rest_fallback(error: &ClientError) -> bool {
    error.kind() == ErrorKind::AgentNotInstalled || error.is_auth_failure()
}
