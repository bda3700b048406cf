use std::time::Duration;

use pacing::{CallContext, CancelToken};
use serde_json::json;
use wire::{Namespace, Operation, SendFailure};

use super::*;
use crate::testing::{Harness, Reply};

fn akismet(version: &str) -> Reply {
    Reply::ok(json!([
        {"file": "akismet/akismet.php", "name": "Akismet", "version": version, "active": true, "update_version": "5.8.2"}
    ]))
}

#[test]
fn timed_out_update_is_verified_by_version_change() {
    let harness = Harness::new();
    harness
        .backend
        .on(Namespace::Current, "plugins", akismet("5.8.1"))
        .on(Namespace::Current, "plugins", akismet("5.8.2"))
        .on(Namespace::Current, "plugins/update", Reply::timeout());

    let outcome = harness.client.update_plugin("akismet");

    let MutationOutcome::Success(success) = outcome else {
        panic!("expected a verified success, got {outcome:?}");
    };
    assert!(success.verified_after_timeout);
    assert!(success.message.contains("verified after timeout"));
    assert!(success.message.contains("5.8.1 -> 5.8.2"));
    let verification = success.verification.unwrap();
    assert_eq!(verification.version_before.as_deref(), Some("5.8.1"));
    assert_eq!(verification.version_after.as_deref(), Some("5.8.2"));
    assert_eq!(verification.matched_expectation, Some(true));
    assert!(harness.backend.requests_to(Namespace::Legacy, "update-plugin").is_empty());
}

#[test]
fn unchanged_version_after_timeout_is_uncertain() {
    let harness = Harness::new();
    harness
        .backend
        .on(Namespace::Current, "plugins", akismet("5.8.1"))
        .on(Namespace::Current, "plugins/update", Reply::timeout());

    let outcome = harness.client.update_plugin("akismet/akismet.php");

    assert!(outcome.is_uncertain());
    assert_eq!(outcome.exit_code(), 30);
    assert!(outcome.message().contains("re-check later"));
    let MutationOutcome::Uncertain(uncertain) = outcome else {
        unreachable!();
    };
    assert_eq!(uncertain.cause.kind(), ErrorKind::Timeout);
    assert_eq!(uncertain.cause.operation(), Some(Operation::UpdatePlugin));
    assert!(!uncertain.verification.unwrap().updated);
}

#[test]
fn verification_waits_the_configured_delay() {
    let harness = Harness::new();
    harness
        .backend
        .on(Namespace::Current, "plugins", akismet("5.8.1"))
        .on(Namespace::Current, "plugins/update", Reply::timeout());

    harness.client.update_plugin("akismet");

    let requests = harness.backend.requests();
    let update = requests
        .iter()
        .position(|request| request.path == "plugins/update")
        .unwrap();
    let recheck = &requests[update + 1];
    assert_eq!(recheck.path, "plugins");
    let gap = recheck.sent_at - requests[update].sent_at;
    assert!(gap >= Duration::from_secs(240) + Duration::from_secs(10), "gap was {gap:?}");
}

#[test]
fn missing_agent_falls_back_to_rest_with_bearer_token() {
    let harness = Harness::new();
    harness
        .backend
        .on(Namespace::Current, "plugins", akismet("5.8.1"))
        .on(
            Namespace::Rest,
            "plugins/akismet/akismet",
            Reply::ok(json!({"plugin": "akismet/akismet", "version": "5.8.2"})),
        );

    let outcome = harness.client.update_plugin("akismet");

    let MutationOutcome::Success(success) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert!(success.via_rest_fallback);
    assert!(!success.verified_after_timeout);
    let rest = harness.backend.requests_to(Namespace::Rest, "plugins/akismet/akismet");
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].header("Authorization"), Some("Bearer test-key"));
    assert_eq!(rest[0].body, Some(json!({"action": "update"})));
    assert_eq!(harness.backend.requests_to(Namespace::Legacy, "update-plugin").len(), 1);
}

#[test]
fn failed_rest_fallback_reports_the_agent_error() {
    let harness = Harness::new();
    harness.backend.on(Namespace::Current, "themes", Reply::ok(json!([])));

    let outcome = harness.client.update_theme("astra");

    let MutationOutcome::Failed(error) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(error.kind(), ErrorKind::AgentNotInstalled);
    assert!(error.message().contains("REST fallback also failed"));
    assert_eq!(harness.backend.requests_to(Namespace::Rest, "themes/astra").len(), 1);
}

#[test]
fn remote_error_fails_without_verification() {
    let harness = Harness::new();
    harness
        .backend
        .on(Namespace::Current, "plugins", akismet("5.8.1"))
        .on(
            Namespace::Current,
            "plugins/update",
            Reply::json(500, json!({"code": "update_failed", "message": "Disk full"})),
        );

    let outcome = harness.client.update_plugin("akismet");

    let MutationOutcome::Failed(error) = &outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(error.remote_code(), Some("update_failed"));
    assert_eq!(error.operation(), Some(Operation::UpdatePlugin));
    assert_eq!(harness.backend.requests_to(Namespace::Current, "plugins").len(), 1);
    assert_eq!(outcome.exit_code(), error.kind().exit_code());
}

#[test]
fn empty_delete_sends_nothing() {
    let harness = Harness::new();

    let outcome = harness.client.delete_comments(&[]);

    assert!(outcome.is_success());
    assert_eq!(outcome.message(), "no comments to delete");
    assert_eq!(harness.backend.count(), 0);
}

#[test]
fn delete_sends_ids_and_reports_remote_message() {
    let harness = Harness::new();
    harness
        .backend
        .on(Namespace::Current, "comments", Reply::ok(json!({"counts": {"all": 12}})))
        .on(
            Namespace::Current,
            "comments/delete",
            Reply::ok(json!({"deleted": 2, "message": "2 comments deleted"})),
        );

    let outcome = harness.client.delete_comments(&[4, 9]);

    assert_eq!(outcome.message(), "2 comments deleted");
    let sent = harness.backend.requests_to(Namespace::Current, "comments/delete");
    assert_eq!(sent[0].body, Some(json!({"ids": [4, 9]})));
}

#[test]
fn maintenance_toggle_is_verified_from_status() {
    let harness = Harness::new();
    harness
        .backend
        .on(Namespace::Current, "status", Reply::ok(json!({"maintenance_mode": false})))
        .on(Namespace::Current, "status", Reply::ok(json!({"maintenance_mode": true})))
        .on(Namespace::Current, "maintenance", Reply::connection_reset());

    let outcome = harness.client.toggle_maintenance(true, Some("Back soon"));

    let MutationOutcome::Success(success) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert!(success.verified_after_timeout);
    assert!(success.message.contains("off -> on"));
    let sent = harness.backend.requests_to(Namespace::Current, "maintenance");
    assert_eq!(sent[0].body, Some(json!({"enabled": true, "message": "Back soon"})));
}

#[test]
fn cancellation_during_verification_is_uncertain() {
    let harness = Harness::new();
    let token = CancelToken::new();
    let trigger = token.clone();
    harness
        .backend
        .on(Namespace::Current, "plugins", akismet("5.8.1"))
        .on(
            Namespace::Current,
            "plugins/update",
            Reply::dynamic(move |_| {
                trigger.cancel();
                Err(SendFailure::timeout("operation timed out"))
            }),
        );
    let client = harness
        .client
        .with_context(CallContext::none().with_cancel(token));

    let outcome = client.update_plugin("akismet");

    assert!(outcome.is_uncertain());
    assert!(outcome.message().contains("verification was interrupted"));
    assert!(harness.backend.requests_to(Namespace::Current, "plugins").len() == 1);
}

#[test]
fn uncertain_outcome_converts_to_uncertain_error() {
    let harness = Harness::new();
    harness
        .backend
        .on(Namespace::Current, "comments", Reply::ok(json!({"counts": {"all": 3, "spam": 3}})))
        .on(Namespace::Current, "comments/clean", Reply::timeout());

    let error = harness
        .client
        .clean_comments(CommentBucket::Spam)
        .into_result()
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::UpdateUncertain);
    assert_eq!(error.operation(), Some(Operation::CleanComments));
}

fn astra(version: &str) -> Reply {
    Reply::ok(json!([
        {"stylesheet": "astra", "template": "astra", "version": version, "update_version": "4.7"}
    ]))
}

fn hello(active: bool) -> Reply {
    Reply::ok(json!([
        {"file": "hello-dolly/hello.php", "version": "1.7.2", "active": active}
    ]))
}

#[test]
fn timed_out_theme_update_is_verified_by_version_change() {
    let harness = Harness::new();
    harness
        .backend
        .on(Namespace::Current, "themes", astra("4.6"))
        .on(Namespace::Current, "themes", astra("4.7"))
        .on(Namespace::Current, "themes/update", Reply::timeout());

    let outcome = harness.client.update_theme("astra");

    let MutationOutcome::Success(success) = outcome else {
        panic!("expected a verified success, got {outcome:?}");
    };
    assert!(success.verified_after_timeout);
    assert_eq!(success.operation, Operation::UpdateTheme);
    assert!(success.message.contains("update of theme astra"));
    let verification = success.verification.unwrap();
    assert_eq!(verification.version_before.as_deref(), Some("4.6"));
    assert_eq!(verification.version_after.as_deref(), Some("4.7"));
    assert_eq!(verification.matched_expectation, Some(true));
    let sent = harness.backend.requests_to(Namespace::Current, "themes/update");
    assert_eq!(sent.len(), 1);
}

#[test]
fn core_version_falls_back_to_status_during_verification() {
    let harness = Harness::new();
    harness
        .backend
        .on(Namespace::Current, "updates", Reply::ok(json!({"core": {"new_version": "6.6"}})))
        .on(Namespace::Current, "updates", Reply::ok(json!({"core": null})))
        .on(Namespace::Current, "status", Reply::ok(json!({"core_version": "6.5"})))
        .on(Namespace::Current, "status", Reply::ok(json!({"core_version": "6.6"})))
        .on(Namespace::Current, "core/update", Reply::timeout());

    let outcome = harness.client.update_core();

    let MutationOutcome::Success(success) = outcome else {
        panic!("expected a verified success, got {outcome:?}");
    };
    assert!(success.verified_after_timeout);
    assert!(success.message.starts_with("update of core verified"));
    assert!(!success.message.contains("core core"));
    let verification = success.verification.unwrap();
    assert_eq!(verification.version_before.as_deref(), Some("6.5"));
    assert_eq!(verification.version_after.as_deref(), Some("6.6"));
    assert_eq!(verification.matched_expectation, Some(true));
    assert_eq!(harness.backend.requests_to(Namespace::Current, "status").len(), 2);
}

#[test]
fn connection_failure_on_activation_is_verified_from_plugin_state() {
    let harness = Harness::new();
    harness
        .backend
        .on(Namespace::Current, "plugins", hello(false))
        .on(Namespace::Current, "plugins", hello(true))
        .on(Namespace::Current, "plugins/activate", Reply::connection_failed());

    let outcome = harness.client.activate_plugin("hello-dolly/hello.php");

    let MutationOutcome::Success(success) = outcome else {
        panic!("expected a verified success, got {outcome:?}");
    };
    assert!(success.verified_after_timeout);
    assert!(success.message.contains("inactive -> active"));
    assert_eq!(harness.backend.requests_to(Namespace::Current, "plugins").len(), 2);
}

#[test]
fn reset_deactivation_that_did_not_land_is_uncertain() {
    let harness = Harness::new();
    harness
        .backend
        .on(Namespace::Current, "plugins", hello(true))
        .on(Namespace::Current, "plugins/deactivate", Reply::connection_reset());

    let outcome = harness.client.deactivate_plugin("hello-dolly/hello.php");

    let MutationOutcome::Uncertain(uncertain) = outcome else {
        panic!("expected an uncertain outcome, got {outcome:?}");
    };
    assert_eq!(uncertain.cause.kind(), ErrorKind::ConnectionFailed);
    assert_eq!(uncertain.cause.operation(), Some(Operation::DeactivatePlugin));
    let verification = uncertain.verification.unwrap();
    assert!(!verification.updated);
    assert_eq!(verification.version_after.as_deref(), Some("active"));
    assert_eq!(verification.matched_expectation, Some(false));
}

#[test]
fn timed_out_install_is_verified_by_presence() {
    let harness = Harness::new();
    harness
        .backend
        .on(Namespace::Current, "plugins", Reply::ok(json!([])))
        .on(Namespace::Current, "plugins", hello(false))
        .on(Namespace::Current, "plugins/install", Reply::timeout());

    let outcome = harness.client.install_plugin("hello-dolly", false);

    let MutationOutcome::Success(success) = outcome else {
        panic!("expected a verified success, got {outcome:?}");
    };
    assert!(success.message.contains("missing -> installed"));
    let sent = harness.backend.requests_to(Namespace::Current, "plugins/install");
    assert_eq!(sent[0].body, Some(json!({"slug": "hello-dolly", "activate": false})));
}

#[test]
fn timed_out_clean_is_verified_by_empty_bucket() {
    let harness = Harness::new();
    harness
        .backend
        .on(Namespace::Current, "comments", Reply::ok(json!({"counts": {"all": 10, "trash": 4}})))
        .on(Namespace::Current, "comments", Reply::ok(json!({"counts": {"all": 6, "trash": 0}})))
        .on(Namespace::Current, "comments/clean", Reply::timeout());

    let outcome = harness.client.clean_comments(CommentBucket::Trash);

    let MutationOutcome::Success(success) = outcome else {
        panic!("expected a verified success, got {outcome:?}");
    };
    assert!(success.verified_after_timeout);
    assert!(success.message.contains("4 -> 0"));
    assert_eq!(success.verification.unwrap().matched_expectation, Some(true));
}

#[test]
fn rest_plugin_ids() {
    assert_eq!(rest_plugin_id("akismet"), "akismet/akismet");
    assert_eq!(rest_plugin_id("akismet/akismet.php"), "akismet/akismet");
    assert_eq!(rest_plugin_id("hello.php"), "hello");
    assert_eq!(rest_plugin_id("jetpack/jetpack"), "jetpack/jetpack");
}
