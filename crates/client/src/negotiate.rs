//! Current-then-legacy endpoint negotiation.
//!
//! Every logical call first targets the current agent namespace. Only an
//! unsupported route triggers the single legacy attempt, with identical
//! parameters. When both namespaces refuse, the two failures are merged so an
//! authentication failure from either attempt wins over "agent not installed".
//! Callers above this module never see [`Classification::RouteUnsupported`].

use std::time::Duration;

use pacing::CallContext;
use serde_json::Value;
use wire::{AuthFailure, Classification, Method, Namespace, OperationRequest, TransportErrorKind};

use crate::config::ClientConfig;
use crate::dispatch::{Call, Dispatcher};
use crate::error::{ClientError, ErrorKind};

/// Performs `request` against the agent, falling back to the legacy namespace.
pub(crate) fn negotiate(
    dispatcher: &Dispatcher,
    config: &ClientConfig,
    ctx: &CallContext,
    request: &OperationRequest,
) -> Result<Value, ClientError> {
    let operation = request.operation();
    let current = dispatcher
        .call(ctx, Call::for_operation(Namespace::Current, request, config))
        .map_err(|error| error.with_operation(operation))?;

    let first_hint = match current {
        Classification::RouteUnsupported {
            status,
            code,
            auth_hint,
        } => {
            logging::trace_negotiate!(
                operation = operation.name(),
                status,
                code = code.as_deref().unwrap_or("-"),
                "current namespace does not serve the route; trying legacy"
            );
            auth_hint
        }
        resolved => return resolve(resolved).map_err(|error| error.with_operation(operation)),
    };

    let legacy = dispatcher
        .call(ctx, Call::for_operation(Namespace::Legacy, request, config))
        .map_err(|error| error.with_operation(operation))?;
    combine(first_hint, legacy).map_err(|error| error.with_operation(operation))
}

/// Performs a call against the generic REST surface, bypassing the agent.
pub(crate) fn rest_call(
    dispatcher: &Dispatcher,
    ctx: &CallContext,
    path: &str,
    body: &Value,
    timeout: Duration,
) -> Result<Value, ClientError> {
    let call = Call {
        namespace: Namespace::Rest,
        path,
        method: Method::Post,
        query: &[],
        body: Some(body),
        timeout,
    };
    match dispatcher.call(ctx, call)? {
        Classification::RouteUnsupported {
            status, auth_hint, ..
        } => Err(auth_hint.map_or_else(
            || {
                ClientError::new(
                    ErrorKind::RemoteRejected,
                    format!("REST route '{path}' is not available"),
                )
                .with_status(status)
            },
            |auth| auth_error(auth, status),
        )),
        resolved => resolve(resolved),
    }
}

/// Maps a classification that needs no further negotiation.
pub(crate) fn resolve(classification: Classification) -> Result<Value, ClientError> {
    match classification {
        Classification::Success(payload) => Ok(payload),
        Classification::RemoteError(fault) => Err(ClientError::from_fault(fault)),
        Classification::Transport { kind, detail } => {
            Err(ClientError::from_transport(kind, detail))
        }
        Classification::RouteUnsupported { .. } => Err(ClientError::agent_not_installed()),
    }
}

/// Merges the legacy attempt with what the current attempt revealed.
///
/// Precedence: legacy success, legacy authentication error, authentication
/// hint from either route miss, then "agent not installed" for a legacy route
/// miss or an HTML page. Any other legacy failure is reported as is.
fn combine(first_hint: Option<AuthFailure>, legacy: Classification) -> Result<Value, ClientError> {
    if let Classification::RemoteError(fault) = &legacy
        && fault.auth.is_some()
    {
        return resolve(legacy);
    }
    if let Some(auth) = first_hint
        && !matches!(legacy, Classification::Success(_))
    {
        logging::trace_negotiate!(
            "authentication failure on the current namespace takes precedence"
        );
        return Err(auth_error(auth, 404));
    }

    match legacy {
        Classification::RouteUnsupported {
            status,
            auth_hint: Some(auth),
            ..
        } => Err(auth_error(auth, status)),
        Classification::RouteUnsupported { .. } => Err(ClientError::agent_not_installed()),
        Classification::Transport {
            kind: TransportErrorKind::MalformedBody,
            detail,
        } => {
            logging::trace_negotiate!(
                detail = %detail,
                "legacy namespace answered with non-API output"
            );
            Err(ClientError::agent_not_installed())
        }
        other => resolve(other),
    }
}

fn auth_error(auth: AuthFailure, status: u16) -> ClientError {
    let message = match auth {
        AuthFailure::InvalidCredential => "the site rejected the API key",
        AuthFailure::InsufficientPermission => {
            "the API key lacks permission for this operation"
        }
    };
    ClientError::new(auth.into(), message).with_status(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, Reply};
    use serde_json::json;
    use wire::{Operation, PRIMARY_KEY_HEADER};

    fn run(harness: &Harness, request: &OperationRequest) -> Result<Value, ClientError> {
        harness.client.query(request.clone())
    }

    #[test]
    fn current_success_skips_legacy() {
        let harness = Harness::new();
        harness
            .backend
            .on(Namespace::Current, "status", Reply::ok(json!({"site_name": "Blog"})));

        let value = run(&harness, &OperationRequest::new(Operation::GetStatus)).unwrap();

        assert_eq!(value["site_name"], "Blog");
        assert_eq!(harness.backend.count(), 1);
    }

    #[test]
    fn route_miss_retries_legacy_with_identical_parameters() {
        let harness = Harness::new();
        harness
            .backend
            .on(Namespace::Legacy, "get-comments", Reply::ok(json!([])));
        let request = OperationRequest::new(Operation::GetComments).with_query("status", "spam");

        run(&harness, &request).unwrap();

        let requests = harness.backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].namespace, Namespace::Current);
        assert_eq!(requests[0].path, "comments");
        assert_eq!(requests[1].namespace, Namespace::Legacy);
        assert_eq!(requests[1].path, "get-comments");
        assert_eq!(requests[0].query, requests[1].query);
        assert_eq!(requests[1].header(PRIMARY_KEY_HEADER), Some("test-key"));
    }

    #[test]
    fn double_route_miss_reports_agent_not_installed() {
        let harness = Harness::new();

        let error = run(&harness, &OperationRequest::new(Operation::GetUsers)).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::AgentNotInstalled);
        assert_eq!(error.operation(), Some(Operation::GetUsers));
        assert_eq!(harness.backend.count(), 2);
    }

    #[test]
    fn auth_hint_on_current_route_miss_wins() {
        let harness = Harness::new();
        harness.backend.on(
            Namespace::Current,
            "status",
            Reply::json(404, json!({"code": "invalid_api_key"})),
        );

        let error = run(&harness, &OperationRequest::new(Operation::GetStatus)).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::InvalidCredential);
    }

    #[test]
    fn legacy_auth_error_wins() {
        let harness = Harness::new();
        harness.backend.on(
            Namespace::Legacy,
            "site-status",
            Reply::json(403, json!({"code": "forbidden", "message": "Nope"})),
        );

        let error = run(&harness, &OperationRequest::new(Operation::GetStatus)).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::InsufficientPermission);
        assert_eq!(error.message(), "Nope");
    }

    #[test]
    fn legacy_html_page_means_agent_missing() {
        let harness = Harness::new();
        harness.backend.on(
            Namespace::Legacy,
            "site-status",
            Reply::html(200, "<!DOCTYPE html><html><body>Home</body></html>"),
        );

        let error = run(&harness, &OperationRequest::new(Operation::GetStatus)).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::AgentNotInstalled);
    }

    #[test]
    fn legacy_timeout_is_reported_as_timeout() {
        let harness = Harness::new();
        harness
            .backend
            .on(Namespace::Legacy, "site-status", Reply::timeout());

        let error = run(&harness, &OperationRequest::new(Operation::GetStatus)).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Timeout);
        assert!(error.is_timeout_class());
    }

    #[test]
    fn non_route_failures_on_current_are_not_retried() {
        let harness = Harness::new();
        harness.backend.on(
            Namespace::Current,
            "status",
            Reply::json(500, json!({"code": "db_error", "message": "database down"})),
        );

        let error = run(&harness, &OperationRequest::new(Operation::GetStatus)).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::RemoteRejected);
        assert_eq!(error.remote_code(), Some("db_error"));
        assert_eq!(harness.backend.count(), 1);
    }
}
