//! Caller-facing error taxonomy.
//!
//! Every public operation reports failures as a [`ClientError`] whose
//! [`ErrorKind`] is stable across both agent generations. Raw transport
//! failures never escape: they are classified first and mapped here.

use std::fmt;

use pacing::Interrupted;
use serde::Serialize;
use thiserror::Error;
use wire::{AuthFailure, Operation, RemoteFault, TransportErrorKind};

/// Stable classification of a failed call.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The API key is missing, unknown or revoked.
    InvalidCredential,
    /// The API key is valid but lacks the rights for the operation.
    InsufficientPermission,
    /// Neither agent namespace serves the operation.
    AgentNotInstalled,
    /// The site could not be reached.
    ConnectionFailed,
    /// The call did not complete in time.
    Timeout,
    /// The site kept rate limiting the caller after one cooldown.
    RateLimited,
    /// The site answered with something other than API output.
    MalformedRemoteResponse,
    /// The agent refused the operation with a structured error.
    RemoteRejected,
    /// A mutation timed out and its effect could not be confirmed.
    UpdateUncertain,
    /// The caller cancelled the call.
    Cancelled,
    /// Anything else.
    Unknown,
}

impl ErrorKind {
    /// Returns the snake_case identifier used in JSON output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidCredential => "invalid_credential",
            Self::InsufficientPermission => "insufficient_permission",
            Self::AgentNotInstalled => "agent_not_installed",
            Self::ConnectionFailed => "connection_failed",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::MalformedRemoteResponse => "malformed_remote_response",
            Self::RemoteRejected => "remote_rejected",
            Self::UpdateUncertain => "update_uncertain",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }

    /// Returns a short human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::InvalidCredential => "invalid credential",
            Self::InsufficientPermission => "insufficient permission",
            Self::AgentNotInstalled => "management agent not installed",
            Self::ConnectionFailed => "connection failed",
            Self::Timeout => "timed out",
            Self::RateLimited => "rate limited",
            Self::MalformedRemoteResponse => "malformed remote response",
            Self::RemoteRejected => "rejected by remote",
            Self::UpdateUncertain => "outcome uncertain",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown error",
        }
    }

    /// Returns the process exit code the command-line front end uses.
    ///
    /// Codes are grouped: 1x credentials and installation, 2x transport,
    /// 30 for pending outcomes, 40 for cancellation.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Unknown => 2,
            Self::InvalidCredential => 10,
            Self::InsufficientPermission => 11,
            Self::AgentNotInstalled => 12,
            Self::ConnectionFailed => 20,
            Self::Timeout => 21,
            Self::RateLimited => 22,
            Self::MalformedRemoteResponse => 23,
            Self::RemoteRejected => 24,
            Self::UpdateUncertain => 30,
            Self::Cancelled => 40,
        }
    }

    /// Reports whether the kind is an authentication failure.
    #[must_use]
    pub const fn is_auth(self) -> bool {
        matches!(self, Self::InvalidCredential | Self::InsufficientPermission)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl From<AuthFailure> for ErrorKind {
    fn from(auth: AuthFailure) -> Self {
        match auth {
            AuthFailure::InvalidCredential => Self::InvalidCredential,
            AuthFailure::InsufficientPermission => Self::InsufficientPermission,
        }
    }
}

impl From<TransportErrorKind> for ErrorKind {
    fn from(kind: TransportErrorKind) -> Self {
        match kind {
            TransportErrorKind::Timeout => Self::Timeout,
            TransportErrorKind::ConnectionFailed | TransportErrorKind::ConnectionReset => {
                Self::ConnectionFailed
            }
            TransportErrorKind::MalformedBody => Self::MalformedRemoteResponse,
            TransportErrorKind::RateLimited => Self::RateLimited,
        }
    }
}

/// Failure of a client call.
#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[error("{kind}: {message}")]
pub struct ClientError {
    kind: ErrorKind,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transport: Option<TransportErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operation: Option<Operation>,
}

impl ClientError {
    /// Creates an error of `kind` with a detail message.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            remote_code: None,
            status: None,
            transport: None,
            operation: None,
        }
    }

    /// Maps a structured remote error.
    #[must_use]
    pub fn from_fault(fault: RemoteFault) -> Self {
        let kind = fault.auth.map_or(ErrorKind::RemoteRejected, ErrorKind::from);
        Self {
            kind,
            message: fault.message,
            remote_code: fault.code,
            status: Some(fault.status),
            transport: None,
            operation: None,
        }
    }

    /// Maps a transport failure, keeping its kind for timeout-class checks.
    #[must_use]
    pub fn from_transport(kind: TransportErrorKind, detail: impl Into<String>) -> Self {
        let mut error = Self::new(kind.into(), detail);
        error.transport = Some(kind);
        error
    }

    /// Error raised when neither agent namespace serves an operation.
    #[must_use]
    pub fn agent_not_installed() -> Self {
        Self::new(
            ErrorKind::AgentNotInstalled,
            "management endpoints not found; verify the remote agent is installed and active",
        )
    }

    /// Attaches the operation that failed.
    #[must_use]
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation.get_or_insert(operation);
        self
    }

    /// Attaches the HTTP status of the failing response.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Appends context to the message.
    #[must_use]
    pub fn with_context(mut self, context: impl fmt::Display) -> Self {
        self.message = format!("{} ({context})", self.message);
        self
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the detail message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the remote error code, if the remote supplied one.
    #[must_use]
    pub fn remote_code(&self) -> Option<&str> {
        self.remote_code.as_deref()
    }

    /// Returns the HTTP status, if a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the underlying transport failure kind, if any.
    #[must_use]
    pub const fn transport(&self) -> Option<TransportErrorKind> {
        self.transport
    }

    /// Returns the operation that failed, if known.
    #[must_use]
    pub const fn operation(&self) -> Option<Operation> {
        self.operation
    }

    /// Reports whether the failure leaves the remote outcome unknown.
    ///
    /// Only genuine transport timeouts and connection failures qualify. A
    /// caller deadline that expired before a send does not.
    #[must_use]
    pub fn is_timeout_class(&self) -> bool {
        self.transport
            .is_some_and(TransportErrorKind::is_timeout_class)
    }

    /// Reports whether the failure is an authentication failure.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        self.kind.is_auth()
    }
}

impl From<Interrupted> for ClientError {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Cancelled => Self::new(ErrorKind::Cancelled, interrupted.to_string()),
            Interrupted::DeadlineExceeded => Self::new(ErrorKind::Timeout, interrupted.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_maps_auth_sub_kinds() {
        let fault = RemoteFault {
            status: 401,
            code: Some("invalid_api_key".to_owned()),
            message: "Invalid API key".to_owned(),
            auth: Some(AuthFailure::InvalidCredential),
        };
        let error = ClientError::from_fault(fault);
        assert_eq!(error.kind(), ErrorKind::InvalidCredential);
        assert_eq!(error.remote_code(), Some("invalid_api_key"));
        assert_eq!(error.status(), Some(401));
        assert!(error.is_auth_failure());
        assert_eq!(error.to_string(), "invalid credential: Invalid API key");
    }

    #[test]
    fn non_auth_fault_is_remote_rejected() {
        let fault = RemoteFault {
            status: 500,
            code: None,
            message: "upgrade failed".to_owned(),
            auth: None,
        };
        assert_eq!(ClientError::from_fault(fault).kind(), ErrorKind::RemoteRejected);
    }

    #[test]
    fn transport_kinds_keep_timeout_class() {
        let reset = ClientError::from_transport(TransportErrorKind::ConnectionReset, "reset");
        assert_eq!(reset.kind(), ErrorKind::ConnectionFailed);
        assert!(reset.is_timeout_class());

        let malformed = ClientError::from_transport(TransportErrorKind::MalformedBody, "html");
        assert_eq!(malformed.kind(), ErrorKind::MalformedRemoteResponse);
        assert!(!malformed.is_timeout_class());
    }

    #[test]
    fn expired_deadline_is_a_timeout_outside_the_timeout_class() {
        let error = ClientError::from(Interrupted::DeadlineExceeded);
        assert_eq!(error.kind(), ErrorKind::Timeout);
        assert!(!error.is_timeout_class());
        assert_eq!(
            ClientError::from(Interrupted::Cancelled).kind(),
            ErrorKind::Cancelled
        );
    }

    #[test]
    fn exit_codes_are_distinct() {
        let kinds = [
            ErrorKind::InvalidCredential,
            ErrorKind::InsufficientPermission,
            ErrorKind::AgentNotInstalled,
            ErrorKind::ConnectionFailed,
            ErrorKind::Timeout,
            ErrorKind::RateLimited,
            ErrorKind::MalformedRemoteResponse,
            ErrorKind::RemoteRejected,
            ErrorKind::UpdateUncertain,
            ErrorKind::Cancelled,
            ErrorKind::Unknown,
        ];
        let mut codes: Vec<_> = kinds.iter().map(|kind| kind.exit_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
        assert!(codes.iter().all(|code| *code != 0 && *code != 1));
    }

    #[test]
    fn serialises_without_empty_fields() {
        let error = ClientError::agent_not_installed().with_operation(Operation::GetStatus);
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["kind"], "agent_not_installed");
        assert_eq!(value["operation"], "get-status");
        assert!(value.get("status").is_none());
    }
}
