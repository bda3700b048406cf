//! Conversion of raw responses and send failures into outcome kinds.
//!
//! Every response passes through [`classify`] before any caller sees it. The
//! rules are applied in a fixed priority order:
//!
//! 1. network failure
//! 2. HTML document (by content type or leading byte), whatever the status
//! 3. body not parseable as JSON
//! 4. HTTP 429
//! 5. HTTP 404, or an error code meaning "route not recognised"
//! 6. HTTP 401/403, or an error code meaning invalid/insufficient credentials
//! 7. 2xx
//!
//! A 404 carrying an application error code (for example an unknown plugin)
//! proves the route exists, so it is reported as a remote error rather than as
//! an unsupported route. A 404 carrying an authentication code stays an
//! unsupported route but remembers the hint so the negotiator can give
//! authentication failures precedence.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::response::{FailureKind, RawResponse, SendFailure};

/// Transport-level failure kinds surfaced to callers.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// The request timed out.
    Timeout,
    /// No connection could be established.
    ConnectionFailed,
    /// The connection dropped mid-request.
    ConnectionReset,
    /// The remote answered with something that is not API output.
    MalformedBody,
    /// The remote is rate limiting the caller.
    RateLimited,
}

impl TransportErrorKind {
    /// Reports whether the failure leaves the remote outcome unknown.
    ///
    /// A request that timed out or lost its connection may still have been
    /// executed by the remote side.
    #[must_use]
    pub const fn is_timeout_class(self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ConnectionFailed | Self::ConnectionReset
        )
    }

    /// Returns a short label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionFailed => "connection failed",
            Self::ConnectionReset => "connection reset",
            Self::MalformedBody => "malformed body",
            Self::RateLimited => "rate limited",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<FailureKind> for TransportErrorKind {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Timeout => Self::Timeout,
            FailureKind::ConnectionFailed => Self::ConnectionFailed,
            FailureKind::ConnectionReset => Self::ConnectionReset,
        }
    }
}

/// Authentication sub-kind of a remote error.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailure {
    /// The key is missing, unknown or revoked.
    InvalidCredential,
    /// The key is valid but lacks the rights for the operation.
    InsufficientPermission,
}

/// Structured error reported by the remote side.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemoteFault {
    /// HTTP status of the response.
    pub status: u16,
    /// Error code from the payload, lowercased.
    pub code: Option<String>,
    /// Human-readable message from the payload or a status-derived fallback.
    pub message: String,
    /// Set when the error is an authentication failure.
    pub auth: Option<AuthFailure>,
}

/// Result of classifying one response.
#[derive(Clone, Debug, PartialEq)]
pub enum Classification {
    /// The call succeeded; the payload has any success envelope removed.
    Success(Value),
    /// The remote rejected the call with a structured error.
    RemoteError(RemoteFault),
    /// The call failed below the application level.
    Transport {
        /// Failure kind.
        kind: TransportErrorKind,
        /// Human-readable detail.
        detail: String,
    },
    /// The namespace does not serve this route. Consumed by the negotiator.
    RouteUnsupported {
        /// HTTP status of the response.
        status: u16,
        /// Error code from the payload, if any.
        code: Option<String>,
        /// Authentication failure signalled alongside the missing route.
        auth_hint: Option<AuthFailure>,
    },
}

impl Classification {
    /// Reports whether this is [`Classification::RouteUnsupported`].
    #[must_use]
    pub const fn is_route_unsupported(&self) -> bool {
        matches!(self, Self::RouteUnsupported { .. })
    }

    /// Returns the authentication failure carried by the classification, if any.
    #[must_use]
    pub fn auth_failure(&self) -> Option<AuthFailure> {
        match self {
            Self::RemoteError(fault) => fault.auth,
            Self::RouteUnsupported { auth_hint, .. } => *auth_hint,
            Self::Success(_) | Self::Transport { .. } => None,
        }
    }

    /// Returns the transport failure kind, if any.
    #[must_use]
    pub const fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            Self::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

const ROUTE_CODES: &[&str] = &[
    "rest_no_route",
    "rest_route_not_found",
    "route_not_found",
    "no_route",
    "invalid_route",
    "endpoint_not_found",
];

const INVALID_CREDENTIAL_CODES: &[&str] = &[
    "invalid_api_key",
    "invalid_key",
    "missing_api_key",
    "api_key_missing",
    "unauthorized",
    "authentication_failed",
    "rest_not_logged_in",
    "invalid_token",
];

const INSUFFICIENT_PERMISSION_CODES: &[&str] = &[
    "insufficient_permissions",
    "insufficient_permission",
    "forbidden",
    "rest_forbidden",
    "permission_denied",
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum CodeClass {
    Route,
    Auth(AuthFailure),
    Other,
}

fn classify_code(code: &str) -> CodeClass {
    if ROUTE_CODES.contains(&code) {
        CodeClass::Route
    } else if INVALID_CREDENTIAL_CODES.contains(&code) {
        CodeClass::Auth(AuthFailure::InvalidCredential)
    } else if INSUFFICIENT_PERMISSION_CODES.contains(&code) || code.starts_with("rest_cannot_") {
        CodeClass::Auth(AuthFailure::InsufficientPermission)
    } else {
        CodeClass::Other
    }
}

/// Classifies the result of one send.
#[must_use]
pub fn classify(result: Result<RawResponse, SendFailure>) -> Classification {
    let response = match result {
        Ok(response) => response,
        Err(failure) => {
            return Classification::Transport {
                kind: failure.kind().into(),
                detail: failure.detail().to_owned(),
            };
        }
    };
    let status = response.status();

    if response.looks_like_html() {
        return Classification::Transport {
            kind: TransportErrorKind::MalformedBody,
            detail: format!("remote returned an HTML page instead of API output (HTTP {status})"),
        };
    }

    let payload = match response.parse_json() {
        Ok(payload) => payload,
        Err(error) => {
            return Classification::Transport {
                kind: TransportErrorKind::MalformedBody,
                detail: format!("response body is not valid JSON (HTTP {status}): {error}"),
            };
        }
    };

    if status == 429 {
        return Classification::Transport {
            kind: TransportErrorKind::RateLimited,
            detail: "remote rate limit exceeded (HTTP 429)".to_owned(),
        };
    }

    let fields = ErrorFields::extract(&payload);
    let code_class = fields.code.as_deref().map(classify_code);

    if status == 404 {
        return match code_class {
            Some(CodeClass::Other) => Classification::RemoteError(fields.into_fault(status, None)),
            Some(CodeClass::Auth(auth)) => Classification::RouteUnsupported {
                status,
                code: fields.code,
                auth_hint: Some(auth),
            },
            Some(CodeClass::Route) | None => Classification::RouteUnsupported {
                status,
                code: fields.code,
                auth_hint: None,
            },
        };
    }

    match code_class {
        Some(CodeClass::Route) => {
            return Classification::RouteUnsupported {
                status,
                code: fields.code,
                auth_hint: None,
            };
        }
        Some(CodeClass::Auth(auth)) => {
            return Classification::RemoteError(fields.into_fault(status, Some(auth)));
        }
        Some(CodeClass::Other) | None => {}
    }

    if response.is_success() && !envelope_reports_failure(&payload) {
        return Classification::Success(unwrap_envelope(payload));
    }

    let auth = match status {
        401 => Some(AuthFailure::InvalidCredential),
        403 => Some(AuthFailure::InsufficientPermission),
        _ => None,
    };
    Classification::RemoteError(fields.into_fault(status, auth))
}

fn envelope_reports_failure(payload: &Value) -> bool {
    payload.get("success").and_then(Value::as_bool) == Some(false)
}

fn unwrap_envelope(payload: Value) -> Value {
    match payload {
        Value::Object(mut object)
            if object.get("success").and_then(Value::as_bool) == Some(true)
                && object.contains_key("data") =>
        {
            object.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Error code and message pulled out of the several payload layouts in use.
#[derive(Debug, Default)]
struct ErrorFields {
    code: Option<String>,
    message: Option<String>,
}

impl ErrorFields {
    fn extract(payload: &Value) -> Self {
        let Some(object) = payload.as_object() else {
            return Self::default();
        };
        let nested = object.get("error").and_then(Value::as_object);
        let data = object.get("data").and_then(Value::as_object);

        let code = string_field(object, "code")
            .or_else(|| string_field(object, "error_code"))
            .or_else(|| nested.and_then(|error| string_field(error, "code")))
            .or_else(|| {
                object
                    .get("error")
                    .and_then(Value::as_str)
                    .filter(|text| looks_like_code(text))
            })
            .map(str::to_ascii_lowercase);

        let message = string_field(object, "message")
            .or_else(|| nested.and_then(|error| string_field(error, "message")))
            .or_else(|| {
                object
                    .get("error")
                    .and_then(Value::as_str)
                    .filter(|text| !looks_like_code(text))
            })
            .or_else(|| data.and_then(|data| string_field(data, "message")))
            .map(str::to_owned);

        Self { code, message }
    }

    fn into_fault(self, status: u16, auth: Option<AuthFailure>) -> RemoteFault {
        let message = self.message.unwrap_or_else(|| match &self.code {
            Some(code) => format!("remote error {code} (HTTP {status})"),
            None => format!("remote error (HTTP {status})"),
        });
        RemoteFault {
            status,
            code: self.code,
            message,
            auth,
        }
    }
}

fn string_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn looks_like_code(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}
