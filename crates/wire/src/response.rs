use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Body and metadata of an HTTP response, before classification.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawResponse {
    status: u16,
    content_type: Option<String>,
    body: Vec<u8>,
}

impl RawResponse {
    /// Wraps a received response.
    #[must_use]
    pub fn new(status: u16, content_type: Option<String>, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }

    /// Builds a JSON response, mainly for fakes and tests.
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(
            status,
            Some("application/json; charset=UTF-8".to_owned()),
            body.to_string().into_bytes(),
        )
    }

    /// Builds an HTML response such as a server error page.
    #[must_use]
    pub fn html(status: u16, body: &str) -> Self {
        Self::new(
            status,
            Some("text/html; charset=UTF-8".to_owned()),
            body.as_bytes().to_vec(),
        )
    }

    /// Builds a response with an arbitrary content type and text body.
    #[must_use]
    pub fn text(status: u16, content_type: &str, body: &str) -> Self {
        Self::new(status, Some(content_type.to_owned()), body.as_bytes().to_vec())
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Returns the `Content-Type` header, if the response carried one.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Reports whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Reports whether the response is an HTML document.
    ///
    /// Either the declared content type or the first non-blank byte decides;
    /// misconfigured hosts often serve error pages labelled as JSON.
    #[must_use]
    pub fn looks_like_html(&self) -> bool {
        let declared = self
            .content_type
            .as_deref()
            .is_some_and(|value| value.to_ascii_lowercase().contains("text/html"));
        declared || self.leading_byte() == Some(b'<')
    }

    /// Parses the body as JSON. An empty or blank body parses as `null`.
    pub fn parse_json(&self) -> Result<Value, serde_json::Error> {
        if self.leading_byte().is_none() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(strip_bom(&self.body))
    }

    fn leading_byte(&self) -> Option<u8> {
        strip_bom(&self.body)
            .iter()
            .copied()
            .find(|byte| !byte.is_ascii_whitespace())
    }
}

fn strip_bom(body: &[u8]) -> &[u8] {
    body.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(body)
}

/// Network-level reason a request produced no response.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FailureKind {
    /// The request or the connection attempt timed out.
    Timeout,
    /// The connection could not be established (refused, DNS, TLS).
    ConnectionFailed,
    /// The connection dropped after the request was sent.
    ConnectionReset,
}

impl FailureKind {
    /// Returns a short label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionFailed => "connection failed",
            Self::ConnectionReset => "connection reset",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request that did not produce an HTTP response.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("{kind}: {detail}")]
pub struct SendFailure {
    kind: FailureKind,
    detail: String,
}

impl SendFailure {
    /// Creates a failure with a human-readable detail.
    #[must_use]
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Shorthand for a [`FailureKind::Timeout`] failure.
    #[must_use]
    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, detail)
    }

    /// Returns the failure kind.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the detail text.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn html_detected_by_header_or_leading_byte() {
        assert!(RawResponse::html(500, "<h1>Error</h1>").looks_like_html());
        assert!(RawResponse::text(200, "application/json", "  <!DOCTYPE html>").looks_like_html());
        assert!(!RawResponse::json(200, &json!({"ok": true})).looks_like_html());
    }

    #[test]
    fn blank_body_parses_as_null() {
        let response = RawResponse::text(204, "application/json", " \n");
        assert_eq!(response.parse_json().unwrap(), Value::Null);
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let mut body = vec![0xEF, 0xBB, 0xBF];
        body.extend_from_slice(br#"{"a":1}"#);
        let response = RawResponse::new(200, None, body);
        assert_eq!(response.parse_json().unwrap(), json!({"a": 1}));
    }

    #[test]
    fn send_failure_display_includes_kind() {
        let failure = SendFailure::new(FailureKind::ConnectionReset, "peer hung up");
        assert_eq!(failure.to_string(), "connection reset: peer hung up");
    }
}
