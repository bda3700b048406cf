//! Authenticated request construction and the HTTP backend seam.
//!
//! [`Transport`] turns a namespace, path and parameters into an
//! [`HttpRequest`] carrying the site's credentials, then hands it to an
//! [`HttpBackend`]. Production code uses [`ReqwestBackend`]; tests substitute
//! a scripted backend.

mod reqwest_backend;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use url::Url;
use wire::{
    CLIENT_ID_HEADER, FailureKind, Method, Namespace, NamespaceLayout, RawResponse, SendFailure,
};

use crate::config::{ClientConfig, SiteCredential};

pub use self::reqwest_backend::ReqwestBackend;

/// A fully built request ready to be executed.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including query parameters.
    pub url: Url,
    /// Namespace the request targets.
    pub namespace: Namespace,
    /// Operation path below the namespace prefix.
    pub path: String,
    /// Header name/value pairs, in insertion order.
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Total time allowed for the exchange.
    pub timeout: Duration,
}

impl HttpRequest {
    /// Returns the first header named `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the decoded query parameters.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect()
    }
}

/// Executes requests on the wire.
///
/// Implementations must map every failure to a [`SendFailure`]; they never
/// panic on network errors.
pub trait HttpBackend: Send + Sync + fmt::Debug {
    /// Sends `request` and returns the raw response.
    fn execute(&self, request: &HttpRequest) -> Result<RawResponse, SendFailure>;
}

/// Builds authenticated requests for one site.
#[derive(Debug)]
pub(crate) struct Transport {
    credential: SiteCredential,
    layout: NamespaceLayout,
    user_agent: String,
    client_id: String,
    read_timeout: Duration,
    backend: Arc<dyn HttpBackend>,
}

impl Transport {
    pub(crate) fn new(
        credential: SiteCredential,
        config: &ClientConfig,
        backend: Arc<dyn HttpBackend>,
    ) -> Self {
        Self {
            credential,
            layout: config.layout().clone(),
            user_agent: config.user_agent().to_owned(),
            client_id: config.client_id().to_owned(),
            read_timeout: config.read_timeout(),
            backend,
        }
    }

    pub(crate) const fn credential(&self) -> &SiteCredential {
        &self.credential
    }

    /// Builds the request for `path` below `namespace`.
    ///
    /// Agent namespaces receive both API-key headers because the remote may
    /// run either generation. The REST surface receives a bearer token.
    pub(crate) fn build(
        &self,
        namespace: Namespace,
        path: &str,
        method: Method,
        query: &[(String, String)],
        body: Option<&Value>,
        timeout_override: Option<Duration>,
    ) -> Result<HttpRequest, SendFailure> {
        let relative = self.layout.relative_path(namespace, path);
        let mut url = self.credential.base_url().join(&relative).map_err(|error| {
            SendFailure::new(
                FailureKind::ConnectionFailed,
                format!("cannot build request URL for '{relative}': {error}"),
            )
        })?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        let api_key = self.credential.api_key();
        let mut headers = vec![
            ("Accept".to_owned(), "application/json".to_owned()),
            ("User-Agent".to_owned(), self.user_agent.clone()),
        ];
        if namespace.is_agent() {
            headers.extend(
                namespace
                    .key_headers()
                    .iter()
                    .map(|name| ((*name).to_owned(), api_key.to_owned())),
            );
            headers.push((CLIENT_ID_HEADER.to_owned(), self.client_id.clone()));
        } else {
            headers.push(("Authorization".to_owned(), format!("Bearer {api_key}")));
        }
        if body.is_some() {
            headers.push(("Content-Type".to_owned(), "application/json".to_owned()));
        }

        Ok(HttpRequest {
            method,
            url,
            namespace,
            path: path.trim_matches('/').to_owned(),
            headers,
            body: body.cloned(),
            timeout: timeout_override.unwrap_or(self.read_timeout),
        })
    }

    /// Builds and executes one request.
    pub(crate) fn send(
        &self,
        namespace: Namespace,
        path: &str,
        method: Method,
        query: &[(String, String)],
        body: Option<&Value>,
        timeout_override: Option<Duration>,
    ) -> Result<RawResponse, SendFailure> {
        let request = self.build(namespace, path, method, query, body, timeout_override)?;
        let started = Instant::now();
        let result = self.backend.execute(&request);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(response) => {
                logging::trace_transport!(
                    method = %request.method,
                    namespace = %namespace,
                    path = %request.path,
                    status = response.status(),
                    elapsed_ms,
                    "response received"
                );
            }
            Err(failure) => {
                logging::trace_transport!(
                    method = %request.method,
                    namespace = %namespace,
                    path = %request.path,
                    failure = %failure.kind(),
                    elapsed_ms,
                    "request failed"
                );
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wire::{LEGACY_KEY_HEADER, PRIMARY_KEY_HEADER};

    #[derive(Debug)]
    struct Unreachable;

    impl HttpBackend for Unreachable {
        fn execute(&self, _request: &HttpRequest) -> Result<RawResponse, SendFailure> {
            Err(SendFailure::new(FailureKind::ConnectionFailed, "unreachable"))
        }
    }

    fn transport() -> Transport {
        let credential = SiteCredential::new("https://example.test/site", "k3y").unwrap();
        Transport::new(credential, &ClientConfig::default(), Arc::new(Unreachable))
    }

    #[test]
    fn agent_requests_carry_both_key_headers() {
        let request = transport()
            .build(Namespace::Current, "status", Method::Get, &[], None, None)
            .unwrap();
        assert_eq!(
            request.url.as_str(),
            "https://example.test/site/wp-json/site-agent/v2/status"
        );
        assert_eq!(request.header(PRIMARY_KEY_HEADER), Some("k3y"));
        assert_eq!(request.header(LEGACY_KEY_HEADER), Some("k3y"));
        assert_eq!(request.header(CLIENT_ID_HEADER), Some("sitewarden"));
        assert_eq!(request.header("authorization"), None);
        assert_eq!(request.header("content-type"), None);
        assert_eq!(request.timeout, Duration::from_secs(30));
    }

    #[test]
    fn rest_requests_use_bearer_token() {
        let body = json!({"action": "update"});
        let request = transport()
            .build(
                Namespace::Rest,
                "plugins/akismet/akismet",
                Method::Post,
                &[],
                Some(&body),
                Some(Duration::from_secs(240)),
            )
            .unwrap();
        assert_eq!(
            request.url.path(),
            "/site/wp-json/wp/v2/plugins/akismet/akismet"
        );
        assert_eq!(request.header("Authorization"), Some("Bearer k3y"));
        assert_eq!(request.header(PRIMARY_KEY_HEADER), None);
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.body, Some(body));
        assert_eq!(request.timeout, Duration::from_secs(240));
    }

    #[test]
    fn query_parameters_are_encoded() {
        let query = vec![("status".to_owned(), "spam & trash".to_owned())];
        let request = transport()
            .build(Namespace::Legacy, "get-comments", Method::Get, &query, None, None)
            .unwrap();
        assert_eq!(request.query_pairs(), query);
        assert!(request.url.as_str().contains("status=spam+%26+trash"));
    }

    #[test]
    fn send_reports_backend_failures() {
        let failure = transport()
            .send(Namespace::Current, "status", Method::Get, &[], None, None)
            .unwrap_err();
        assert_eq!(failure.kind(), FailureKind::ConnectionFailed);
    }
}
