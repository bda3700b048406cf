//! Scripted HTTP backend and a ready-made client harness for tests.
//!
//! [`ScriptedBackend`] answers each `(namespace, path)` route from a queue of
//! [`Reply`] values. The last reply of a queue repeats, so a single scripted
//! answer serves every request to that route. Unscripted routes answer the
//! way a site without the agent does: HTTP 404 with `rest_no_route`. Every
//! request is recorded for later inspection.
//!
//! When built with a [`ManualClock`], the backend advances the clock by its
//! configured latency on every request and by the request's full timeout when
//! replying with a timeout, so pacing and verification delays stay
//! observable without real waiting.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use pacing::{Clock, ManualClock};
use serde_json::{Value, json};
use wire::{FailureKind, Method, Namespace, RawResponse, SendFailure};

use crate::client::SiteClient;
use crate::config::{ClientConfig, SiteCredential};
use crate::transport::{HttpBackend, HttpRequest};

/// Base URL used by [`Harness`].
pub const TEST_BASE_URL: &str = "https://example.test/";
/// API key used by [`Harness`].
pub const TEST_API_KEY: &str = "test-key";

type Responder = dyn Fn(&HttpRequest) -> Result<RawResponse, SendFailure> + Send + Sync;

/// One scripted answer.
#[derive(Clone)]
pub enum Reply {
    /// Answer with a response.
    Respond(RawResponse),
    /// Fail at the transport level.
    Fail(SendFailure),
    /// Compute the answer from the request, possibly touching shared state.
    Dynamic(Arc<Responder>),
}

impl Reply {
    /// JSON response with `status`.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self::Respond(RawResponse::json(status, &body))
    }

    /// HTTP 200 JSON response.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    /// HTML page with `status`.
    #[must_use]
    pub fn html(status: u16, body: &str) -> Self {
        Self::Respond(RawResponse::html(status, body))
    }

    /// HTTP 429 with a JSON body.
    #[must_use]
    pub fn rate_limited() -> Self {
        Self::json(
            429,
            json!({"code": "rate_limited", "message": "Too many requests"}),
        )
    }

    /// Transport timeout.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Fail(SendFailure::timeout("operation timed out"))
    }

    /// Connection refused.
    #[must_use]
    pub fn connection_failed() -> Self {
        Self::Fail(SendFailure::new(
            FailureKind::ConnectionFailed,
            "connection refused",
        ))
    }

    /// Connection reset mid-request.
    #[must_use]
    pub fn connection_reset() -> Self {
        Self::Fail(SendFailure::new(
            FailureKind::ConnectionReset,
            "connection reset by peer",
        ))
    }

    /// Answer computed by `responder` for each request.
    #[must_use]
    pub fn dynamic<F>(responder: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<RawResponse, SendFailure> + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(responder))
    }

    fn answer(&self, request: &HttpRequest) -> Result<RawResponse, SendFailure> {
        match self {
            Self::Respond(response) => Ok(response.clone()),
            Self::Fail(failure) => Err(failure.clone()),
            Self::Dynamic(responder) => responder(request),
        }
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Respond(response) => f.debug_tuple("Respond").field(&response.status()).finish(),
            Self::Fail(failure) => f.debug_tuple("Fail").field(&failure.kind()).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// A request as seen by the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedRequest {
    /// Namespace targeted.
    pub namespace: Namespace,
    /// Path below the namespace prefix.
    pub path: String,
    /// HTTP method.
    pub method: Method,
    /// Decoded query parameters.
    pub query: Vec<(String, String)>,
    /// Headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Timeout the request was sent with.
    pub timeout: Duration,
    /// Instant the backend received the request.
    pub sent_at: Instant,
}

impl RecordedRequest {
    /// Returns the first header named `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug)]
struct Route {
    namespace: Namespace,
    path: String,
    method: Option<Method>,
    replies: VecDeque<Reply>,
}

impl Route {
    fn matches(&self, request: &HttpRequest) -> bool {
        self.namespace == request.namespace
            && self.path == request.path
            && self.method.is_none_or(|method| method == request.method)
    }

    fn next_reply(&mut self) -> Option<Reply> {
        if self.replies.len() > 1 {
            self.replies.pop_front()
        } else {
            self.replies.front().cloned()
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    routes: Vec<Route>,
    requests: Vec<RecordedRequest>,
}

/// Fake [`HttpBackend`] replaying scripted replies.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    clock: Option<Arc<ManualClock>>,
    latency: Duration,
    script: Mutex<Script>,
}

impl ScriptedBackend {
    /// Creates a backend that does not touch any clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that advances `clock` by `latency` per request.
    #[must_use]
    pub fn with_clock(clock: Arc<ManualClock>, latency: Duration) -> Self {
        Self {
            clock: Some(clock),
            latency,
            script: Mutex::new(Script::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `reply` to the queue of `(namespace, path)` for any method.
    pub fn on(&self, namespace: Namespace, path: &str, reply: Reply) -> &Self {
        self.push(namespace, path, None, reply)
    }

    /// Appends `reply` to the queue of `(namespace, path)` for `method` only.
    ///
    /// Method-specific routes are consulted before method-agnostic ones.
    pub fn on_method(&self, namespace: Namespace, path: &str, method: Method, reply: Reply) -> &Self {
        self.push(namespace, path, Some(method), reply)
    }

    fn push(&self, namespace: Namespace, path: &str, method: Option<Method>, reply: Reply) -> &Self {
        let path = path.trim_matches('/');
        let mut script = self.lock();
        if let Some(route) = script
            .routes
            .iter_mut()
            .find(|route| route.namespace == namespace && route.path == path && route.method == method)
        {
            route.replies.push_back(reply);
        } else {
            script.routes.push(Route {
                namespace,
                path: path.to_owned(),
                method,
                replies: VecDeque::from([reply]),
            });
        }
        self
    }

    /// Returns every request received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Returns the requests sent to `(namespace, path)`.
    #[must_use]
    pub fn requests_to(&self, namespace: Namespace, path: &str) -> Vec<RecordedRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|request| request.namespace == namespace && request.path == path)
            .cloned()
            .collect()
    }

    /// Returns the number of requests received so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.lock().requests.len()
    }

    fn route_reply(script: &mut Script, request: &HttpRequest) -> Option<Reply> {
        let position = script
            .routes
            .iter()
            .position(|route| route.method.is_some() && route.matches(request))
            .or_else(|| script.routes.iter().position(|route| route.matches(request)))?;
        script.routes[position].next_reply()
    }
}

impl HttpBackend for ScriptedBackend {
    fn execute(&self, request: &HttpRequest) -> Result<RawResponse, SendFailure> {
        let sent_at = self
            .clock
            .as_ref()
            .map_or_else(Instant::now, |clock| clock.now());
        let reply = {
            let mut script = self.lock();
            script.requests.push(RecordedRequest {
                namespace: request.namespace,
                path: request.path.clone(),
                method: request.method,
                query: request.query_pairs(),
                headers: request.headers.clone(),
                body: request.body.clone(),
                timeout: request.timeout,
                sent_at,
            });
            Self::route_reply(&mut script, request)
        };

        let result = match reply {
            Some(reply) => reply.answer(request),
            None => Ok(RawResponse::json(
                404,
                &json!({
                    "code": "rest_no_route",
                    "message": "No route was found matching the URL and request method.",
                    "data": {"status": 404}
                }),
            )),
        };

        if let Some(clock) = &self.clock {
            match &result {
                Err(failure) if failure.kind() == FailureKind::Timeout => {
                    clock.advance(request.timeout);
                }
                _ => clock.advance(self.latency),
            }
        }
        result
    }
}

/// A [`SiteClient`] wired to a [`ScriptedBackend`] and a [`ManualClock`].
#[derive(Debug)]
pub struct Harness {
    /// Client under test.
    pub client: SiteClient,
    /// Backend receiving the client's requests.
    pub backend: Arc<ScriptedBackend>,
    /// Clock shared by the client and the backend.
    pub clock: Arc<ManualClock>,
}

impl Harness {
    /// Creates a harness with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a harness with `config`.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let clock = Arc::new(ManualClock::new());
        let backend = Arc::new(ScriptedBackend::with_clock(clock.clone(), Duration::ZERO));
        let credential = match SiteCredential::new(TEST_BASE_URL, TEST_API_KEY) {
            Ok(credential) => credential,
            Err(error) => panic!("test credential must be valid: {error}"),
        };
        let client = SiteClient::with_parts(credential, config, backend.clone(), clock.clone());
        Self {
            client,
            backend,
            clock,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
