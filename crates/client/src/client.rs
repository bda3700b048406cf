use std::sync::Arc;
use std::time::Duration;

use pacing::{CallContext, Clock, Interrupted, RateGovernor, SystemClock, pause};
use serde::Serialize;
use serde_json::Value;
use wire::{Operation, OperationRequest};

use crate::config::{ClientConfig, ConfigError, SiteCredential};
use crate::dispatch::Dispatcher;
use crate::error::{ClientError, ErrorKind};
use crate::negotiate;
use crate::transport::{HttpBackend, ReqwestBackend, Transport};

#[derive(Debug)]
struct Shared {
    config: ClientConfig,
    dispatcher: Dispatcher,
}

/// Handle to one remote site.
///
/// Construction performs no network activity. Cloning is cheap and every
/// clone, including those returned by [`SiteClient::with_context`], shares the
/// same rate governor, so at most one request is in flight for the site no
/// matter how many handles exist.
#[derive(Clone, Debug)]
pub struct SiteClient {
    shared: Arc<Shared>,
    ctx: CallContext,
}

/// Result of [`SiteClient::validate_credential`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CredentialCheck {
    /// Whether the check succeeded.
    pub valid: bool,
    /// Failure kind when the check failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    /// Failure detail when the check failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SiteClient {
    /// Creates a client for `base_url` using the default configuration.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ConfigError> {
        let credential = SiteCredential::new(base_url, api_key)?;
        Self::with_config(credential, ClientConfig::default())
    }

    /// Creates a client with an explicit configuration and the HTTP backend.
    pub fn with_config(credential: SiteCredential, config: ClientConfig) -> Result<Self, ConfigError> {
        let backend = ReqwestBackend::new(&config)?;
        Ok(Self::with_backend(credential, config, Arc::new(backend)))
    }

    /// Creates a client that sends through `backend`.
    #[must_use]
    pub fn with_backend(
        credential: SiteCredential,
        config: ClientConfig,
        backend: Arc<dyn HttpBackend>,
    ) -> Self {
        Self::with_parts(credential, config, backend, Arc::new(SystemClock))
    }

    /// Creates a client from all of its collaborators.
    #[must_use]
    pub fn with_parts(
        credential: SiteCredential,
        config: ClientConfig,
        backend: Arc<dyn HttpBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let governor = RateGovernor::new(clock, config.min_interval(), config.rate_limit_cooldown());
        let transport = Transport::new(credential, &config, backend);
        Self {
            shared: Arc::new(Shared {
                config,
                dispatcher: Dispatcher::new(transport, governor),
            }),
            ctx: CallContext::none(),
        }
    }

    /// Returns a handle whose calls honour `ctx`.
    #[must_use]
    pub fn with_context(&self, ctx: CallContext) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            ctx,
        }
    }

    /// Returns a handle whose calls must finish within `timeout` from now.
    #[must_use]
    pub fn with_deadline_in(&self, timeout: Duration) -> Self {
        let ctx = self.ctx.clone().with_timeout(self.clock().as_ref(), timeout);
        self.with_context(ctx)
    }

    /// Returns the context attached to this handle.
    #[must_use]
    pub const fn context(&self) -> &CallContext {
        &self.ctx
    }

    /// Returns the site credential.
    #[must_use]
    pub fn credential(&self) -> &SiteCredential {
        self.shared.dispatcher.transport().credential()
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        self.shared.dispatcher.governor().clock()
    }

    /// Performs `request` with endpoint negotiation.
    pub(crate) fn query(&self, request: OperationRequest) -> Result<Value, ClientError> {
        negotiate::negotiate(&self.shared.dispatcher, &self.shared.config, &self.ctx, &request)
    }

    /// Posts `body` to `path` on the generic REST surface.
    pub(crate) fn rest(&self, path: &str, body: &Value, timeout: Duration) -> Result<Value, ClientError> {
        negotiate::rest_call(&self.shared.dispatcher, &self.ctx, path, body, timeout)
    }

    /// Blocks for `duration` while honouring this handle's context.
    pub(crate) fn pause(&self, duration: Duration) -> Result<(), Interrupted> {
        pause(self.clock().as_ref(), duration, &self.ctx)
    }

    /// Checks the credential with the cheapest inventory call.
    ///
    /// Never fails: the outcome of the check is reported in the returned
    /// [`CredentialCheck`].
    #[must_use]
    pub fn validate_credential(&self) -> CredentialCheck {
        match self.query(OperationRequest::new(Operation::GetStatus)) {
            Ok(_) => CredentialCheck {
                valid: true,
                error: None,
                message: None,
            },
            Err(error) => {
                tracing::warn!(
                    target: "sitewarden::inventory",
                    kind = error.kind().as_str(),
                    "credential check failed"
                );
                CredentialCheck {
                    valid: false,
                    error: Some(error.kind()),
                    message: Some(error.message().to_owned()),
                }
            }
        }
    }
}
