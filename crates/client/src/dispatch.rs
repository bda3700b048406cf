//! One paced, classified exchange with the site.
//!
//! The dispatcher is the only caller of the transport. Each attempt goes
//! through the rate governor, so sends are spaced and never overlap, and its
//! result is classified before anyone looks at it. A rate-limited answer
//! triggers one cooldown and one retry; a second rate-limited answer is
//! returned as is.

use std::time::Duration;

use pacing::{CallContext, RateGovernor};
use serde_json::Value;
use wire::{Classification, Method, Namespace, OperationRequest, TransportErrorKind, classify};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::transport::Transport;

/// Route and parameters of one exchange.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Call<'a> {
    pub(crate) namespace: Namespace,
    pub(crate) path: &'a str,
    pub(crate) method: Method,
    pub(crate) query: &'a [(String, String)],
    pub(crate) body: Option<&'a Value>,
    pub(crate) timeout: Duration,
}

impl<'a> Call<'a> {
    /// Routes `request` to `namespace` using the operation's path there.
    pub(crate) fn for_operation(
        namespace: Namespace,
        request: &'a OperationRequest,
        config: &ClientConfig,
    ) -> Self {
        let operation = request.operation();
        let path = match namespace {
            Namespace::Legacy => operation.legacy_path(),
            Namespace::Current | Namespace::Rest => operation.current_path(),
        };
        Self {
            namespace,
            path,
            method: operation.method(),
            query: request.query(),
            body: request.body(),
            timeout: request
                .timeout()
                .unwrap_or_else(|| config.timeout_for(operation.timeout_class())),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Dispatcher {
    transport: Transport,
    governor: RateGovernor,
}

impl Dispatcher {
    pub(crate) const fn new(transport: Transport, governor: RateGovernor) -> Self {
        Self {
            transport,
            governor,
        }
    }

    pub(crate) const fn transport(&self) -> &Transport {
        &self.transport
    }

    pub(crate) const fn governor(&self) -> &RateGovernor {
        &self.governor
    }

    /// Performs `call`, retrying exactly once after a rate-limit cooldown.
    ///
    /// Only cancellation or an expired deadline produce `Err`; every remote or
    /// network outcome is returned as a [`Classification`].
    pub(crate) fn call(
        &self,
        ctx: &CallContext,
        call: Call<'_>,
    ) -> Result<Classification, ClientError> {
        let first = self.attempt(ctx, call)?;
        if first.transport_kind() != Some(TransportErrorKind::RateLimited) {
            return Ok(first);
        }

        self.governor.cool_down(ctx)?;
        logging::trace_pacing!(
            namespace = %call.namespace,
            path = call.path,
            "retrying once after rate-limit cooldown"
        );
        self.attempt(ctx, call)
    }

    fn attempt(&self, ctx: &CallContext, call: Call<'_>) -> Result<Classification, ClientError> {
        let clock = self.governor.clock();
        let (result, _wait) = self.governor.pace(ctx, || {
            let timeout = ctx.clamp(clock.now(), call.timeout);
            self.transport.send(
                call.namespace,
                call.path,
                call.method,
                call.query,
                call.body,
                Some(timeout),
            )
        })?;
        Ok(classify(result))
    }
}
