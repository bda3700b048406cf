use serde::Serialize;
use serde_json::Value;
use wire::Operation;

use crate::error::{ClientError, ErrorKind};
use crate::inventory::UpdateKind;

/// One software component an update targets.
///
/// The version before the call is captured first so a timed-out update can be
/// verified against it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct UpdateItem {
    /// What is updated.
    pub kind: UpdateKind,
    /// Plugin file or slug, theme stylesheet, or `core`.
    pub identifier: String,
    /// Installed version before the update, when it could be observed.
    pub version_before: Option<String>,
}

/// What a post-timeout re-check observed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct VerificationResult {
    /// Whether the re-check proves the mutation took effect.
    pub updated: bool,
    /// Observed value before the call: a version, a state or a count.
    pub version_before: Option<String>,
    /// Observed value after the verification delay.
    pub version_after: Option<String>,
    /// Whether the observed value equals the expected one, when one is known.
    pub matched_expectation: Option<bool>,
}

/// A mutation that completed, possibly confirmed only after a timeout.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MutationSuccess {
    /// Operation performed.
    pub operation: Operation,
    /// What the operation acted on.
    pub target: String,
    /// Human-readable summary.
    pub message: String,
    /// Set when the transport failed and a re-check proved completion.
    pub verified_after_timeout: bool,
    /// Re-check details for verified outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationResult>,
    /// Payload returned by the remote, `null` when none was received.
    pub payload: Value,
    /// Set when the generic REST surface performed the update.
    pub via_rest_fallback: bool,
}

/// A mutation whose request failed in a way that does not prove it did not run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UncertainMutation {
    /// Operation attempted.
    pub operation: Operation,
    /// What the operation acted on.
    pub target: String,
    /// Human-readable summary.
    pub message: String,
    /// The timeout-class failure that left the outcome open.
    pub cause: ClientError,
    /// Re-check details, when a re-check ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationResult>,
}

/// Final state of one mutation.
///
/// `Uncertain` is neither success nor failure: the remote may
/// still be completing the work.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MutationOutcome {
    /// The mutation completed.
    Success(MutationSuccess),
    /// The outcome could not be determined.
    Uncertain(UncertainMutation),
    /// The mutation failed.
    Failed(ClientError),
}

impl MutationOutcome {
    /// Reports whether the mutation completed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Reports whether the outcome is pending.
    #[must_use]
    pub const fn is_uncertain(&self) -> bool {
        matches!(self, Self::Uncertain(_))
    }

    /// Returns the human-readable summary.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Success(success) => &success.message,
            Self::Uncertain(uncertain) => &uncertain.message,
            Self::Failed(error) => error.message(),
        }
    }

    /// Returns the process exit code for this outcome.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Success(_) => 0,
            Self::Uncertain(_) => ErrorKind::UpdateUncertain.exit_code(),
            Self::Failed(error) => error.kind().exit_code(),
        }
    }

    /// Converts into a `Result`, mapping `Uncertain` to
    /// [`ErrorKind::UpdateUncertain`].
    pub fn into_result(self) -> Result<MutationSuccess, ClientError> {
        match self {
            Self::Success(success) => Ok(success),
            Self::Uncertain(uncertain) => Err(ClientError::new(
                ErrorKind::UpdateUncertain,
                uncertain.message,
            )
            .with_operation(uncertain.operation)),
            Self::Failed(error) => Err(error),
        }
    }
}
