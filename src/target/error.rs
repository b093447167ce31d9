//! Error types for the target adapter.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::ess::EssError;
use crate::fleet::FleetError;
use crate::nodes::NodePoolError;
use crate::poller::PollError;
use crate::scale_in::ScaleInError;

/// Coarse classification of adapter failures, for callers that branch on
/// the failure class rather than the message.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// Configuration is missing or unusable.
    ConfigInvalid,
    /// A scaling group or activity did not resolve to exactly one record.
    NotFound,
    /// An activity did not complete within the check budget.
    Timeout,
    /// Node selection or draining failed; nothing was deleted.
    PreScaleInFailed,
    /// The remote API or its transport failed.
    RemoteApi,
    /// The caller cancelled the invocation.
    Cancelled,
    /// Post-removal hooks failed after instances were deleted.
    PostScaleInFailed,
    /// The node pool readiness check failed.
    NodePool,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ConfigInvalid => "config_invalid",
            Self::NotFound => "not_found",
            Self::Timeout => "timeout",
            Self::PreScaleInFailed => "pre_scale_in_failed",
            Self::RemoteApi => "remote_api",
            Self::Cancelled => "cancelled",
            Self::PostScaleInFailed => "post_scale_in_failed",
            Self::NodePool => "node_pool",
        };
        f.write_str(label)
    }
}

/// Errors surfaced while scaling a group out.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ScaleOutError {
    /// Raised when the capacity change request fails.
    #[error("failed to request capacity change: {0}")]
    Resize(#[source] FleetError),
    /// Raised when the capacity change activity does not complete.
    #[error("failed to confirm capacity change: {0}")]
    Confirm(#[source] PollError<FleetError>),
}

/// Errors surfaced by [`crate::target::TargetAdapter`].
#[derive(Debug, Error)]
pub enum TargetError {
    /// Raised when plugin or per-call configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Raised when a requested count cannot be expressed to the remote API.
    #[error("requested count {count} is outside the supported range")]
    CountOutOfRange {
        /// Count requested by the caller.
        count: i64,
    },
    /// Raised when the ESS client cannot be built.
    #[error("failed to build ESS client: {0}")]
    Client(#[source] EssError),
    /// Raised when reading the scaling group fails.
    #[error("failed to describe scaling group {group}: {source}")]
    Describe {
        /// Scaling group that was targeted.
        group: String,
        /// Underlying fleet error.
        #[source]
        source: FleetError,
    },
    /// Raised when scaling out fails.
    #[error("failed to scale out {group}: {source}")]
    ScaleOut {
        /// Scaling group that was targeted.
        group: String,
        /// Step that failed.
        #[source]
        source: ScaleOutError,
    },
    /// Raised when scaling in fails.
    #[error("failed to scale in {group}: {source}")]
    ScaleIn {
        /// Scaling group that was targeted.
        group: String,
        /// Step that failed.
        #[source]
        source: ScaleInError,
    },
    /// Raised when the node pool readiness check fails.
    #[error("failed to check node pool readiness: {0}")]
    Readiness(#[source] NodePoolError),
}

const fn fleet_kind(err: &FleetError) -> ErrorKind {
    match err {
        FleetError::NotFound { .. } => ErrorKind::NotFound,
        FleetError::Remote { .. } => ErrorKind::RemoteApi,
        FleetError::Cancelled => ErrorKind::Cancelled,
    }
}

const fn poll_kind(err: &PollError<FleetError>) -> ErrorKind {
    match err {
        PollError::Timeout { .. } => ErrorKind::Timeout,
        PollError::Cancelled { .. } => ErrorKind::Cancelled,
        PollError::Check(source) => fleet_kind(source),
    }
}

impl TargetError {
    /// Classifies the failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::CountOutOfRange { .. } => ErrorKind::ConfigInvalid,
            Self::Client(_) => ErrorKind::RemoteApi,
            Self::Describe { source, .. } => fleet_kind(source),
            Self::ScaleOut { source, .. } => match source {
                ScaleOutError::Resize(err) => fleet_kind(err),
                ScaleOutError::Confirm(err) => poll_kind(err),
            },
            Self::ScaleIn { source, .. } => match source {
                ScaleInError::ListInstances(err) | ScaleInError::DeleteInstances(err) => {
                    fleet_kind(err)
                }
                ScaleInError::PreScaleIn(_) | ScaleInError::InvalidSelection { .. } => {
                    ErrorKind::PreScaleInFailed
                }
                ScaleInError::Confirm(err) => poll_kind(err),
                ScaleInError::PostScaleIn(_) => ErrorKind::PostScaleInFailed,
                ScaleInError::Cancelled { .. } => ErrorKind::Cancelled,
            },
            Self::Readiness(_) => ErrorKind::NodePool,
        }
    }
}
