//! Capability interface for the remote elastic-compute fleet.
//!
//! A [`Fleet`] wraps one cloud's scaling-group API behind five operations.
//! Each operation is a single remote call; retrying completion checks is the
//! job of [`crate::poller::ActivityPoller`], never of the fleet itself.

mod types;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use types::{ActivityId, InstanceId};

/// Identifies one remote scaling group.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ScalingGroupRef {
    /// Region hosting the group (for example `cn-hangzhou`).
    pub region: String,
    /// Provider identifier of the scaling group.
    pub id: String,
}

impl ScalingGroupRef {
    /// Creates a reference, trimming both fields.
    #[must_use]
    pub fn new(region: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            region: region.into().trim().to_owned(),
            id: id.into().trim().to_owned(),
        }
    }
}

impl fmt::Display for ScalingGroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.id)
    }
}

/// Point-in-time view of a scaling group.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GroupStatus {
    /// True when no concurrent mutation is in progress on the group.
    pub stable: bool,
    /// Total capacity currently reported by the provider.
    pub current_count: i32,
}

/// Health reported for a group member.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HealthStatus {
    /// Instance passes provider health checks.
    Healthy,
    /// Instance fails provider health checks.
    Unhealthy,
    /// Any value this crate does not model.
    Other(String),
}

impl From<&str> for HealthStatus {
    fn from(value: &str) -> Self {
        match value {
            "Healthy" => Self::Healthy,
            "Unhealthy" => Self::Unhealthy,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// Lifecycle state of a group member.
///
/// Hook-suspended variants such as `Pending:Wait` fold into their base state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LifecycleState {
    /// Serving traffic.
    InService,
    /// Being added to the group.
    Pending,
    /// Being removed from the group.
    Removing,
    /// Protected from scale-in.
    Protected,
    /// Held in standby.
    Standby,
    /// Stopped but still a member.
    Stopped,
    /// Any value this crate does not model.
    Other(String),
}

impl From<&str> for LifecycleState {
    fn from(value: &str) -> Self {
        let base = value.split_once(':').map_or(value, |(head, _)| head);
        match base {
            "InService" => Self::InService,
            "Pending" => Self::Pending,
            "Removing" => Self::Removing,
            "Protected" => Self::Protected,
            "Standby" => Self::Standby,
            "Stopped" => Self::Stopped,
            _ => Self::Other(value.to_owned()),
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InService => f.write_str("InService"),
            Self::Pending => f.write_str("Pending"),
            Self::Removing => f.write_str("Removing"),
            Self::Protected => f.write_str("Protected"),
            Self::Standby => f.write_str("Standby"),
            Self::Stopped => f.write_str("Stopped"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// One member of a scaling group.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceRecord {
    /// Provider instance identifier.
    pub instance_id: InstanceId,
    /// Reported health.
    pub health_status: HealthStatus,
    /// Reported lifecycle state.
    pub lifecycle_state: LifecycleState,
}

impl InstanceRecord {
    /// Returns true when the instance may be selected for removal.
    #[must_use]
    pub fn is_removal_candidate(&self) -> bool {
        self.health_status == HealthStatus::Healthy
            && self.lifecycle_state == LifecycleState::InService
    }
}

/// Errors raised by fleet implementations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum FleetError {
    /// Raised when a lookup resolves to zero or several records.
    #[error("required {resource} {id} not found (matched {matched} records)")]
    NotFound {
        /// Kind of record looked up (for example `scaling group`).
        resource: &'static str,
        /// Identifier that was looked up.
        id: String,
        /// Number of records the provider returned.
        matched: i64,
    },
    /// Wrapper for transport and provider API failures.
    #[error("remote API error: {message}")]
    Remote {
        /// Description of the failure.
        message: String,
    },
    /// Raised when the caller cancelled before the call completed.
    #[error("cancelled before the remote call completed")]
    Cancelled,
}

/// Future returned by fleet operations.
pub type FleetFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, FleetError>> + Send + 'a>>;

/// Remote operations needed to drive one scaling group.
pub trait Fleet {
    /// Reads the group's lifecycle state and total capacity.
    fn status<'a>(&'a self, group: &'a ScalingGroupRef) -> FleetFuture<'a, GroupStatus>;

    /// Lists every member instance of the group.
    fn list_instances<'a>(
        &'a self,
        group: &'a ScalingGroupRef,
    ) -> FleetFuture<'a, Vec<InstanceRecord>>;

    /// Requests the group's total capacity be set to `total_capacity`.
    fn resize<'a>(
        &'a self,
        group: &'a ScalingGroupRef,
        total_capacity: i32,
    ) -> FleetFuture<'a, ActivityId>;

    /// Removes and releases the named instances.
    fn delete_instances<'a>(
        &'a self,
        group: &'a ScalingGroupRef,
        instance_ids: &'a [InstanceId],
    ) -> FleetFuture<'a, ActivityId>;

    /// Returns true once the activity's progress reaches 100%.
    fn activity_status<'a>(
        &'a self,
        group: &'a ScalingGroupRef,
        activity: &'a ActivityId,
    ) -> FleetFuture<'a, bool>;
}

/// Runs a fleet call unless `cancel` fires first.
///
/// No call is started once the token has already fired.
///
/// # Errors
///
/// Returns [`FleetError::Cancelled`] when the token fires, otherwise the
/// call's own result.
pub async fn cancellable<T>(
    cancel: &CancellationToken,
    call: FleetFuture<'_, T>,
) -> Result<T, FleetError> {
    if cancel.is_cancelled() {
        return Err(FleetError::Cancelled);
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(FleetError::Cancelled),
        result = call => result,
    }
}
