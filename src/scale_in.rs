//! Scale-in: drain the chosen nodes, delete their instances, then release.
//!
//! Steps run strictly in order. A failure stops every later step, so an
//! instance is never deleted before its node is drained and the manager is
//! never told about a deletion that did not complete.

use std::collections::BTreeSet;
use std::future::Future;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ConfigMap;
use crate::fleet::{Fleet, FleetError, InstanceId, ScalingGroupRef, cancellable};
use crate::nodes::{NodePool, NodePoolError, NodeRemovalSelection};
use crate::poller::{ActivityPoller, PollError};

/// Errors surfaced while scaling a group in.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ScaleInError {
    /// Raised when listing group members fails.
    #[error("failed to list scaling group instances: {0}")]
    ListInstances(#[source] FleetError),
    /// Raised when the node manager cannot select and drain enough nodes.
    #[error("failed to perform pre-scale-in tasks: {0}")]
    PreScaleIn(#[source] NodePoolError),
    /// Raised when the node manager's selection cannot be deleted as-is.
    #[error("node selection rejected: {reason}")]
    InvalidSelection {
        /// Why the selection was rejected.
        reason: String,
    },
    /// Raised when the removal request fails.
    #[error("failed to delete instances: {0}")]
    DeleteInstances(#[source] FleetError),
    /// Raised when the removal activity does not complete.
    #[error("failed to confirm instance removal: {0}")]
    Confirm(#[source] PollError<FleetError>),
    /// Raised when post-removal hooks fail. The deletion stands.
    #[error("failed to perform post-scale-in tasks: {0}")]
    PostScaleIn(#[source] NodePoolError),
    /// Raised when the caller cancelled a node manager call.
    #[error("cancelled during {stage}")]
    Cancelled {
        /// Step that was interrupted.
        stage: &'static str,
    },
}

/// Coordinates one scale-in between the fleet and the node manager.
#[derive(Debug)]
pub struct ScaleInCoordinator<'a, F, N> {
    fleet: &'a F,
    pool: &'a N,
    poller: ActivityPoller,
    cancel: &'a CancellationToken,
}

impl<'a, F, N> ScaleInCoordinator<'a, F, N>
where
    F: Fleet,
    N: NodePool,
{
    /// Creates a coordinator borrowing the caller's collaborators.
    #[must_use]
    pub const fn new(
        fleet: &'a F,
        pool: &'a N,
        poller: ActivityPoller,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            fleet,
            pool,
            poller,
            cancel,
        }
    }

    /// Removes exactly `count` healthy, in-service instances from `group`.
    ///
    /// Returns the selection that was deleted and released.
    ///
    /// # Errors
    ///
    /// Returns [`ScaleInError`] naming the step that failed.
    pub async fn run(
        &self,
        group: &ScalingGroupRef,
        count: usize,
        config: &ConfigMap,
    ) -> Result<NodeRemovalSelection, ScaleInError> {
        let instances = cancellable(self.cancel, self.fleet.list_instances(group))
            .await
            .map_err(ScaleInError::ListInstances)?;

        let mut candidates = Vec::with_capacity(instances.len());
        for instance in instances {
            if instance.is_removal_candidate() {
                debug!(instance_id = %instance.instance_id, "found healthy instance");
                candidates.push(instance.instance_id);
            } else {
                debug!(
                    instance_id = %instance.instance_id,
                    lifecycle_state = %instance.lifecycle_state,
                    "skipping instance"
                );
            }
        }

        let selection = self
            .guard("pre-scale-in tasks", self.pool.select_and_drain(config, &candidates, count))
            .await?
            .map_err(ScaleInError::PreScaleIn)?;
        let instance_ids = Self::checked_remote_ids(&selection, &candidates, count)?;

        debug!(instances = ?instance_ids, "deleting scaling group instances");
        let activity = cancellable(self.cancel, self.fleet.delete_instances(group, &instance_ids))
            .await
            .map_err(ScaleInError::DeleteInstances)?;
        info!(activity_id = %activity, "started instance removal activity");

        let checks = self
            .poller
            .wait_until_done(self.cancel, || {
                cancellable(self.cancel, self.fleet.activity_status(group, &activity))
            })
            .await
            .map_err(ScaleInError::Confirm)?;
        debug!(checks, "instance removal confirmed");

        self.guard("post-scale-in tasks", self.pool.notify_removed(config, &selection))
            .await?
            .map_err(ScaleInError::PostScaleIn)?;

        Ok(selection)
    }

    fn checked_remote_ids(
        selection: &NodeRemovalSelection,
        candidates: &[InstanceId],
        count: usize,
    ) -> Result<Vec<InstanceId>, ScaleInError> {
        if selection.len() != count {
            return Err(ScaleInError::InvalidSelection {
                reason: format!("expected {count} nodes, got {}", selection.len()),
            });
        }
        let eligible: BTreeSet<&InstanceId> = candidates.iter().collect();
        let instance_ids = selection.remote_ids();
        let mut distinct = BTreeSet::new();
        if let Some(duplicate) = instance_ids.iter().find(|id| !distinct.insert(*id)) {
            return Err(ScaleInError::InvalidSelection {
                reason: format!("duplicate instance {duplicate} in selection"),
            });
        }
        if let Some(stray) = instance_ids.iter().find(|id| !eligible.contains(id)) {
            return Err(ScaleInError::InvalidSelection {
                reason: format!("instance {stray} is not a healthy in-service member"),
            });
        }
        Ok(instance_ids)
    }

    async fn guard<T>(
        &self,
        stage: &'static str,
        call: impl Future<Output = T>,
    ) -> Result<T, ScaleInError> {
        if self.cancel.is_cancelled() {
            return Err(ScaleInError::Cancelled { stage });
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ScaleInError::Cancelled { stage }),
            outcome = call => Ok(outcome),
        }
    }
}
