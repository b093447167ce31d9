//! Target adapter façade.
//!
//! [`TargetAdapter`] is the surface an autoscaler drives: it reads the
//! group's state, decides a direction, and runs the matching workflow until
//! the remote activity has finished. Each call is independent; nothing is
//! cached between calls except the plugin configuration and the client.

mod error;

use std::collections::BTreeMap;
use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span};

use crate::config::{ConfigMap, PluginConfig};
use crate::decision::{Direction, decide};
use crate::ess::EssFleet;
use crate::fleet::{Fleet, ScalingGroupRef, cancellable};
use crate::nodes::NodePool;
use crate::poller::{ActivityPoller, DEFAULT_RETRY_INTERVAL, DEFAULT_RETRY_LIMIT};
use crate::scale_in::ScaleInCoordinator;

pub use error::{ErrorKind, ScaleOutError, TargetError};

/// Registered plugin name.
pub const PLUGIN_NAME: &str = "acs-ess";

/// Registered plugin type.
pub const PLUGIN_TYPE: &str = "target";

/// Count value the orchestrator sends for a dry-run action.
pub const DRY_RUN_COUNT: i64 = -1;

/// Static plugin identity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PluginInfo {
    /// Plugin name.
    pub name: &'static str,
    /// Plugin type.
    pub plugin_type: &'static str,
}

/// Returns the plugin's name and type.
#[must_use]
pub const fn plugin_info() -> PluginInfo {
    PluginInfo {
        name: PLUGIN_NAME,
        plugin_type: PLUGIN_TYPE,
    }
}

/// Scaling request from the orchestrator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ScalingAction {
    /// Desired total capacity.
    pub count: i64,
    /// When set, nothing is changed.
    pub dry_run: bool,
}

impl ScalingAction {
    /// Requests `count` total instances.
    #[must_use]
    pub const fn new(count: i64) -> Self {
        Self {
            count,
            dry_run: false,
        }
    }

    /// Marks the action as a dry run.
    #[must_use]
    pub const fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// True for explicit dry runs and for the `-1` sentinel count.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run || self.count == DRY_RUN_COUNT
    }
}

/// Group state reported to the orchestrator.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TargetStatus {
    /// True when the target can accept a scaling action.
    pub ready: bool,
    /// Current total capacity.
    pub count: i64,
    /// Target metadata. Currently always empty.
    pub meta: BTreeMap<String, String>,
}

/// What a successful [`TargetAdapter::scale`] call did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScaleOutcome {
    /// Dry run; no remote call was made.
    DryRun,
    /// The group already had the requested capacity.
    Unchanged {
        /// Capacity observed.
        count: i32,
    },
    /// Total capacity was set and the activity completed.
    ScaledOut {
        /// Capacity requested.
        capacity: i32,
    },
    /// Instances were drained, deleted, and released.
    ScaledIn {
        /// Number of instances removed.
        removed: usize,
    },
}

impl fmt::Display for ScaleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DryRun => f.write_str("dry-run"),
            Self::Unchanged { count } => write!(f, "unchanged count={count}"),
            Self::ScaledOut { capacity } => write!(f, "scaled-out capacity={capacity}"),
            Self::ScaledIn { removed } => write!(f, "scaled-in removed={removed}"),
        }
    }
}

/// Autoscaler target backed by a fleet and a node-lifecycle manager.
#[derive(Debug)]
pub struct TargetAdapter<F, N> {
    fleet: F,
    pool: N,
    config: PluginConfig,
    poller: ActivityPoller,
}

impl<N> TargetAdapter<EssFleet, N>
where
    N: NodePool,
{
    /// Validates a plugin key map and builds an ESS-backed adapter.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::Config`] when credentials are missing and
    /// [`TargetError::Client`] when the HTTP client cannot be built.
    pub fn from_config_map(map: ConfigMap, pool: N) -> Result<Self, TargetError> {
        let config = PluginConfig::from_map(map)?;
        let fleet = EssFleet::new(config.credentials()).map_err(TargetError::Client)?;
        Ok(Self::new(fleet, pool, config))
    }

    /// Replaces the plugin configuration and rebuilds the ESS client.
    ///
    /// The previous configuration stays in place when validation fails.
    ///
    /// # Errors
    ///
    /// See [`Self::from_config_map`].
    pub fn set_config(&mut self, map: ConfigMap) -> Result<(), TargetError> {
        let config = PluginConfig::from_map(map)?;
        self.fleet = EssFleet::new(config.credentials()).map_err(TargetError::Client)?;
        self.config = config;
        Ok(())
    }
}

impl<F, N> TargetAdapter<F, N>
where
    F: Fleet,
    N: NodePool,
{
    /// Creates an adapter with the default activity poller.
    #[must_use]
    pub const fn new(fleet: F, pool: N, config: PluginConfig) -> Self {
        Self {
            fleet,
            pool,
            config,
            poller: ActivityPoller::new(DEFAULT_RETRY_INTERVAL, DEFAULT_RETRY_LIMIT),
        }
    }

    /// Overrides the activity poller.
    #[must_use]
    pub const fn with_poller(mut self, poller: ActivityPoller) -> Self {
        self.poller = poller;
        self
    }

    /// Current plugin configuration.
    #[must_use]
    pub const fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Static identity reported to the orchestrator.
    #[must_use]
    pub const fn plugin_info() -> PluginInfo {
        plugin_info()
    }

    /// Applies a scaling action and waits for it to take effect.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`]; use [`TargetError::kind`] to classify it.
    pub async fn scale(
        &self,
        action: ScalingAction,
        config: &ConfigMap,
        cancel: &CancellationToken,
    ) -> Result<ScaleOutcome, TargetError> {
        if action.is_dry_run() {
            info!(count = action.count, "dry-run scaling action, skipping");
            return Ok(ScaleOutcome::DryRun);
        }
        let group = self.config.group_ref(config)?;
        let span = info_span!("scale", action = "scale", scaling_group = %group);
        self.scale_group(&group, action.count, config, cancel)
            .instrument(span)
            .await
    }

    async fn scale_group(
        &self,
        group: &ScalingGroupRef,
        count: i64,
        config: &ConfigMap,
        cancel: &CancellationToken,
    ) -> Result<ScaleOutcome, TargetError> {
        let status = cancellable(cancel, self.fleet.status(group))
            .await
            .map_err(|source| TargetError::Describe {
                group: group.to_string(),
                source,
            })?;
        let decision = decide(i64::from(status.current_count), count);
        info!(
            current = status.current_count,
            desired = count,
            direction = %decision.direction,
            magnitude = decision.magnitude,
            "scaling decision"
        );

        if decision.direction == Direction::None {
            info!("scaling not required");
            return Ok(ScaleOutcome::Unchanged {
                count: status.current_count,
            });
        }
        let magnitude =
            i32::try_from(decision.magnitude).map_err(|_| TargetError::CountOutOfRange { count })?;

        if decision.direction == Direction::Out {
            self.scale_out(group, magnitude, cancel)
                .await
                .map_err(|source| TargetError::ScaleOut {
                    group: group.to_string(),
                    source,
                })?;
            info!(capacity = magnitude, "successfully performed and verified scaling out");
            return Ok(ScaleOutcome::ScaledOut {
                capacity: magnitude,
            });
        }

        let count_to_remove =
            usize::try_from(magnitude).map_err(|_| TargetError::CountOutOfRange { count })?;
        let selection = ScaleInCoordinator::new(&self.fleet, &self.pool, self.poller, cancel)
            .run(group, count_to_remove, config)
            .await
            .map_err(|source| TargetError::ScaleIn {
                group: group.to_string(),
                source,
            })?;
        info!(removed = selection.len(), "successfully performed and verified scaling in");
        Ok(ScaleOutcome::ScaledIn {
            removed: selection.len(),
        })
    }

    async fn scale_out(
        &self,
        group: &ScalingGroupRef,
        capacity: i32,
        cancel: &CancellationToken,
    ) -> Result<(), ScaleOutError> {
        let activity = cancellable(cancel, self.fleet.resize(group, capacity))
            .await
            .map_err(ScaleOutError::Resize)?;
        info!(activity_id = %activity, capacity, "started capacity change activity");
        let checks = self
            .poller
            .wait_until_done(cancel, || {
                cancellable(cancel, self.fleet.activity_status(group, &activity))
            })
            .await
            .map_err(ScaleOutError::Confirm)?;
        info!(checks, "capacity change complete");
        Ok(())
    }

    /// Reports whether the target is ready and its current capacity.
    ///
    /// A pool that is not ready yields `ready = false` without touching the
    /// fleet.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] when readiness, configuration, or the group
    /// lookup fails.
    pub async fn status(
        &self,
        config: &ConfigMap,
        cancel: &CancellationToken,
    ) -> Result<TargetStatus, TargetError> {
        let ready = self
            .pool
            .is_pool_ready(config)
            .await
            .map_err(TargetError::Readiness)?;
        if !ready {
            info!("node pool not ready");
            return Ok(TargetStatus::default());
        }

        let group = self.config.group_ref(config)?;
        let span = info_span!("status", action = "status", scaling_group = %group);
        let status = cancellable(cancel, self.fleet.status(&group))
            .instrument(span)
            .await
            .map_err(|source| TargetError::Describe {
                group: group.to_string(),
                source,
            })?;
        Ok(TargetStatus {
            ready: status.stable,
            count: i64::from(status.current_count),
            meta: BTreeMap::new(),
        })
    }
}
