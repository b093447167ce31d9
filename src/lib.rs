//! Autoscaler target adapter for Alibaba Cloud Auto Scaling (ESS) groups.
//!
//! The crate turns a desired instance count into remote scaling actions.
//! Growing a group sets its total capacity; shrinking it drains chosen nodes
//! through an external node-lifecycle manager before deleting exactly those
//! instances. Every remote activity is polled to completion before a call
//! reports success.

pub mod config;
pub mod decision;
pub mod ess;
pub mod fleet;
pub mod nodes;
pub mod poller;
pub mod scale_in;
pub mod target;
pub mod test_support;

pub use config::{ConfigError, ConfigMap, Credentials, EssConfig, PluginConfig};
pub use decision::{Direction, ScaleDecision, decide};
pub use ess::{EssError, EssFleet};
pub use fleet::{
    ActivityId, Fleet, FleetError, GroupStatus, InstanceId, InstanceRecord, ScalingGroupRef,
};
pub use nodes::{DirectPool, NodePool, NodePoolError, NodeRemovalSelection};
pub use poller::{ActivityPoller, PollError};
pub use scale_in::{ScaleInCoordinator, ScaleInError};
pub use target::{
    ErrorKind, ScaleOutcome, ScalingAction, TargetAdapter, TargetError, TargetStatus, plugin_info,
};
