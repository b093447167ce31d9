//! Test support utilities shared across unit and integration tests.
//!
//! [`ScriptedFleet`] and [`ScriptedPool`] stand in for the remote API and the
//! cluster scheduler. Both can share a [`CallLog`] so tests can assert the
//! order in which the adapter touched them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::ConfigMap;
use crate::fleet::{
    ActivityId, Fleet, FleetError, FleetFuture, GroupStatus, HealthStatus, InstanceId,
    InstanceRecord, LifecycleState, ScalingGroupRef,
};
use crate::nodes::{
    ClusterNode, NodePool, NodePoolError, NodePoolFuture, NodeRemovalSelection, SelectedNode,
    remote_id_for_node, select_by_remote_id,
};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builds an instance record from wire-style strings.
#[must_use]
pub fn instance(id: &str, health: &str, lifecycle: &str) -> InstanceRecord {
    InstanceRecord {
        instance_id: InstanceId::from(id),
        health_status: HealthStatus::from(health),
        lifecycle_state: LifecycleState::from(lifecycle),
    }
}

/// Ordered record of operations invoked on the doubles.
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<&'static str>>>,
}

impl CallLog {
    fn push(&self, operation: &'static str) {
        locked(&self.entries).push(operation);
    }

    /// Returns every recorded operation in call order.
    #[must_use]
    pub fn entries(&self) -> Vec<&'static str> {
        locked(&self.entries).clone()
    }

    /// Counts calls to `operation`.
    #[must_use]
    pub fn count(&self, operation: &str) -> usize {
        locked(&self.entries)
            .iter()
            .filter(|entry| **entry == operation)
            .count()
    }
}

#[derive(Clone, Copy, Debug)]
enum FailureMode {
    Status,
    List,
    Resize,
    Delete,
    Activity,
}

impl FailureMode {
    const fn flag(self) -> u8 {
        match self {
            Self::Status => 0b0_0001,
            Self::List => 0b0_0010,
            Self::Resize => 0b0_0100,
            Self::Delete => 0b0_1000,
            Self::Activity => 0b1_0000,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Failures(u8);

impl Failures {
    const fn set(&mut self, mode: FailureMode) {
        self.0 |= mode.flag();
    }

    const fn contains(self, mode: FailureMode) -> bool {
        self.0 & mode.flag() != 0
    }
}

#[derive(Debug)]
struct FleetState {
    failures: Failures,
    status: GroupStatus,
    status_matches: i64,
    instances: Vec<InstanceRecord>,
    checks_until_done: Option<u32>,
    activity_checks: u32,
    next_activity: u32,
    groups: Vec<ScalingGroupRef>,
    resized: Vec<i32>,
    deleted: Vec<Vec<InstanceId>>,
}

impl Default for FleetState {
    fn default() -> Self {
        Self {
            failures: Failures::default(),
            status: GroupStatus {
                stable: true,
                current_count: 0,
            },
            status_matches: 1,
            instances: Vec::new(),
            checks_until_done: Some(1),
            activity_checks: 0,
            next_activity: 0,
            groups: Vec::new(),
            resized: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

impl FleetState {
    fn start_activity(&mut self) -> ActivityId {
        self.activity_checks = 0;
        self.next_activity += 1;
        ActivityId::new(format!("asa-{}", self.next_activity))
    }
}

/// Scripted fleet that serves canned group state and records mutations.
#[derive(Clone, Debug)]
pub struct ScriptedFleet {
    log: CallLog,
    state: Arc<Mutex<FleetState>>,
}

impl ScriptedFleet {
    /// Creates a stable, empty group whose activities finish on first check.
    #[must_use]
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            state: Arc::new(Mutex::new(FleetState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, FleetState> {
        locked(&self.state)
    }

    fn fail(self, mode: FailureMode) -> Self {
        self.state().failures.set(mode);
        self
    }

    /// Sets the reported group status.
    #[must_use]
    pub fn with_status(self, stable: bool, current_count: i32) -> Self {
        self.state().status = GroupStatus {
            stable,
            current_count,
        };
        self
    }

    /// Makes the group lookup match `matched` records instead of one.
    #[must_use]
    pub fn matching_groups(self, matched: i64) -> Self {
        self.state().status_matches = matched;
        self
    }

    /// Seeds the group's member instances.
    #[must_use]
    pub fn with_instances(self, instances: Vec<InstanceRecord>) -> Self {
        self.state().instances = instances;
        self
    }

    /// Activities report done on the `checks`-th completion check.
    #[must_use]
    pub fn completing_after(self, checks: u32) -> Self {
        self.state().checks_until_done = Some(checks);
        self
    }

    /// Activities never report done.
    #[must_use]
    pub fn never_completing(self) -> Self {
        self.state().checks_until_done = None;
        self
    }

    /// Fails every status call.
    #[must_use]
    pub fn failing_status(self) -> Self {
        self.fail(FailureMode::Status)
    }

    /// Fails every instance listing.
    #[must_use]
    pub fn failing_list(self) -> Self {
        self.fail(FailureMode::List)
    }

    /// Fails every resize request.
    #[must_use]
    pub fn failing_resize(self) -> Self {
        self.fail(FailureMode::Resize)
    }

    /// Fails every removal request.
    #[must_use]
    pub fn failing_delete(self) -> Self {
        self.fail(FailureMode::Delete)
    }

    /// Fails every activity check.
    #[must_use]
    pub fn failing_activity(self) -> Self {
        self.fail(FailureMode::Activity)
    }

    /// Scaling groups whose status was read, in call order.
    #[must_use]
    pub fn groups(&self) -> Vec<ScalingGroupRef> {
        self.state().groups.clone()
    }

    /// Capacities requested so far.
    #[must_use]
    pub fn resized(&self) -> Vec<i32> {
        self.state().resized.clone()
    }

    /// Instance batches deleted so far.
    #[must_use]
    pub fn deleted(&self) -> Vec<Vec<InstanceId>> {
        self.state().deleted.clone()
    }

    fn scripted_failure(operation: &str) -> FleetError {
        FleetError::Remote {
            message: format!("scripted {operation} failure"),
        }
    }
}

impl Fleet for ScriptedFleet {
    fn status<'a>(&'a self, group: &'a ScalingGroupRef) -> FleetFuture<'a, GroupStatus> {
        Box::pin(async move {
            self.log.push("status");
            let mut state = self.state();
            state.groups.push(group.clone());
            if state.failures.contains(FailureMode::Status) {
                return Err(Self::scripted_failure("status"));
            }
            if state.status_matches != 1 {
                return Err(FleetError::NotFound {
                    resource: "scaling group",
                    id: group.id.clone(),
                    matched: state.status_matches,
                });
            }
            Ok(state.status)
        })
    }

    fn list_instances<'a>(
        &'a self,
        _group: &'a ScalingGroupRef,
    ) -> FleetFuture<'a, Vec<InstanceRecord>> {
        Box::pin(async move {
            self.log.push("list_instances");
            let state = self.state();
            if state.failures.contains(FailureMode::List) {
                return Err(Self::scripted_failure("list"));
            }
            Ok(state.instances.clone())
        })
    }

    fn resize<'a>(
        &'a self,
        _group: &'a ScalingGroupRef,
        total_capacity: i32,
    ) -> FleetFuture<'a, ActivityId> {
        Box::pin(async move {
            self.log.push("resize");
            let mut state = self.state();
            if state.failures.contains(FailureMode::Resize) {
                return Err(Self::scripted_failure("resize"));
            }
            state.resized.push(total_capacity);
            state.status.current_count = total_capacity;
            Ok(state.start_activity())
        })
    }

    fn delete_instances<'a>(
        &'a self,
        _group: &'a ScalingGroupRef,
        instance_ids: &'a [InstanceId],
    ) -> FleetFuture<'a, ActivityId> {
        Box::pin(async move {
            self.log.push("delete_instances");
            let mut state = self.state();
            if state.failures.contains(FailureMode::Delete) {
                return Err(Self::scripted_failure("delete"));
            }
            state.deleted.push(instance_ids.to_vec());
            state
                .instances
                .retain(|record| !instance_ids.contains(&record.instance_id));
            Ok(state.start_activity())
        })
    }

    fn activity_status<'a>(
        &'a self,
        _group: &'a ScalingGroupRef,
        _activity: &'a ActivityId,
    ) -> FleetFuture<'a, bool> {
        Box::pin(async move {
            self.log.push("activity_status");
            let mut state = self.state();
            if state.failures.contains(FailureMode::Activity) {
                return Err(Self::scripted_failure("activity"));
            }
            state.activity_checks += 1;
            Ok(state
                .checks_until_done
                .is_some_and(|done_at| state.activity_checks >= done_at))
        })
    }
}

#[derive(Clone, Debug, Default)]
enum Selection {
    #[default]
    FirstCandidates,
    Fixed(Vec<InstanceId>),
    Nodes(Vec<ClusterNode>),
}

#[derive(Debug, Default)]
struct PoolState {
    not_ready: bool,
    fail_readiness: bool,
    fail_drain: bool,
    fail_notify: bool,
    selection: Selection,
    offered: Vec<Vec<InstanceId>>,
    notified: Vec<NodeRemovalSelection>,
}

/// Scripted node-lifecycle manager.
#[derive(Clone, Debug)]
pub struct ScriptedPool {
    log: CallLog,
    state: Arc<Mutex<PoolState>>,
}

impl ScriptedPool {
    /// Creates a ready pool that selects the first candidates offered.
    #[must_use]
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            state: Arc::new(Mutex::new(PoolState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, PoolState> {
        locked(&self.state)
    }

    /// Reports the pool as not ready.
    #[must_use]
    pub fn not_ready(self) -> Self {
        self.state().not_ready = true;
        self
    }

    /// Fails the readiness check.
    #[must_use]
    pub fn failing_readiness(self) -> Self {
        self.state().fail_readiness = true;
        self
    }

    /// Fails node selection and draining.
    #[must_use]
    pub fn failing_drain(self) -> Self {
        self.state().fail_drain = true;
        self
    }

    /// Fails post-removal notification.
    #[must_use]
    pub fn failing_notify(self) -> Self {
        self.state().fail_notify = true;
        self
    }

    /// Always returns nodes backed by `ids`, regardless of the candidates.
    #[must_use]
    pub fn selecting(self, ids: &[&str]) -> Self {
        self.state().selection =
            Selection::Fixed(ids.iter().map(|id| InstanceId::from(*id)).collect());
        self
    }

    /// Selects from scheduler nodes, mapping each by its hostname attribute.
    #[must_use]
    pub fn with_nodes(self, nodes: Vec<ClusterNode>) -> Self {
        self.state().selection = Selection::Nodes(nodes);
        self
    }

    /// Candidate lists offered for selection so far.
    #[must_use]
    pub fn offered(&self) -> Vec<Vec<InstanceId>> {
        self.state().offered.clone()
    }

    /// Selections released so far.
    #[must_use]
    pub fn notified(&self) -> Vec<NodeRemovalSelection> {
        self.state().notified.clone()
    }

    fn by_instance(ids: &[InstanceId]) -> NodeRemovalSelection {
        NodeRemovalSelection::new(
            ids.iter()
                .map(|id| SelectedNode {
                    node_id: format!("node-{id}"),
                    remote_id: id.clone(),
                })
                .collect(),
        )
    }
}

impl NodePool for ScriptedPool {
    fn is_pool_ready<'a>(&'a self, _config: &'a ConfigMap) -> NodePoolFuture<'a, bool> {
        Box::pin(async move {
            self.log.push("is_pool_ready");
            let state = self.state();
            if state.fail_readiness {
                return Err(NodePoolError::Cluster {
                    message: String::from("scripted readiness failure"),
                });
            }
            Ok(!state.not_ready)
        })
    }

    fn select_and_drain<'a>(
        &'a self,
        _config: &'a ConfigMap,
        candidates: &'a [InstanceId],
        count: usize,
    ) -> NodePoolFuture<'a, NodeRemovalSelection> {
        Box::pin(async move {
            self.log.push("select_and_drain");
            let mut state = self.state();
            state.offered.push(candidates.to_vec());
            if state.fail_drain {
                return Err(NodePoolError::Cluster {
                    message: String::from("scripted drain failure"),
                });
            }
            match &state.selection {
                Selection::FirstCandidates => {
                    if candidates.len() < count {
                        return Err(NodePoolError::InsufficientCapacity {
                            requested: count,
                            available: candidates.len(),
                        });
                    }
                    Ok(Self::by_instance(candidates.get(..count).unwrap_or(candidates)))
                }
                Selection::Fixed(ids) => Ok(Self::by_instance(ids)),
                Selection::Nodes(nodes) => {
                    select_by_remote_id(nodes, candidates, count, remote_id_for_node)
                }
            }
        })
    }

    fn notify_removed<'a>(
        &'a self,
        _config: &'a ConfigMap,
        selection: &'a NodeRemovalSelection,
    ) -> NodePoolFuture<'a, ()> {
        Box::pin(async move {
            self.log.push("notify_removed");
            let mut state = self.state();
            if state.fail_notify {
                return Err(NodePoolError::Cluster {
                    message: String::from("scripted notify failure"),
                });
            }
            state.notified.push(selection.clone());
            Ok(())
        })
    }
}
