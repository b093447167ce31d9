//! Pass-through pool for fleets with no cluster scheduler in front of them.

use tracing::debug;

use crate::config::ConfigMap;
use crate::fleet::InstanceId;

use super::{NodePool, NodePoolError, NodePoolFuture, NodeRemovalSelection, SelectedNode};

/// Node pool that treats every eligible instance as its own node.
///
/// It is always ready and has nothing to drain. Selection takes the first
/// `count` candidates in listing order, and notification is a no-op.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DirectPool;

impl NodePool for DirectPool {
    fn is_pool_ready<'a>(&'a self, _config: &'a ConfigMap) -> NodePoolFuture<'a, bool> {
        Box::pin(async { Ok(true) })
    }

    fn select_and_drain<'a>(
        &'a self,
        _config: &'a ConfigMap,
        candidates: &'a [InstanceId],
        count: usize,
    ) -> NodePoolFuture<'a, NodeRemovalSelection> {
        Box::pin(async move {
            if candidates.len() < count {
                return Err(NodePoolError::InsufficientCapacity {
                    requested: count,
                    available: candidates.len(),
                });
            }
            let nodes = candidates
                .iter()
                .take(count)
                .map(|id| SelectedNode {
                    node_id: id.to_string(),
                    remote_id: id.clone(),
                })
                .collect();
            Ok(NodeRemovalSelection::new(nodes))
        })
    }

    fn notify_removed<'a>(
        &'a self,
        _config: &'a ConfigMap,
        selection: &'a NodeRemovalSelection,
    ) -> NodePoolFuture<'a, ()> {
        Box::pin(async move {
            debug!(removed = selection.len(), "no cluster state to release");
            Ok(())
        })
    }
}
