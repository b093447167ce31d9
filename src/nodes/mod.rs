//! Boundary with the external node-lifecycle manager.
//!
//! The manager owns the cluster side of scaling: it reports whether the node
//! pool is ready, drains the nodes chosen for removal, and releases whatever
//! it holds once the backing instances are gone. This crate only needs the
//! three operations on [`NodePool`] and the mapping from a cluster node to
//! its remote instance id.

mod direct;

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tracing::debug;

use crate::config::ConfigMap;
use crate::fleet::InstanceId;

pub use direct::DirectPool;

/// Node attribute carrying the ESS instance hostname.
pub const NODE_HOSTNAME_ATTRIBUTE: &str = "unique.hostname";

/// A cluster node as reported by the scheduler.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClusterNode {
    /// Scheduler node identifier.
    pub id: String,
    /// Fingerprinted node attributes.
    pub attributes: BTreeMap<String, String>,
}

impl ClusterNode {
    /// Creates a node with no attributes.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Raised when a node cannot be mapped to a remote instance.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum NodeIdError {
    /// The required attribute is absent from the node.
    #[error("attribute {attribute:?} not found on node {node_id}")]
    AttributeNotFound {
        /// Node that was inspected.
        node_id: String,
        /// Attribute that was expected.
        attribute: &'static str,
    },
}

/// Signature of a node → remote id mapping.
pub type RemoteIdLookup = fn(&ClusterNode) -> Result<InstanceId, NodeIdError>;

/// Maps a cluster node to its ESS instance id via [`NODE_HOSTNAME_ATTRIBUTE`].
///
/// # Errors
///
/// Returns [`NodeIdError::AttributeNotFound`] when the attribute is absent.
pub fn remote_id_for_node(node: &ClusterNode) -> Result<InstanceId, NodeIdError> {
    node.attributes
        .get(NODE_HOSTNAME_ATTRIBUTE)
        .map(|hostname| InstanceId::from(hostname.as_str()))
        .ok_or_else(|| NodeIdError::AttributeNotFound {
            node_id: node.id.clone(),
            attribute: NODE_HOSTNAME_ATTRIBUTE,
        })
}

/// A node chosen for removal together with its backing instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SelectedNode {
    /// Scheduler node identifier.
    pub node_id: String,
    /// Remote instance backing the node.
    pub remote_id: InstanceId,
}

/// Nodes drained by the manager and due for deletion, in selection order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NodeRemovalSelection {
    nodes: Vec<SelectedNode>,
}

impl NodeRemovalSelection {
    /// Wraps an ordered selection.
    #[must_use]
    pub const fn new(nodes: Vec<SelectedNode>) -> Self {
        Self { nodes }
    }

    /// Selected nodes in order.
    #[must_use]
    pub fn nodes(&self) -> &[SelectedNode] {
        &self.nodes
    }

    /// Remote ids to delete, in selection order.
    #[must_use]
    pub fn remote_ids(&self) -> Vec<InstanceId> {
        self.nodes.iter().map(|node| node.remote_id.clone()).collect()
    }

    /// Number of selected nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing was selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Errors raised by node-lifecycle managers.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum NodePoolError {
    /// Fewer nodes than requested could be safely drained.
    #[error("only {available} of {requested} requested nodes can be drained")]
    InsufficientCapacity {
        /// Nodes requested for removal.
        requested: usize,
        /// Nodes eligible for removal.
        available: usize,
    },
    /// A node could not be mapped to a remote instance.
    #[error(transparent)]
    NodeId(#[from] NodeIdError),
    /// Any other failure reported by the cluster side.
    #[error("cluster operation failed: {message}")]
    Cluster {
        /// Description of the failure.
        message: String,
    },
}

/// Future returned by node pool operations.
pub type NodePoolFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, NodePoolError>> + Send + 'a>>;

/// Cluster-side operations the scale engine delegates to.
pub trait NodePool {
    /// Reports whether the cluster node pool is ready for a scaling action.
    fn is_pool_ready<'a>(&'a self, config: &'a ConfigMap) -> NodePoolFuture<'a, bool>;

    /// Selects exactly `count` nodes backed by `candidates` and drains them.
    ///
    /// Must fail rather than return fewer than `count` nodes.
    fn select_and_drain<'a>(
        &'a self,
        config: &'a ConfigMap,
        candidates: &'a [InstanceId],
        count: usize,
    ) -> NodePoolFuture<'a, NodeRemovalSelection>;

    /// Runs post-removal hooks once the selected instances are deleted.
    fn notify_removed<'a>(
        &'a self,
        config: &'a ConfigMap,
        selection: &'a NodeRemovalSelection,
    ) -> NodePoolFuture<'a, ()>;
}

/// Picks `count` nodes whose remote instance is among `candidates`.
///
/// Nodes are taken in the order given. Nodes that cannot be mapped, or whose
/// instance is not a candidate, are skipped.
///
/// # Errors
///
/// Returns [`NodePoolError::InsufficientCapacity`] when fewer than `count`
/// nodes match.
pub fn select_by_remote_id(
    nodes: &[ClusterNode],
    candidates: &[InstanceId],
    count: usize,
    lookup: RemoteIdLookup,
) -> Result<NodeRemovalSelection, NodePoolError> {
    let wanted: BTreeSet<&InstanceId> = candidates.iter().collect();
    let mut selected = Vec::with_capacity(count);
    for node in nodes {
        if selected.len() == count {
            break;
        }
        let remote_id = match lookup(node) {
            Ok(id) => id,
            Err(err) => {
                debug!(node_id = %node.id, error = %err, "skipping node without remote id");
                continue;
            }
        };
        if wanted.contains(&remote_id) {
            selected.push(SelectedNode {
                node_id: node.id.clone(),
                remote_id,
            });
        } else {
            debug!(
                node_id = %node.id,
                remote_id = %remote_id,
                "skipping node not eligible in fleet"
            );
        }
    }

    if selected.len() < count {
        return Err(NodePoolError::InsufficientCapacity {
            requested: count,
            available: selected.len(),
        });
    }
    Ok(NodeRemovalSelection::new(selected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn node(id: &str, hostname: Option<&str>) -> ClusterNode {
        let base = ClusterNode::new(id);
        match hostname {
            Some(host) => base.with_attribute(NODE_HOSTNAME_ATTRIBUTE, host),
            None => base,
        }
    }

    fn ids(raw: &[&str]) -> Vec<InstanceId> {
        raw.iter().map(|id| InstanceId::from(*id)).collect()
    }

    #[rstest]
    fn remote_id_reads_hostname_attribute() {
        let id = remote_id_for_node(&node("n1", Some("i-abc"))).expect("mapped");
        assert_eq!(id, InstanceId::from("i-abc"));
    }

    #[rstest]
    fn remote_id_fails_without_attribute() {
        let err = remote_id_for_node(&node("n1", None)).expect_err("unmapped");
        assert_eq!(
            err,
            NodeIdError::AttributeNotFound {
                node_id: String::from("n1"),
                attribute: NODE_HOSTNAME_ATTRIBUTE,
            }
        );
    }

    #[rstest]
    fn selection_skips_unmapped_and_foreign_nodes() {
        let nodes = [
            node("n1", None),
            node("n2", Some("i-foreign")),
            node("n3", Some("i-b")),
            node("n4", Some("i-a")),
            node("n5", Some("i-c")),
        ];
        let selection =
            select_by_remote_id(&nodes, &ids(&["i-a", "i-b", "i-c"]), 2, remote_id_for_node)
                .expect("selection");
        assert_eq!(selection.remote_ids(), ids(&["i-b", "i-a"]));
        let node_ids: Vec<&str> = selection.nodes().iter().map(|n| n.node_id.as_str()).collect();
        assert_eq!(node_ids, ["n3", "n4"]);
    }

    #[rstest]
    fn selection_fails_when_too_few_nodes_match() {
        let nodes = [node("n1", Some("i-a"))];
        let err = select_by_remote_id(&nodes, &ids(&["i-a", "i-b"]), 2, remote_id_for_node)
            .expect_err("insufficient");
        assert_eq!(
            err,
            NodePoolError::InsufficientCapacity {
                requested: 2,
                available: 1
            }
        );
    }
}
