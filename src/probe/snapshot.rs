use crate::network::node::{Node, NodeId};
use crate::topology::graph::TopologyGraph;

/// Read-only copy of a node's identifying data, taken at probe submission
/// time. Workers match and probe against these; they never see live nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub address: String,
    pub resolved_address: Option<String>,
    pub display_name: String,
    pub probe_applicable: bool,
}

impl NodeSnapshot {
    pub fn of(node: &Node) -> Self {
        Self {
            id: node.id(),
            address: node.address.clone(),
            resolved_address: node.resolved_address.clone(),
            display_name: node.display_name.clone(),
            probe_applicable: node.probe_applicable(),
        }
    }

    /// The address a probe should target (resolved address when cached).
    pub fn probe_address(&self) -> &str {
        self.resolved_address.as_deref().unwrap_or(&self.address)
    }
}

/// Snapshots the whole registry in ascending id order, which is what makes
/// "first match wins" deterministic for discovery and trace matching.
pub fn snapshot_all(graph: &TopologyGraph) -> Vec<NodeSnapshot> {
    graph.iter().map(NodeSnapshot::of).collect()
}
