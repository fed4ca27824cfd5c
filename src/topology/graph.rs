use std::collections::BTreeMap;

use thiserror::Error;
use tracing::warn;

use crate::network::node::{DeviceKind, NetworkLocation, Node, NodeId, UNASSIGNED_ID};

#[derive(Debug, Clone, Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NotFound(NodeId),
    #[error("node id already in use: {0}")]
    DuplicateId(NodeId),
    #[error("node {0} references itself")]
    SelfReference(NodeId),
}

/// The node registry: the single source of truth for topology structure.
///
/// Ids are allocated monotonically and never reused; loading persisted nodes
/// with pre-existing ids advances the allocator past the highest one seen,
/// so later additions can never collide. The registry is keyed by a
/// `BTreeMap` on purpose: every "first match wins" lookup below iterates in
/// ascending id order and is therefore deterministic.
///
/// Not thread-safe. All mutation happens on the owning thread; probe workers
/// get read-only snapshots instead (see `probe::NodeSnapshot`).
#[derive(Debug)]
pub struct TopologyGraph {
    nodes: BTreeMap<NodeId, Node>,
    next_id: NodeId,
}

impl Default for TopologyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Inserts a node, assigning the next free id when the node carries the
    /// unassigned sentinel. Nodes restored with an explicit id keep it; the
    /// allocator is advanced past it either way.
    pub fn add_node(&mut self, mut node: Node) -> Result<NodeId, GraphError> {
        let id = if node.id() == UNASSIGNED_ID {
            let id = self.next_id;
            node.assign_id(id);
            id
        } else {
            node.id()
        };
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateId(id));
        }
        if node.route_via_id == Some(id) || node.host_node_id == Some(id) {
            return Err(GraphError::SelfReference(id));
        }
        self.next_id = self.next_id.max(id + 1);
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Removes a node and clears any other node's routing reference to it,
    /// converting those nodes to "unrouted" so location fallback applies on
    /// their next resolution.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, GraphError> {
        let removed = self.nodes.remove(&id).ok_or(GraphError::NotFound(id))?;
        for node in self.nodes.values_mut() {
            if node.route_via_id == Some(id) {
                node.route_via_id = None;
            }
            if node.host_node_id == Some(id) {
                node.host_node_id = None;
            }
        }
        Ok(removed)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Legacy/UI convenience lookup. Id-based lookup is authoritative;
    /// display names are not unique and the lowest id wins.
    pub fn find_by_display_name(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.display_name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The designated gateway anchor: a root node of gateway kind.
    pub fn gateway_root(&self) -> Option<&Node> {
        self.nodes
            .values()
            .find(|n| n.is_root && n.device_kind == DeviceKind::Gateway)
    }

    pub fn any_root(&self) -> Option<&Node> {
        self.nodes.values().find(|n| n.is_root)
    }

    pub fn first_by_location(&self, location: NetworkLocation) -> Option<&Node> {
        self.nodes
            .values()
            .find(|n| n.network_location == location)
    }

    /// Ids of all nodes routing through `id` via either reference kind.
    /// Used by the recursive edge invalidation walk.
    pub fn dependents_of(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.route_via_id == Some(id) || n.host_node_id == Some(id))
            .map(|n| n.id())
            .collect()
    }

    /// Validates a freshly loaded node against the live registry, clearing
    /// malformed legacy routing data instead of refusing the node. Returns
    /// the node ready for insertion.
    pub(crate) fn sanitize_restored(mut node: Node) -> Node {
        let id = node.id();
        if node.route_via_id == Some(id) {
            warn!(node = id, "clearing self-referential routeViaId from persisted data");
            node.route_via_id = None;
        }
        if node.host_node_id == Some(id) {
            warn!(node = id, "clearing self-referential hostNodeId from persisted data");
            node.host_node_id = None;
        }
        node
    }
}
