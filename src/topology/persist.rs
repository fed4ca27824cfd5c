/*!
Persisted node records.

The on-disk format is an order-independent JSON list of per-node records in
the legacy camelCase schema, so files written by older builds keep loading.
Ids are restored exactly as stored and advance the graph's allocator; the
`routeViaDisplayName`/`hostNodeDisplayName` fields are display-only caches
and are re-derived from the ids on every save.
*/

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::network::node::{
    ConnectionKind, DeviceKind, NetworkLocation, Node, NodeId, NodeLayout, UNASSIGNED_ID,
};
use crate::topology::graph::{GraphError, TopologyGraph};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to parse persisted nodes: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid node record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
}

/// One persisted node, field-for-field the legacy schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: NodeId,
    pub address: String,
    pub display_name: String,
    pub device_kind: DeviceKind,
    pub network_location: NetworkLocation,
    pub connection_kind: ConnectionKind,
    pub is_main_node: bool,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub relative_x: f64,
    #[serde(default)]
    pub relative_y: f64,
    #[serde(default)]
    pub route_via_id: Option<NodeId>,
    #[serde(default)]
    pub host_node_id: Option<NodeId>,
    /// Display-only cache; the id above is authoritative.
    #[serde(default)]
    pub route_via_display_name: Option<String>,
    #[serde(default)]
    pub host_node_display_name: Option<String>,
}

impl NodeRecord {
    fn into_node(self) -> Node {
        let mut node = Node::restore(
            self.id,
            self.display_name,
            self.address,
            self.device_kind,
            self.network_location,
        );
        node.connection_kind = self.connection_kind;
        node.is_root = self.is_main_node;
        node.route_via_id = self.route_via_id;
        node.host_node_id = self.host_node_id;
        node.layout = NodeLayout {
            width: self.width,
            height: self.height,
            relative_x: self.relative_x,
            relative_y: self.relative_y,
        };
        node
    }

    fn from_node(node: &Node, graph: &TopologyGraph) -> Self {
        // Re-derive the name caches from the authoritative ids.
        let name_of = |id: Option<NodeId>| {
            id.and_then(|id| graph.get(id))
                .map(|n| n.display_name.clone())
        };
        NodeRecord {
            id: node.id(),
            address: node.address.clone(),
            display_name: node.display_name.clone(),
            device_kind: node.device_kind,
            network_location: node.network_location,
            connection_kind: node.connection_kind,
            is_main_node: node.is_root,
            width: node.layout.width,
            height: node.layout.height,
            relative_x: node.layout.relative_x,
            relative_y: node.layout.relative_y,
            route_via_id: node.route_via_id,
            host_node_id: node.host_node_id,
            route_via_display_name: name_of(node.route_via_id),
            host_node_display_name: name_of(node.host_node_id),
        }
    }
}

/// Builds a graph from persisted records. Ids are authoritative; legacy
/// self-references are cleared with a warning rather than rejected, and a
/// record whose id collides with one already loaded is skipped with a
/// warning (the first record wins). Only a record without a usable id
/// fails the load.
pub fn load_records(records: Vec<NodeRecord>) -> Result<TopologyGraph, PersistError> {
    let mut graph = TopologyGraph::new();
    for (index, record) in records.into_iter().enumerate() {
        if record.id == UNASSIGNED_ID {
            return Err(PersistError::InvalidRecord {
                index,
                reason: "node id must be non-zero".to_string(),
            });
        }
        let node = TopologyGraph::sanitize_restored(record.into_node());
        match graph.add_node(node) {
            Ok(_) => {}
            Err(GraphError::DuplicateId(id)) => {
                warn!(index, id, "skipping duplicate node record");
            }
            Err(other) => {
                return Err(PersistError::InvalidRecord {
                    index,
                    reason: other.to_string(),
                });
            }
        }
    }
    Ok(graph)
}

pub fn load_nodes(json: &str) -> Result<TopologyGraph, PersistError> {
    let records: Vec<NodeRecord> = serde_json::from_str(json)?;
    load_records(records)
}

pub fn to_records(graph: &TopologyGraph) -> Vec<NodeRecord> {
    graph
        .iter()
        .map(|node| NodeRecord::from_node(node, graph))
        .collect()
}

pub fn save_nodes(graph: &TopologyGraph) -> Result<String, PersistError> {
    Ok(serde_json::to_string_pretty(&to_records(graph))?)
}
