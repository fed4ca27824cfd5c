use serde::{Deserialize, Serialize};

use crate::network::node::NodeId;

/// Why a derived edge exists. Mirrors the resolver's hop priority: explicit
/// uplink first, then VM host, then location fallback; `Backbone` is the
/// mutual mesh between un-routed root nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Uplink,
    VmHost,
    Fallback,
    Backbone,
}

/// A derived connection from a node to its immediate routing parent.
///
/// Edges are always recomputed from node routing state by the edge sync;
/// they are never independent truth and are not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// The routing parent (resolved first hop).
    pub from: NodeId,
    /// The node the edge was derived for.
    pub to: NodeId,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn touches(&self, id: NodeId) -> bool {
        self.from == id || self.to == id
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.from, self.to, self.kind)
    }
}

/// Canonical undirected identity of an edge, used to deduplicate the mutual
/// backbone edges between root nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub a: NodeId,
    pub b: NodeId,
    pub kind: EdgeKind,
}

impl EdgeKey {
    pub fn new(a: NodeId, b: NodeId, kind: EdgeKind) -> Self {
        let (a, b) = if a < b { (a, b) } else { (b, a) };
        EdgeKey { a, b, kind }
    }

    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.a, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_key_is_order_independent() {
        let k1 = EdgeKey::new(4, 9, EdgeKind::Backbone);
        let k2 = EdgeKey::new(9, 4, EdgeKind::Backbone);
        assert_eq!(k1, k2);
        assert_eq!(k1.endpoints(), (4, 9));
    }

    #[test]
    fn touches_checks_both_endpoints() {
        let e = Edge {
            from: 1,
            to: 2,
            kind: EdgeKind::Uplink,
        };
        assert!(e.touches(1));
        assert!(e.touches(2));
        assert!(!e.touches(3));
    }
}
