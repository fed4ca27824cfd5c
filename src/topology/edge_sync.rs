use std::collections::HashSet;

use crate::network::edge::{Edge, EdgeKind};
use crate::network::node::{Node, NodeId};
use crate::topology::graph::TopologyGraph;
use crate::topology::route::{NextHop, RouteResolver};

/// Keeps the derived connection edges consistent with node routing state.
///
/// Edges are a pure function of the routing fields: one edge per node,
/// pointing at its resolved first hop, plus the mutual backbone mesh between
/// un-routed root nodes. Any routing change must be followed by
/// `invalidate` (or `invalidate_recursive` when nodes downstream terminate
/// their routes through the changed node), otherwise the visual graph goes
/// stale.
#[derive(Debug, Default)]
pub struct ConnectionEdgeSync {
    edges: Vec<Edge>,
}

impl ConnectionEdgeSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edges_for(&self, id: NodeId) -> Vec<Edge> {
        self.edges.iter().filter(|e| e.touches(id)).copied().collect()
    }

    /// Drops every edge touching `id` and recomputes the node's own edge
    /// from its current routing state. Call after the node was added,
    /// rerouted, or removed (in the removal case no new edge appears).
    pub fn invalidate(&mut self, graph: &TopologyGraph, id: NodeId) {
        self.edges.retain(|e| !e.touches(id));
        if let Some(node) = graph.get(id) {
            self.derive_edge(graph, node);
        }
    }

    /// Invalidates `id` and then every node routing through it, transitively.
    /// The visited set mirrors the resolver's cycle guard so reference loops
    /// in legacy data cannot recurse forever.
    pub fn invalidate_recursive(&mut self, graph: &TopologyGraph, id: NodeId) {
        let mut visited = HashSet::new();
        self.invalidate_inner(graph, id, &mut visited);
    }

    fn invalidate_inner(
        &mut self,
        graph: &TopologyGraph,
        id: NodeId,
        visited: &mut HashSet<NodeId>,
    ) {
        if !visited.insert(id) {
            return;
        }
        // When `id` was just removed, the survivors' references to it are
        // already cleared and `dependents_of` sees nothing; the old edges
        // are the only remaining record of who routed through it. Capture
        // those children before `invalidate` drops them.
        let mut affected: Vec<NodeId> = self
            .edges
            .iter()
            .filter(|e| e.from == id)
            .map(|e| e.to)
            .collect();
        self.invalidate(graph, id);
        affected.extend(graph.dependents_of(id));
        for dependent in affected {
            self.invalidate_inner(graph, dependent, visited);
        }
    }

    /// Throws the whole edge set away and regenerates it from scratch, as
    /// done once after loading a persisted graph.
    pub fn rebuild(&mut self, graph: &TopologyGraph) {
        self.edges.clear();
        for id in graph.ids().collect::<Vec<_>>() {
            if let Some(node) = graph.get(id) {
                self.derive_edge(graph, node);
            }
        }
    }

    /// Appends the edge(s) for one node without removing anything first.
    fn derive_edge(&mut self, graph: &TopologyGraph, node: &Node) {
        match RouteResolver::next_hop(graph, node) {
            NextHop::Via(parent, kind) => {
                self.edges.push(Edge {
                    from: parent,
                    to: node.id(),
                    kind,
                });
            }
            NextHop::Root => {
                // Top-level anchor: mesh with the other roots that also
                // resolve to Root. A root still carrying a live routing or
                // host reference hangs off that reference instead.
                for other in graph.iter() {
                    if other.id() != node.id()
                        && matches!(RouteResolver::next_hop(graph, other), NextHop::Root)
                    {
                        self.push_backbone(node.id(), other.id());
                    }
                }
            }
            NextHop::Dead => {
                // Unresolved route: the node simply renders without an edge.
            }
        }
    }

    fn push_backbone(&mut self, a: NodeId, b: NodeId) {
        let key = crate::network::edge::EdgeKey::new(a, b, EdgeKind::Backbone);
        if self.edges.iter().any(|e| e.key() == key) {
            return;
        }
        let (from, to) = key.endpoints();
        self.edges.push(Edge {
            from,
            to,
            kind: EdgeKind::Backbone,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::node::{DeviceKind, NetworkLocation};

    struct Fixture {
        graph: TopologyGraph,
        sync: ConnectionEdgeSync,
        gateway: NodeId,
        host: NodeId,
        switch: NodeId,
        pc: NodeId,
    }

    fn fixture() -> Fixture {
        let mut graph = TopologyGraph::new();
        let host = graph
            .add_node(
                Node::new("Host", "10.0.0.2", DeviceKind::Computer, NetworkLocation::Local)
                    .as_root(),
            )
            .unwrap();
        let gateway = graph
            .add_node(
                Node::new(
                    "Gateway",
                    "10.0.0.1",
                    DeviceKind::Gateway,
                    NetworkLocation::Local,
                )
                .as_root(),
            )
            .unwrap();
        let switch = graph
            .add_node(
                Node::new(
                    "SwitchA",
                    "10.0.0.3",
                    DeviceKind::UnmanagedSwitch,
                    NetworkLocation::Local,
                )
                .with_route_via(gateway),
            )
            .unwrap();
        let pc = graph
            .add_node(
                Node::new("PC1", "10.0.0.4", DeviceKind::Computer, NetworkLocation::Local)
                    .with_route_via(switch),
            )
            .unwrap();
        let mut sync = ConnectionEdgeSync::new();
        sync.rebuild(&graph);
        Fixture {
            graph,
            sync,
            gateway,
            host,
            switch,
            pc,
        }
    }

    #[test]
    fn rebuild_derives_one_edge_per_routed_node_plus_backbone() {
        let f = fixture();
        // switch->gateway uplink, pc->switch uplink, host--gateway backbone.
        assert_eq!(f.sync.edges().len(), 3);
        assert!(f.sync.edges().contains(&Edge {
            from: f.gateway,
            to: f.switch,
            kind: EdgeKind::Uplink
        }));
        assert!(f.sync.edges().contains(&Edge {
            from: f.switch,
            to: f.pc,
            kind: EdgeKind::Uplink
        }));
        let backbone: Vec<_> = f
            .sync
            .edges()
            .iter()
            .filter(|e| e.kind == EdgeKind::Backbone)
            .collect();
        assert_eq!(backbone.len(), 1);
        assert!(backbone[0].touches(f.host) && backbone[0].touches(f.gateway));
    }

    #[test]
    fn invalidate_recomputes_after_reroute() {
        let mut f = fixture();
        f.graph.get_mut(f.pc).unwrap().route_via_id = Some(f.gateway);
        f.sync.invalidate(&f.graph, f.pc);
        assert_eq!(
            f.sync.edges_for(f.pc),
            vec![Edge {
                from: f.gateway,
                to: f.pc,
                kind: EdgeKind::Uplink
            }]
        );
    }

    #[test]
    fn recursive_invalidation_reaches_transitive_dependents_only() {
        let mut f = fixture();
        let unrelated = f
            .graph
            .add_node(
                Node::new("tv", "10.0.0.9", DeviceKind::Tv, NetworkLocation::Local)
                    .with_route_via(f.gateway),
            )
            .unwrap();
        f.sync.rebuild(&f.graph);
        let unrelated_before = f.sync.edges_for(unrelated);

        // Invalidating the switch alone removes the pc edge too (it touches
        // the switch); the recursive walk must restore it.
        f.sync.invalidate_recursive(&f.graph, f.switch);
        assert_eq!(f.sync.edges_for(f.pc).len(), 1);
        assert_eq!(f.sync.edges_for(f.switch).len(), 2);
        assert_eq!(f.sync.edges_for(unrelated), unrelated_before);
    }

    #[test]
    fn recursive_invalidation_survives_reference_cycles() {
        let mut f = fixture();
        // a <-> b loop off to the side.
        let a = f
            .graph
            .add_node(Node::new(
                "a",
                "10.0.2.1",
                DeviceKind::Router,
                NetworkLocation::Local,
            ))
            .unwrap();
        let b = f
            .graph
            .add_node(
                Node::new("b", "10.0.2.2", DeviceKind::Router, NetworkLocation::Local)
                    .with_route_via(a),
            )
            .unwrap();
        f.graph.get_mut(a).unwrap().route_via_id = Some(b);
        f.sync.invalidate_recursive(&f.graph, a);
        // Both looped nodes end with exactly one derived edge between them.
        assert!(f.sync.edges_for(a).iter().all(|e| e.touches(b)));
    }

    #[test]
    fn deleting_a_routing_parent_falls_back_cleanly() {
        let mut f = fixture();
        f.graph.remove_node(f.switch).unwrap();
        f.sync.invalidate_recursive(&f.graph, f.switch);
        // pc lost its uplink and now falls back to the gateway root.
        assert_eq!(
            f.sync.edges_for(f.pc),
            vec![Edge {
                from: f.gateway,
                to: f.pc,
                kind: EdgeKind::Fallback
            }]
        );
        assert!(f.sync.edges_for(f.switch).is_empty());
    }

    #[test]
    fn deleting_a_parent_rederives_grandchildren() {
        let mut f = fixture();
        let printer = f
            .graph
            .add_node(
                Node::new(
                    "printer",
                    "10.0.0.8",
                    DeviceKind::Server,
                    NetworkLocation::Local,
                )
                .with_route_via(f.pc),
            )
            .unwrap();
        f.sync.rebuild(&f.graph);

        f.graph.remove_node(f.switch).unwrap();
        f.sync.invalidate_recursive(&f.graph, f.switch);

        assert!(f.sync.edges_for(f.pc).contains(&Edge {
            from: f.gateway,
            to: f.pc,
            kind: EdgeKind::Fallback
        }));
        // pc's own edge churn must not lose the grandchild's uplink.
        assert_eq!(
            f.sync.edges_for(printer),
            vec![Edge {
                from: f.pc,
                to: printer,
                kind: EdgeKind::Uplink
            }]
        );
    }

    #[test]
    fn root_with_live_reference_is_not_meshed() {
        let mut f = fixture();
        // Malformed legacy data: a root VM still carrying a host reference.
        let vm = f
            .graph
            .add_node(
                Node::new(
                    "vm",
                    "10.0.0.30",
                    DeviceKind::VirtualMachine,
                    NetworkLocation::Local,
                )
                .with_host_node(f.host)
                .as_root(),
            )
            .unwrap();
        f.sync.rebuild(&f.graph);

        let backbone: Vec<_> = f
            .sync
            .edges()
            .iter()
            .filter(|e| e.kind == EdgeKind::Backbone)
            .collect();
        assert_eq!(backbone.len(), 1);
        assert!(!backbone[0].touches(vm));
        assert_eq!(
            f.sync.edges_for(vm),
            vec![Edge {
                from: f.host,
                to: vm,
                kind: EdgeKind::VmHost
            }]
        );
    }

    #[test]
    fn backbone_edges_are_not_duplicated() {
        let mut f = fixture();
        f.sync.invalidate(&f.graph, f.host);
        f.sync.invalidate(&f.graph, f.gateway);
        let backbone = f
            .sync
            .edges()
            .iter()
            .filter(|e| e.kind == EdgeKind::Backbone)
            .count();
        assert_eq!(backbone, 1);
    }

    #[test]
    fn unresolved_nodes_carry_no_edge() {
        let mut graph = TopologyGraph::new();
        let lonely = graph
            .add_node(Node::new(
                "lonely",
                "10.0.0.1",
                DeviceKind::Computer,
                NetworkLocation::Local,
            ))
            .unwrap();
        let mut sync = ConnectionEdgeSync::new();
        sync.rebuild(&graph);
        assert!(sync.edges_for(lonely).is_empty());
    }
}
