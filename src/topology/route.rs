use std::collections::HashSet;

use tracing::{debug, warn};

use crate::network::edge::EdgeKind;
use crate::network::node::{DeviceKind, NetworkLocation, Node, NodeId};
use crate::topology::graph::TopologyGraph;

/// Next hop decision for a single node, shared by path resolution and edge
/// regeneration so both always agree on who the routing parent is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextHop {
    /// Route continues through this node.
    Via(NodeId, EdgeKind),
    /// The node is a terminal root; resolution ends successfully.
    Root,
    /// No explicit route and no fallback candidate exists.
    Dead,
}

/// How a resolved path ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Path ends at a root node.
    Complete,
    /// Resolution gave up: no fallback hop existed. The path is partial.
    Unresolved,
    /// A routing reference loop was cut by the visited-id guard.
    CycleDetected,
}

/// Ordered path from a node toward the network root, starting at the node
/// itself. Always non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePath {
    pub nodes: Vec<NodeId>,
    pub outcome: RouteOutcome,
}

impl RoutePath {
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// The resolved first hop (the node's routing parent), if any.
    pub fn first_hop(&self) -> Option<NodeId> {
        self.nodes.get(1).copied()
    }
}

/// Computes node-to-root paths over a `TopologyGraph`.
///
/// Hop priority, in order: explicit `route_via_id`, VM host reference, root
/// termination, location-based fallback. Dangling references (a deleted
/// node's id) are logged and fall through to the next rule rather than
/// failing. The visited-id set is the only cycle-safety mechanism; legacy
/// persisted files can carry reference loops and must resolve finitely.
pub struct RouteResolver;

impl RouteResolver {
    /// Decides the immediate next hop for `node`. Deterministic: every
    /// fallback lookup scans the registry in ascending id order.
    pub fn next_hop(graph: &TopologyGraph, node: &Node) -> NextHop {
        if let Some(via) = node.route_via_id {
            if graph.contains(via) {
                return NextHop::Via(via, EdgeKind::Uplink);
            }
            warn!(node = node.id(), via, "dangling routeViaId, falling back");
        }

        if node.device_kind == DeviceKind::VirtualMachine {
            if let Some(host) = node.host_node_id {
                if graph.contains(host) {
                    return NextHop::Via(host, EdgeKind::VmHost);
                }
                warn!(node = node.id(), host, "dangling hostNodeId, falling back");
            }
        }

        if node.is_root {
            return NextHop::Root;
        }

        let candidate = match node.network_location {
            NetworkLocation::Public => graph.gateway_root(),
            // A remote private device reaches us through some public node;
            // failing that, any root. Picking "any root" can be
            // topologically misleading but is the established behavior.
            NetworkLocation::RemotePrivate => graph
                .first_by_location(NetworkLocation::Public)
                .or_else(|| graph.any_root()),
            NetworkLocation::Local => graph.gateway_root(),
        };

        match candidate {
            Some(hop) => NextHop::Via(hop.id(), EdgeKind::Fallback),
            None => NextHop::Dead,
        }
    }

    /// Resolves the ordered path from `start` toward a root node.
    ///
    /// Terminates in at most N+1 steps for a graph of N nodes and always
    /// returns a path containing at least the starting node, even when the
    /// start id is unknown.
    pub fn resolve(graph: &TopologyGraph, start: NodeId) -> RoutePath {
        let mut nodes = Vec::new();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut current = start;

        loop {
            nodes.push(current);
            visited.insert(current);

            let node = match graph.get(current) {
                Some(n) => n,
                None => {
                    // Unknown id: nothing to resolve past it.
                    return RoutePath {
                        nodes,
                        outcome: RouteOutcome::Unresolved,
                    };
                }
            };

            match Self::next_hop(graph, node) {
                NextHop::Root => {
                    return RoutePath {
                        nodes,
                        outcome: RouteOutcome::Complete,
                    };
                }
                NextHop::Dead => {
                    debug!(node = current, "route resolution gave up, partial path");
                    return RoutePath {
                        nodes,
                        outcome: RouteOutcome::Unresolved,
                    };
                }
                NextHop::Via(next, _) => {
                    if visited.contains(&next) {
                        warn!(
                            node = start,
                            repeated = next,
                            "routing cycle detected, terminating path"
                        );
                        return RoutePath {
                            nodes,
                            outcome: RouteOutcome::CycleDetected,
                        };
                    }
                    current = next;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::node::ConnectionKind;

    fn graph_with_anchors() -> (TopologyGraph, NodeId, NodeId) {
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
        (graph, host, gateway)
    }

    #[test]
    fn explicit_route_wins_over_everything() {
        let (mut graph, _host, gateway) = graph_with_anchors();
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

        let path = RouteResolver::resolve(&graph, pc);
        assert_eq!(path.nodes, vec![pc, switch, gateway]);
        assert_eq!(path.outcome, RouteOutcome::Complete);
        assert_eq!(path.first_hop(), Some(switch));
    }

    #[test]
    fn vm_routes_through_its_host() {
        let (mut graph, host, _gateway) = graph_with_anchors();
        let vm = graph
            .add_node(
                Node::new(
                    "vm",
                    "10.0.0.10",
                    DeviceKind::VirtualMachine,
                    NetworkLocation::Local,
                )
                .with_connection(ConnectionKind::Virtual)
                .with_host_node(host),
            )
            .unwrap();
        let path = RouteResolver::resolve(&graph, vm);
        assert_eq!(path.nodes, vec![vm, host]);
        assert_eq!(path.outcome, RouteOutcome::Complete);
    }

    #[test]
    fn host_reference_only_applies_to_virtual_machines() {
        let (mut graph, host, gateway) = graph_with_anchors();
        let pc = graph
            .add_node(
                Node::new("pc", "10.0.0.11", DeviceKind::Computer, NetworkLocation::Local)
                    .with_host_node(host),
            )
            .unwrap();
        let path = RouteResolver::resolve(&graph, pc);
        // Not a VM, so the host reference is ignored and fallback applies.
        assert_eq!(path.nodes, vec![pc, gateway]);
    }

    #[test]
    fn local_nodes_fall_back_to_the_gateway_root() {
        let (mut graph, _host, gateway) = graph_with_anchors();
        let pc = graph
            .add_node(Node::new(
                "pc",
                "10.0.0.12",
                DeviceKind::Computer,
                NetworkLocation::Local,
            ))
            .unwrap();
        let path = RouteResolver::resolve(&graph, pc);
        assert_eq!(path.nodes, vec![pc, gateway]);
        assert_eq!(path.outcome, RouteOutcome::Complete);
    }

    #[test]
    fn remote_private_prefers_a_public_node() {
        let (mut graph, _host, _gateway) = graph_with_anchors();
        let proxy = graph
            .add_node(Node::new(
                "proxy",
                "203.0.113.9",
                DeviceKind::Server,
                NetworkLocation::Public,
            ))
            .unwrap();
        let remote = graph
            .add_node(Node::new(
                "office-nas",
                "192.168.50.4",
                DeviceKind::Server,
                NetworkLocation::RemotePrivate,
            ))
            .unwrap();
        let path = RouteResolver::resolve(&graph, remote);
        assert_eq!(path.first_hop(), Some(proxy));
    }

    #[test]
    fn remote_private_uses_any_root_without_public_nodes() {
        let (mut graph, host, _gateway) = graph_with_anchors();
        let remote = graph
            .add_node(Node::new(
                "office-nas",
                "192.168.50.4",
                DeviceKind::Server,
                NetworkLocation::RemotePrivate,
            ))
            .unwrap();
        let path = RouteResolver::resolve(&graph, remote);
        // Host has the lowest id among roots, so it wins deterministically.
        assert_eq!(path.first_hop(), Some(host));
    }

    #[test]
    fn dangling_reference_falls_back_to_location_rules() {
        let (mut graph, _host, gateway) = graph_with_anchors();
        let switch = graph
            .add_node(Node::new(
                "switch",
                "10.0.0.5",
                DeviceKind::UnmanagedSwitch,
                NetworkLocation::Local,
            ))
            .unwrap();
        let pc = graph
            .add_node(
                Node::new("pc", "10.0.0.6", DeviceKind::Computer, NetworkLocation::Local)
                    .with_route_via(switch),
            )
            .unwrap();
        graph.remove_node(switch).unwrap();

        let path = RouteResolver::resolve(&graph, pc);
        assert_eq!(path.nodes, vec![pc, gateway]);
        assert_eq!(path.outcome, RouteOutcome::Complete);
    }

    #[test]
    fn cycles_terminate_with_a_finite_path() {
        let mut graph = TopologyGraph::new();
        let a = graph
            .add_node(Node::new(
                "a",
                "10.0.0.1",
                DeviceKind::Router,
                NetworkLocation::Local,
            ))
            .unwrap();
        let b = graph
            .add_node(
                Node::new("b", "10.0.0.2", DeviceKind::Router, NetworkLocation::Local)
                    .with_route_via(a),
            )
            .unwrap();
        graph.get_mut(a).unwrap().route_via_id = Some(b);

        let path = RouteResolver::resolve(&graph, a);
        assert_eq!(path.nodes, vec![a, b]);
        assert_eq!(path.outcome, RouteOutcome::CycleDetected);
    }

    #[test]
    fn no_fallback_candidate_yields_partial_path() {
        let mut graph = TopologyGraph::new();
        let lonely = graph
            .add_node(Node::new(
                "lonely",
                "10.0.0.1",
                DeviceKind::Computer,
                NetworkLocation::Local,
            ))
            .unwrap();
        let path = RouteResolver::resolve(&graph, lonely);
        assert_eq!(path.nodes, vec![lonely]);
        assert_eq!(path.outcome, RouteOutcome::Unresolved);
    }

    #[test]
    fn path_length_is_bounded_by_node_count_plus_one() {
        let (mut graph, _host, gateway) = graph_with_anchors();
        let mut prev = gateway;
        for i in 0..20 {
            prev = graph
                .add_node(
                    Node::new(
                        format!("sw{i}"),
                        format!("10.0.1.{i}"),
                        DeviceKind::ManagedSwitch,
                        NetworkLocation::Local,
                    )
                    .with_route_via(prev),
                )
                .unwrap();
        }
        for id in graph.ids().collect::<Vec<_>>() {
            let path = RouteResolver::resolve(&graph, id);
            assert!(!path.nodes.is_empty());
            assert!(path.nodes.len() <= graph.len() + 1);
        }
    }

    #[test]
    fn unknown_start_id_still_returns_itself() {
        let graph = TopologyGraph::new();
        let path = RouteResolver::resolve(&graph, 42);
        assert_eq!(path.nodes, vec![42]);
        assert_eq!(path.outcome, RouteOutcome::Unresolved);
    }
}
