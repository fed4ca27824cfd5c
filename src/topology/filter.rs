use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::network::edge::Edge;
use crate::network::node::{Node, NodeId};
use crate::topology::graph::TopologyGraph;
use crate::topology::route::RouteResolver;

/// Fixed opacity for nodes/edges that are only visible because they sit on
/// a matched node's route.
pub const DIM_OPACITY: f32 = 0.25;

/// Visibility classification of a node or edge under an active filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityTier {
    /// Matched the filter (or no filter active): fully visible.
    Full,
    /// On a matched node's route to the root: visible but dimmed.
    Dimmed,
    Hidden,
}

impl VisibilityTier {
    pub fn visible(&self) -> bool {
        *self != VisibilityTier::Hidden
    }

    pub fn opacity(&self) -> f32 {
        match self {
            VisibilityTier::Full => 1.0,
            VisibilityTier::Dimmed => DIM_OPACITY,
            VisibilityTier::Hidden => 0.0,
        }
    }
}

/// Result of one filter application: a tier for every node and every derived
/// edge. Transient state, owned by the caller; re-running `apply` with the
/// same predicate over an unchanged graph yields an identical result.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityResult {
    nodes: BTreeMap<NodeId, VisibilityTier>,
    edges: Vec<(Edge, VisibilityTier)>,
    /// True when the predicate matched nothing and the filter degraded to a
    /// reset (everything fully visible).
    pub is_reset: bool,
}

impl VisibilityResult {
    pub fn node_tier(&self, id: NodeId) -> VisibilityTier {
        self.nodes
            .get(&id)
            .copied()
            .unwrap_or(VisibilityTier::Hidden)
    }

    pub fn edges(&self) -> &[(Edge, VisibilityTier)] {
        &self.edges
    }

    pub fn visible_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, t)| t.visible())
            .map(|(id, _)| *id)
    }
}

/// Classifies the whole graph under a node predicate.
///
/// Matched nodes stay fully visible; every node on any match's route to the
/// root is dimmed; the rest are hidden. The designated gateway root is
/// always kept visible so the map retains its anchor. Edges follow their
/// endpoints. The classification is a pure function of graph state, the
/// derived edge set, and the predicate.
pub struct FilterEngine;

impl FilterEngine {
    pub fn apply<P>(
        graph: &TopologyGraph,
        edges: &[Edge],
        predicate: P,
    ) -> VisibilityResult
    where
        P: Fn(&Node) -> bool,
    {
        let matches: BTreeSet<NodeId> = graph
            .iter()
            .filter(|n| predicate(n))
            .map(|n| n.id())
            .collect();

        // An empty match set means filter-reset, not "hide everything".
        if matches.is_empty() {
            return Self::reset(graph, edges);
        }

        let mut routes: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut path_nodes: BTreeSet<NodeId> = BTreeSet::new();
        for &id in &matches {
            let path = RouteResolver::resolve(graph, id);
            path_nodes.extend(path.nodes.iter().copied());
            routes.insert(id, path.nodes);
        }

        // The gateway anchor is always part of the visible picture.
        if let Some(gateway) = graph.gateway_root() {
            path_nodes.insert(gateway.id());
        }

        let mut nodes = BTreeMap::new();
        for node in graph.iter() {
            let id = node.id();
            let tier = if matches.contains(&id) {
                VisibilityTier::Full
            } else if path_nodes.contains(&id) {
                VisibilityTier::Dimmed
            } else {
                VisibilityTier::Hidden
            };
            nodes.insert(id, tier);
        }

        let mut classified = Vec::with_capacity(edges.len());
        for edge in edges {
            let from_visible = nodes
                .get(&edge.from)
                .is_some_and(VisibilityTier::visible);
            let to_visible = nodes.get(&edge.to).is_some_and(VisibilityTier::visible);
            if !from_visible || !to_visible {
                classified.push((*edge, VisibilityTier::Hidden));
                continue;
            }
            let full = matches.contains(&edge.from)
                || matches.contains(&edge.to)
                || Self::is_final_hop(edge, &matches, &routes);
            let tier = if full {
                VisibilityTier::Full
            } else {
                VisibilityTier::Dimmed
            };
            classified.push((*edge, tier));
        }

        VisibilityResult {
            nodes,
            edges: classified,
            is_reset: false,
        }
    }

    /// Whether `edge` is the last segment of a matched node's route, i.e.
    /// connects the match to its immediate routing parent.
    fn is_final_hop(
        edge: &Edge,
        matches: &BTreeSet<NodeId>,
        routes: &HashMap<NodeId, Vec<NodeId>>,
    ) -> bool {
        for &m in matches {
            if let Some(route) = routes.get(&m) {
                if route.len() >= 2 {
                    let (a, b) = (route[0], route[1]);
                    if (edge.from == a && edge.to == b) || (edge.from == b && edge.to == a) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn reset(graph: &TopologyGraph, edges: &[Edge]) -> VisibilityResult {
        let nodes = graph
            .ids()
            .map(|id| (id, VisibilityTier::Full))
            .collect();
        let edges = edges.iter().map(|e| (*e, VisibilityTier::Full)).collect();
        VisibilityResult {
            nodes,
            edges,
            is_reset: true,
        }
    }
}
