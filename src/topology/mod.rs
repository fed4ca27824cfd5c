/*!
Topology module

This module owns the node registry and everything derived from it.

Structure:
- `graph`: `TopologyGraph`, the single source of truth for nodes and their
           routing references, with monotonic id allocation.
- `route`: `RouteResolver`, the deterministic node-to-root path computation
           with cycle protection.
- `edge_sync`: `ConnectionEdgeSync`, regeneration of derived connection
           edges after structural changes, single node or recursive.
- `filter`: `FilterEngine`, visibility/opacity classification of the whole
           graph under a node predicate.
- `persist`: the persisted node record schema and (de)serialization into a
           `TopologyGraph`.

All of these run on the owning (single-writer) thread; none are thread-safe.
Probe workers only ever see read-only snapshots taken from here.
*/

pub mod edge_sync;
pub mod filter;
pub mod graph;
pub mod persist;
pub mod route;

pub use edge_sync::ConnectionEdgeSync;
pub use filter::{FilterEngine, VisibilityResult, VisibilityTier};
pub use graph::{GraphError, TopologyGraph};
pub use route::{RouteOutcome, RoutePath, RouteResolver};
