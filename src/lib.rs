/*!
Core engine for a network monitor: topology graph, route resolution,
derived connection edges, filter-driven visibility, and asynchronous
connectivity probes.

Structure:
- `network`: node and edge data model (device kinds, locations, reachability).
- `topology`: the graph registry plus the route/edge/filter/persistence
              machinery that keeps derived state consistent.
- `probe`: asynchronous reachability/discovery/traceroute operations and
           the matching of their results back onto the graph.

The rendering layer, dialogs and the literal OS commands used to obtain
ARP/ping/traceroute output live outside this crate; the probe module only
consumes their parsed results through small async traits.
*/

pub mod network;
pub mod probe;
pub mod topology;

pub use network::node::{
    ConnectionKind, DeviceKind, NetworkLocation, Node, NodeId, Reachability,
};
pub use topology::graph::TopologyGraph;
