/*!
Asynchronous connectivity probes.

This module defines:
- `source`: small async traits the application shell implements to supply
            parsed ping/ARP/traceroute data (the shell owns the actual OS
            commands; the engine only consumes their results).
- `task`: the uniform probe task plumbing: per-probe state machine,
            cancellation token, and the single event queue that delivers
            every result back to the owning thread.
- `snapshot`: read-only copies of node identifying data handed to workers,
            so no worker ever touches a live graph node.
- `reachability`, `discovery`, `trace`, `portscan`: the probe operations.

Every probe follows Idle -> Running -> {Completed | Cancelled | Failed} and
reports its outcome as events/state, never as a process-fatal error.
*/

pub mod arp;
pub mod discovery;
pub mod portscan;
pub mod reachability;
pub mod snapshot;
pub mod source;
pub mod task;
pub mod trace;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;

pub use arp::{ArpEntry, ArpRow, parse_arp_table};
pub use discovery::DiscoveredEndpoint;
pub use portscan::parse_ports;
pub use snapshot::NodeSnapshot;
pub use source::{
    ArpSource, NameSource, PingSource, PortScanSource, ProbeError, ProbeResult, TraceSource,
};
pub use task::{EventQueue, ProbeEvent, ProbeHandle, ProbeKind, ProbeState};
pub use trace::TraceHop;

use crate::topology::graph::TopologyGraph;

/// Entry point for launching probes. One instance is shared by the owning
/// thread; each operation spawns its own worker task and returns a handle
/// carrying the cancellation token and the live state.
pub struct ConnectivityProbe {
    runtime: Handle,
    events: UnboundedSender<ProbeEvent>,
}

impl ConnectivityProbe {
    /// `events` is the sender half of the owning thread's `EventQueue`.
    pub fn new(runtime: Handle, events: UnboundedSender<ProbeEvent>) -> Self {
        Self { runtime, events }
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub(crate) fn event_sender(&self) -> UnboundedSender<ProbeEvent> {
        self.events.clone()
    }
}

/// Folds a drained probe event into graph state. Must be called on the
/// owning thread; this is the only place probe results mutate nodes.
pub fn apply_event(graph: &mut TopologyGraph, event: &ProbeEvent) {
    if let ProbeEvent::Reachability { node_id, state, .. } = event {
        if let Some(node) = graph.get_mut(*node_id) {
            node.reachable = *state;
        }
    }
}
