use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::network::node::NodeId;
use crate::probe::snapshot::NodeSnapshot;
use crate::probe::source::TraceSource;
use crate::probe::task::{ProbeEvent, ProbeHandle, ProbeKind, ProbeState};
use crate::probe::{ConnectivityProbe, task::ProbeCtx};

/// Hop ceiling for a trace run.
pub const MAX_TRACE_HOPS: usize = 15;
/// Per-hop answer timeout handed to the trace source.
pub const DEFAULT_HOP_TIMEOUT: Duration = Duration::from_secs(1);

/// The literal marker a source emits for a hop that did not answer.
pub const TIMEOUT_MARKER: &str = "Timeout";

/// One hop of a completed or in-progress trace, matched against the graph
/// where possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceHop {
    pub index: usize,
    pub address: String,
    /// The known node this hop corresponds to, if any.
    pub node: Option<NodeId>,
    pub timed_out: bool,
}

/// Matches one hop address against the snapshots, in priority order: exact
/// address, then resolved address, then display-name substring. Each pass
/// scans snapshots in ascending id order, so a still-ambiguous substring
/// match resolves to the lowest id deterministically.
pub fn match_hop(snapshots: &[NodeSnapshot], hop: &str) -> Option<NodeId> {
    if hop == TIMEOUT_MARKER {
        return None;
    }
    if let Some(s) = snapshots.iter().find(|s| s.address == hop) {
        return Some(s.id);
    }
    if let Some(s) = snapshots
        .iter()
        .find(|s| s.resolved_address.as_deref() == Some(hop))
    {
        return Some(s.id);
    }
    snapshots
        .iter()
        .find(|s| {
            let name = s.display_name.as_str();
            !name.is_empty()
                && (hop.eq_ignore_ascii_case(name) || hop.contains(name) || name.contains(hop))
        })
        .map(|s| s.id)
}

impl ConnectivityProbe {
    /// Issues a bounded-hop trace toward `target` and emits one event per
    /// hop, each matched against the snapshots. Cancellation stops further
    /// hops; hops already delivered stay as they are.
    pub fn trace_path(
        &self,
        target: String,
        snapshots: Vec<NodeSnapshot>,
        source: Arc<dyn TraceSource>,
    ) -> ProbeHandle {
        let (handle, ctx) = ProbeCtx::new(ProbeKind::Trace, self.event_sender());
        self.runtime().spawn(async move {
            ctx.start();

            let hops = tokio::select! {
                _ = ctx.cancelled().cancelled() => {
                    ctx.finish(ProbeState::Cancelled);
                    return;
                }
                traced = source.trace(&target, MAX_TRACE_HOPS, DEFAULT_HOP_TIMEOUT) => {
                    match traced {
                        Ok(hops) => hops,
                        Err(e) => {
                            warn!(target, error = %e, "trace failed");
                            ctx.finish(ProbeState::Failed);
                            return;
                        }
                    }
                }
            };

            for (index, address) in hops.into_iter().enumerate() {
                if ctx.is_cancelled() {
                    ctx.finish(ProbeState::Cancelled);
                    return;
                }
                let timed_out = address == TIMEOUT_MARKER;
                let node = match_hop(&snapshots, &address);
                ctx.emit(ProbeEvent::TraceHop(TraceHop {
                    index,
                    address,
                    node,
                    timed_out,
                }));
            }
            ctx.finish(ProbeState::Completed);
        });
        handle
    }
}
