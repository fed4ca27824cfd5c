use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::network::node::Reachability;
use crate::probe::snapshot::NodeSnapshot;
use crate::probe::source::PingSource;
use crate::probe::task::{ProbeEvent, ProbeHandle, ProbeKind, ProbeState};
use crate::probe::{ConnectivityProbe, task::ProbeCtx};

/// Default upper bound for one reachability check.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(2);

impl ConnectivityProbe {
    /// Tests whether the node answers within `timeout`. Nodes in never-probed
    /// categories short-circuit to `NotApplicable` without touching the
    /// source. Timeouts and source failures are reflected as reachability
    /// state, not errors.
    pub fn probe_reachability(
        &self,
        snapshot: NodeSnapshot,
        source: Arc<dyn PingSource>,
        timeout: Duration,
    ) -> ProbeHandle {
        let (handle, ctx) = ProbeCtx::new(ProbeKind::Reachability, self.event_sender());
        self.runtime().spawn(async move {
            ctx.start();

            if !snapshot.probe_applicable {
                ctx.emit(ProbeEvent::Reachability {
                    node_id: snapshot.id,
                    state: Reachability::NotApplicable,
                    latency: None,
                });
                ctx.finish(ProbeState::Completed);
                return;
            }

            let address = snapshot.probe_address().to_string();
            let ping = source.ping(&address, timeout);
            tokio::select! {
                _ = ctx.cancelled().cancelled() => {
                    ctx.finish(ProbeState::Cancelled);
                }
                outcome = tokio::time::timeout(timeout, ping) => {
                    match outcome {
                        // Per-probe timeout: treated as "did not answer".
                        Err(_) => {
                            ctx.emit(ProbeEvent::Reachability {
                                node_id: snapshot.id,
                                state: Reachability::Down,
                                latency: None,
                            });
                            ctx.finish(ProbeState::Completed);
                        }
                        Ok(Ok(latency)) => {
                            let state = if latency.is_some() {
                                Reachability::Up
                            } else {
                                Reachability::Down
                            };
                            ctx.emit(ProbeEvent::Reachability {
                                node_id: snapshot.id,
                                state,
                                latency,
                            });
                            ctx.finish(ProbeState::Completed);
                        }
                        Ok(Err(e)) => {
                            warn!(node = snapshot.id, address, error = %e, "reachability probe failed");
                            ctx.emit(ProbeEvent::Reachability {
                                node_id: snapshot.id,
                                state: Reachability::Unknown,
                                latency: None,
                            });
                            ctx.finish(ProbeState::Failed);
                        }
                    }
                }
            }
        });
        handle
    }
}
