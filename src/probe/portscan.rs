use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::probe::snapshot::NodeSnapshot;
use crate::probe::source::PortScanSource;
use crate::probe::task::{ProbeEvent, ProbeHandle, ProbeKind, ProbeState};
use crate::probe::{ConnectivityProbe, task::ProbeCtx};

/// Per-port connect timeout.
pub const DEFAULT_PORT_TIMEOUT: Duration = Duration::from_millis(200);

/// Parses a user-entered port list: comma-separated values and inclusive
/// ranges, e.g. `"22,80,443"` or `"1-1024"`. Entries that do not parse as
/// ports are skipped.
pub fn parse_ports(input: &str) -> Vec<u16> {
    let mut ports = Vec::new();
    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((start, end)) = part.split_once('-') {
            if let (Ok(start), Ok(end)) = (start.trim().parse::<u16>(), end.trim().parse::<u16>())
            {
                ports.extend(start..=end);
            }
        } else if let Ok(port) = part.parse::<u16>() {
            ports.push(port);
        }
    }
    ports
}

impl ConnectivityProbe {
    /// Scans `ports` on the node in order, emitting one event per open port
    /// and a progress event per port tried. A refused or failed connect
    /// simply means closed. Nodes in never-probed categories complete
    /// immediately without touching the source.
    pub fn scan_ports(
        &self,
        snapshot: NodeSnapshot,
        ports: Vec<u16>,
        banner_detection: bool,
        source: Arc<dyn PortScanSource>,
        timeout: Duration,
    ) -> ProbeHandle {
        let (handle, ctx) = ProbeCtx::new(ProbeKind::PortScan, self.event_sender());
        self.runtime().spawn(async move {
            ctx.start();

            if !snapshot.probe_applicable {
                ctx.finish(ProbeState::Completed);
                return;
            }

            let address = snapshot.probe_address().to_string();
            let total = ports.len();
            for (scanned, port) in ports.into_iter().enumerate() {
                let open = tokio::select! {
                    _ = ctx.cancelled().cancelled() => {
                        ctx.finish(ProbeState::Cancelled);
                        return;
                    }
                    outcome = source.connect(&address, port, timeout) => match outcome {
                        Ok(open) => open,
                        Err(e) => {
                            debug!(address, port, error = %e, "connect failed, port treated as closed");
                            false
                        }
                    }
                };
                if open {
                    let banner = if banner_detection {
                        source
                            .read_banner(&address, port, timeout)
                            .await
                            .map(|b| b.trim().to_string())
                            .filter(|b| !b.is_empty())
                    } else {
                        None
                    };
                    ctx.emit(ProbeEvent::PortOpen {
                        node_id: snapshot.id,
                        port,
                        banner,
                    });
                }
                ctx.emit(ProbeEvent::PortScanProgress {
                    scanned: scanned + 1,
                    total,
                });
            }
            ctx.finish(ProbeState::Completed);
        });
        handle
    }
}
