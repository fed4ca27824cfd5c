use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::probe::arp::{ArpRow, is_hardware_address};
use crate::probe::snapshot::NodeSnapshot;
use crate::probe::source::{ArpSource, NameSource};
use crate::probe::task::{ProbeEvent, ProbeHandle, ProbeKind, ProbeState};
use crate::probe::{ConnectivityProbe, task::ProbeCtx};

/// Ephemeral record for an endpoint seen in the ARP table that does not
/// correspond to any known node. The UI may promote it into a `Node`;
/// otherwise it is discarded at the end of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredEndpoint {
    pub address: String,
    pub hardware_address: String,
    pub hostname: Option<String>,
    pub source_interface: String,
}

impl ConnectivityProbe {
    /// Enumerates local interfaces from an ARP snapshot and yields the
    /// endpoints not already present in the graph (matched by exact address
    /// or resolved address). Broadcast/multicast and non-dynamic entries are
    /// dropped the way the OS table is conventionally filtered; rows the
    /// adapter could not parse simply never reach us.
    pub fn discover(
        &self,
        known: Vec<NodeSnapshot>,
        arp: Arc<dyn ArpSource>,
        names: Arc<dyn NameSource>,
    ) -> ProbeHandle {
        let (handle, ctx) = ProbeCtx::new(ProbeKind::Discovery, self.event_sender());
        self.runtime().spawn(async move {
            ctx.start();

            let rows = tokio::select! {
                _ = ctx.cancelled().cancelled() => {
                    ctx.finish(ProbeState::Cancelled);
                    return;
                }
                fetched = arp.fetch() => match fetched {
                    Ok(rows) => rows,
                    Err(e) => {
                        warn!(error = %e, "ARP fetch failed");
                        ctx.finish(ProbeState::Failed);
                        return;
                    }
                }
            };

            let interface_count = rows
                .iter()
                .filter(|r| matches!(r, ArpRow::Interface(_)))
                .count();
            ctx.emit(ProbeEvent::InterfaceCount(interface_count));

            let mut known_addresses: HashSet<String> = HashSet::new();
            for snapshot in &known {
                known_addresses.insert(snapshot.address.clone());
                if let Some(resolved) = &snapshot.resolved_address {
                    known_addresses.insert(resolved.clone());
                }
            }

            let mut current_interface: Option<String> = None;
            for row in rows {
                if ctx.is_cancelled() {
                    ctx.finish(ProbeState::Cancelled);
                    return;
                }
                match row {
                    ArpRow::Interface(name) => {
                        ctx.emit(ProbeEvent::InterfaceDiscovered(name.clone()));
                        current_interface = Some(name);
                    }
                    ArpRow::Entry(entry) => {
                        // Entries before the first interface header have no
                        // usable context.
                        let Some(interface) = current_interface.clone() else {
                            continue;
                        };
                        if known_addresses.contains(&entry.address) {
                            debug!(address = entry.address, "suppressing already-known endpoint");
                            continue;
                        }
                        if !entry.entry_type.eq_ignore_ascii_case("dynamic")
                            || !is_hardware_address(&entry.hardware_address)
                            || entry.address.ends_with(".255")
                            || entry.address.starts_with("224.")
                            || entry.address.starts_with("239.")
                        {
                            continue;
                        }
                        let hostname = names
                            .reverse_lookup(&entry.address)
                            .await
                            .filter(|h| !h.is_empty() && h != &entry.address);
                        ctx.emit(ProbeEvent::EndpointDiscovered(DiscoveredEndpoint {
                            address: entry.address,
                            hardware_address: entry.hardware_address,
                            hostname,
                            source_interface: interface,
                        }));
                    }
                }
            }
            ctx.finish(ProbeState::Completed);
        });
        handle
    }
}
