/*!
Uniform probe task plumbing.

Every probe operation gets the same shape: a `ProbeHandle` for the caller
(cancellation + observable state) and a `ProbeCtx` for the worker (state
publishing + event emission, both cancellation-aware). All results from all
probes flow through one `EventQueue` drained on the owning thread, which
keeps graph mutation strictly single-threaded and serialized with edge
invalidation and filtering.
*/

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::network::node::{NodeId, Reachability};
use crate::probe::discovery::DiscoveredEndpoint;
use crate::probe::trace::TraceHop;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Reachability,
    Discovery,
    Trace,
    PortScan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl ProbeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProbeState::Completed | ProbeState::Cancelled | ProbeState::Failed
        )
    }
}

/// A probe result or progress notification, delivered on the owning thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeEvent {
    Reachability {
        node_id: NodeId,
        state: Reachability,
        latency: Option<Duration>,
    },
    InterfaceCount(usize),
    InterfaceDiscovered(String),
    EndpointDiscovered(DiscoveredEndpoint),
    TraceHop(TraceHop),
    PortOpen {
        node_id: NodeId,
        port: u16,
        banner: Option<String>,
    },
    PortScanProgress {
        scanned: usize,
        total: usize,
    },
    /// Terminal notification; exactly one per probe, always last.
    Finished { kind: ProbeKind, state: ProbeState },
}

/// Owning-thread side of the probe dispatch. Create one per graph context,
/// hand `sender()` to `ConnectivityProbe`, and call `drain()` from the
/// owning thread between structural operations.
pub struct EventQueue {
    tx: UnboundedSender<ProbeEvent>,
    rx: UnboundedReceiver<ProbeEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> UnboundedSender<ProbeEvent> {
        self.tx.clone()
    }

    /// Takes every event delivered so far without blocking.
    pub fn drain(&mut self) -> Vec<ProbeEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller-side handle for one in-flight probe.
pub struct ProbeHandle {
    kind: ProbeKind,
    cancel: CancellationToken,
    state: watch::Receiver<ProbeState>,
}

impl ProbeHandle {
    pub fn kind(&self) -> ProbeKind {
        self.kind
    }

    pub fn state(&self) -> ProbeState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Requests cancellation. The worker stops promptly; results already
    /// delivered stay valid, and no further result events follow the
    /// acknowledgement.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits until the probe reaches a terminal state and returns it.
    pub async fn finished(&mut self) -> ProbeState {
        loop {
            let current = *self.state.borrow();
            if current.is_terminal() {
                return current;
            }
            if self.state.changed().await.is_err() {
                return *self.state.borrow();
            }
        }
    }
}

/// Worker-side context: publishes state and emits events, suppressing both
/// once cancellation has been acknowledged.
pub(crate) struct ProbeCtx {
    kind: ProbeKind,
    cancel: CancellationToken,
    state: watch::Sender<ProbeState>,
    events: UnboundedSender<ProbeEvent>,
}

impl ProbeCtx {
    pub(crate) fn new(
        kind: ProbeKind,
        events: UnboundedSender<ProbeEvent>,
    ) -> (ProbeHandle, ProbeCtx) {
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(ProbeState::Idle);
        let handle = ProbeHandle {
            kind,
            cancel: cancel.clone(),
            state: state_rx,
        };
        let ctx = ProbeCtx {
            kind,
            cancel,
            state: state_tx,
            events,
        };
        (handle, ctx)
    }

    pub(crate) fn start(&self) {
        let _ = self.state.send(ProbeState::Running);
    }

    pub(crate) fn cancelled(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Emits a result event unless the probe was cancelled in the meantime.
    pub(crate) fn emit(&self, event: ProbeEvent) {
        if self.is_cancelled() {
            debug!(kind = ?self.kind, "dropping event after cancellation");
            return;
        }
        let _ = self.events.send(event);
    }

    /// Publishes the terminal state and the trailing `Finished` event.
    pub(crate) fn finish(&self, state: ProbeState) {
        let _ = self.state.send(state);
        let _ = self.events.send(ProbeEvent::Finished {
            kind: self.kind,
            state,
        });
    }
}
