/*!
Collaborator interfaces the probe engine consumes from the application
shell. Adapters wrap however the data is actually obtained (OS commands,
raw sockets, test stubs) and hand the engine parsed results.
*/

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::probe::arp::ArpRow;

#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    /// Underlying acquisition/IO error from the adapter.
    #[error("probe source error: {0}")]
    Source(String),
    #[error("probe timed out")]
    Timeout,
    #[error("probe cancelled")]
    Cancelled,
}

pub type ProbeResult<T> = Result<T, ProbeError>;

/// Answers whether a single address responds within the timeout.
/// `Ok(Some(latency))` means reachable, `Ok(None)` means no answer.
#[async_trait]
pub trait PingSource: Send + Sync {
    async fn ping(&self, address: &str, timeout: Duration) -> ProbeResult<Option<Duration>>;
}

/// Supplies a snapshot of the local ARP table as parsed rows, in original
/// order (interface headers interleaved with their entries).
#[async_trait]
pub trait ArpSource: Send + Sync {
    async fn fetch(&self) -> ProbeResult<Vec<ArpRow>>;
}

/// Reverse name lookup for discovered addresses. Returning `None` (or the
/// address itself) means no name is known.
#[async_trait]
pub trait NameSource: Send + Sync {
    async fn reverse_lookup(&self, address: &str) -> Option<String>;
}

/// Runs a bounded-hop trace toward a target and returns the ordered hop
/// strings: a resolved address per hop, the literal `"Timeout"` marker for
/// hops that did not answer, or the target address as the final entry.
#[async_trait]
pub trait TraceSource: Send + Sync {
    async fn trace(
        &self,
        target: &str,
        max_hops: usize,
        per_hop_timeout: Duration,
    ) -> ProbeResult<Vec<String>>;
}

/// TCP connect check for a single port. `Ok(true)` means the port accepted
/// a connection within the timeout; `banner` reads whatever the service
/// sends first (adapters without banner support keep the default).
#[async_trait]
pub trait PortScanSource: Send + Sync {
    async fn connect(&self, address: &str, port: u16, timeout: Duration) -> ProbeResult<bool>;

    async fn read_banner(
        &self,
        _address: &str,
        _port: u16,
        _timeout: Duration,
    ) -> Option<String> {
        None
    }
}
