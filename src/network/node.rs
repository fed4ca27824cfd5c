use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Stable node identifier. Ids are assigned monotonically by the graph and
/// never reused, even after deletion. `0` is reserved for "not yet assigned".
pub type NodeId = u64;

pub const UNASSIGNED_ID: NodeId = 0;

/// Device category of a node. Serialized in the legacy SCREAMING_SNAKE_CASE
/// form so persisted files from older builds keep loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceKind {
    Computer,
    UnmanagedSwitch,
    ManagedSwitch,
    Laptop,
    Server,
    Router,
    Gateway,
    Phone,
    Tv,
    SecurityCamera,
    VirtualMachine,
    WirelessAccessPoint,
}

/// Static per-kind presentation/behavior data. Kept as a lookup table so the
/// shell can render icons and labels without switching over the enum.
pub struct KindDescriptor {
    pub label: &'static str,
    pub icon: &'static str,
    /// Whether reachability probes make sense for this kind at all.
    /// Unmanaged switches have no address to answer on.
    pub probeable: bool,
}

static KIND_DESCRIPTORS: Lazy<HashMap<DeviceKind, KindDescriptor>> = Lazy::new(|| {
    use DeviceKind::*;
    let mut map = HashMap::new();
    let mut put = |kind, label, icon, probeable| {
        map.insert(
            kind,
            KindDescriptor {
                label,
                icon,
                probeable,
            },
        );
    };
    put(Computer, "Computer", "host.png", true);
    put(UnmanagedSwitch, "Unmanaged Switch", "switch.png", false);
    put(ManagedSwitch, "Managed Switch", "switch.png", true);
    put(Laptop, "Laptop", "laptop.png", true);
    put(Server, "Server", "server.png", true);
    put(Router, "Router", "gateway.png", true);
    put(Gateway, "Gateway", "gateway.png", true);
    put(Phone, "Phone", "phone.png", true);
    put(Tv, "TV", "tv.png", true);
    put(SecurityCamera, "Security Camera", "security_camera.png", true);
    put(VirtualMachine, "Virtual Machine", "virtual_machine.png", true);
    put(
        WirelessAccessPoint,
        "Wireless Access Point",
        "wap.png",
        true,
    );
    map
});

impl DeviceKind {
    pub fn descriptor(&self) -> &'static KindDescriptor {
        // The table covers every variant, so the lookup cannot miss.
        &KIND_DESCRIPTORS[self]
    }
}

/// Coarse network placement of a node. Drives fallback routing when a node
/// carries no explicit routing reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkLocation {
    Local,
    Public,
    RemotePrivate,
}

impl NetworkLocation {
    pub fn label(&self) -> &'static str {
        match self {
            NetworkLocation::Local => "Local Network",
            NetworkLocation::Public => "Public Network",
            NetworkLocation::RemotePrivate => "Remote Private Network",
        }
    }

    /// Whether a direct connection to the device is possible from here.
    pub fn directly_accessible(&self) -> bool {
        *self != NetworkLocation::RemotePrivate
    }

    /// Whether a ping is expected to succeed. Only local devices are
    /// guaranteed reachable; remote private ones never answer.
    pub fn pingable(&self) -> bool {
        *self == NetworkLocation::Local
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionKind {
    Ethernet,
    Wireless,
    Virtual,
}

/// Reachability state of a node as last reported by a probe. Probe outcomes
/// are reflected here rather than surfaced as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Reachability {
    #[default]
    Unknown,
    Up,
    Down,
    /// Probing was skipped because the node belongs to a never-probed
    /// category (remote private network, unmanaged switch).
    NotApplicable,
}

/// Layout data carried through persistence for the rendering layer. The
/// engine never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct NodeLayout {
    pub width: f64,
    pub height: f64,
    pub relative_x: f64,
    pub relative_y: f64,
}

/// A device in the topology.
///
/// The id is immutable after creation; every other field is owned by the
/// single-threaded graph context and mutated there. `route_via_id` and
/// `host_node_id` are routing references to other nodes by id; dangling
/// values are tolerated by the resolver and treated as "no route".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    pub display_name: String,
    pub address: String,
    pub device_kind: DeviceKind,
    pub network_location: NetworkLocation,
    pub connection_kind: ConnectionKind,
    /// A root node terminates route resolution (the host/gateway anchors).
    pub is_root: bool,
    /// Explicit routing parent, e.g. an uplink switch.
    pub route_via_id: Option<NodeId>,
    /// Hypervisor host, meaningful only for `DeviceKind::VirtualMachine`.
    pub host_node_id: Option<NodeId>,
    /// Result of asynchronous name resolution, if any.
    pub resolved_address: Option<String>,
    pub reachable: Reachability,
    pub layout: NodeLayout,
}

impl Node {
    /// Creates a brand-new node with no id yet. `TopologyGraph::add_node`
    /// assigns the next free id on insertion.
    pub fn new(
        display_name: impl Into<String>,
        address: impl Into<String>,
        device_kind: DeviceKind,
        network_location: NetworkLocation,
    ) -> Self {
        Self {
            id: UNASSIGNED_ID,
            display_name: display_name.into(),
            address: address.into(),
            device_kind,
            network_location,
            connection_kind: ConnectionKind::Ethernet,
            is_root: false,
            route_via_id: None,
            host_node_id: None,
            resolved_address: None,
            reachable: Reachability::Unknown,
            layout: NodeLayout::default(),
        }
    }

    /// Recreates a node from persisted state with its stored id. This is the
    /// only way to construct a node with an explicit id; the field itself
    /// stays immutable.
    pub fn restore(
        id: NodeId,
        display_name: impl Into<String>,
        address: impl Into<String>,
        device_kind: DeviceKind,
        network_location: NetworkLocation,
    ) -> Self {
        let mut node = Self::new(display_name, address, device_kind, network_location);
        node.id = id;
        node
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: NodeId) {
        debug_assert_eq!(self.id, UNASSIGNED_ID);
        self.id = id;
    }

    pub fn with_connection(mut self, kind: ConnectionKind) -> Self {
        self.connection_kind = kind;
        self
    }

    pub fn with_route_via(mut self, id: NodeId) -> Self {
        self.route_via_id = Some(id);
        self
    }

    pub fn with_host_node(mut self, id: NodeId) -> Self {
        self.host_node_id = Some(id);
        self
    }

    pub fn as_root(mut self) -> Self {
        self.is_root = true;
        self
    }

    /// Address a probe should target: the cached resolved address when name
    /// resolution has run, otherwise the configured address as-is.
    pub fn probe_address(&self) -> &str {
        self.resolved_address.as_deref().unwrap_or(&self.address)
    }

    /// Whether reachability probing applies to this node at all. Remote
    /// private devices and unmanaged switches are never probed.
    pub fn probe_applicable(&self) -> bool {
        self.device_kind.descriptor().probeable
            && self.network_location != NetworkLocation::RemotePrivate
    }
}
