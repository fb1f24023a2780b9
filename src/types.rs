use pnet::util::MacAddr;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Datapath id of an OpenFlow switch.
pub type SwitchId = u64;

/// Physical port number on a switch.
pub type PortNo = u32;

/// A vertex of the topology graph.
///
/// The derived ordering puts every switch before every host, then orders by
/// datapath id or link-layer address. Path search relies on it to visit
/// neighbours deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Node {
    Switch(SwitchId),
    Host(MacAddr),
}

impl Node {
    pub fn as_switch(&self) -> Option<SwitchId> {
        match self {
            Node::Switch(id) => Some(*id),
            Node::Host(_) => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Switch(id) => write!(f, "s{:x}", id),
            Node::Host(mac) => write!(f, "{}", mac),
        }
    }
}

/// One directed inter-switch link: leaving `src` through `port` reaches `dst`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkDescriptor {
    pub src: SwitchId,
    pub dst: SwitchId,
    pub port: PortNo,
}

impl LinkDescriptor {
    pub fn new(src: SwitchId, dst: SwitchId, port: PortNo) -> Self {
        Self { src, dst, port }
    }

    /// Both directions of a physical link, each with its own egress port.
    pub fn bidirectional(a: SwitchId, a_port: PortNo, b: SwitchId, b_port: PortNo) -> [Self; 2] {
        [Self::new(a, b, a_port), Self::new(b, a, b_port)]
    }
}

/// Switches and links reported by topology discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    #[serde(default)]
    pub switches: Vec<SwitchId>,
    #[serde(default)]
    pub links: Vec<LinkDescriptor>,
}

/// Identities pulled out of a packet-in once its Ethernet header parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketMeta {
    pub switch: SwitchId,
    pub in_port: PortNo,
    pub src: MacAddr,
    pub dst: MacAddr,
}
