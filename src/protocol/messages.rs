use pnet::util::MacAddr;
use std::fmt;

use crate::types::PortNo;

/// Priority of the table-miss rule; every other rule must be above it.
pub const TABLE_MISS_PRIORITY: u16 = 0;

/// Default priority of rules learned from packet-ins.
pub const DEFAULT_FORWARD_PRIORITY: u16 = 1;

/// Controller max length asking the switch to send the whole packet unbuffered.
pub const NO_BUFFER: u16 = 0xffff;

/// Where an output action sends the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputPort {
    Physical(PortNo),
    /// Every port except the ingress port.
    Flood,
    Controller { max_len: u16 },
}

impl fmt::Display for OutputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputPort::Physical(port) => write!(f, "{}", port),
            OutputPort::Flood => write!(f, "FLOOD"),
            OutputPort::Controller { .. } => write!(f, "CONTROLLER"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Output(OutputPort),
}

/// Match fields; `None` is a wildcard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FlowMatch {
    pub in_port: Option<PortNo>,
    pub eth_dst: Option<MacAddr>,
}

impl FlowMatch {
    pub fn wildcard() -> Self {
        Self::default()
    }

    pub fn forward(in_port: PortNo, eth_dst: MacAddr) -> Self {
        Self {
            in_port: Some(in_port),
            eth_dst: Some(eth_dst),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.in_port.is_none() && self.eth_dst.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowMod {
    pub priority: u16,
    pub flow_match: FlowMatch,
    pub actions: Vec<Action>,
    /// Actions are applied as soon as the rule matches.
    pub apply_immediately: bool,
}

/// The packet a packet-out refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketBuffer {
    /// Held in the switch buffer under this id.
    Buffered(u32),
    /// Sent back in full by the controller.
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketOut {
    pub buffer: PacketBuffer,
    pub in_port: PortNo,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsRequest {
    /// Counters of every port.
    Port,
    /// Entries of every table.
    Flow,
}

/// Commands handed to the switch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    FlowMod(FlowMod),
    PacketOut(PacketOut),
    StatsRequest(StatsRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortStats {
    pub port_no: PortNo,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub rx_errors: u64,
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub tx_errors: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStats {
    pub priority: u16,
    pub flow_match: FlowMatch,
    pub actions: Vec<Action>,
    pub packet_count: u64,
    pub byte_count: u64,
}

/// Body of a stats reply from a switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsReply {
    Port(Vec<PortStats>),
    Flow(Vec<FlowStats>),
}
