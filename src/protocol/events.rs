use super::messages::StatsReply;
use crate::types::{PortNo, SwitchId, TopologySnapshot};

/// A switch forwarded a packet no rule matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketIn {
    pub switch: SwitchId,
    pub in_port: PortNo,
    /// Switch buffer holding the packet, if it kept one.
    pub buffer_id: Option<u32>,
    /// Raw frame, starting at the Ethernet header.
    pub data: Vec<u8>,
}

/// Everything the engine reacts to, delivered in order on its queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    SwitchConnected { switch: SwitchId },
    SwitchDisconnected { switch: SwitchId },
    TopologyChanged(TopologySnapshot),
    PacketIn(PacketIn),
    StatsReply { switch: SwitchId, reply: StatsReply },
}
