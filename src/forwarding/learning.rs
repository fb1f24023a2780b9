use std::collections::HashMap;

use log::debug;
use pnet::util::MacAddr;

use super::{ForwardingDecision, ForwardingStrategy};
use crate::error::Result;
use crate::protocol::messages::{FlowMatch, OutputPort};
use crate::types::{PacketMeta, PortNo, SwitchId};

/// Plain L2 learning switch: each switch learns on which port every source
/// address lives and floods until the destination has been seen.
#[derive(Debug, Clone, Default)]
pub struct LearningSwitch {
    mac_to_port: HashMap<SwitchId, HashMap<MacAddr, PortNo>>,
}

impl LearningSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port_of(&self, switch: SwitchId, address: &MacAddr) -> Option<PortNo> {
        self.mac_to_port.get(&switch)?.get(address).copied()
    }
}

impl ForwardingStrategy for LearningSwitch {
    fn name(&self) -> &'static str {
        "learning"
    }

    fn switch_disconnected(&mut self, switch: SwitchId) {
        self.mac_to_port.remove(&switch);
    }

    fn decide(&mut self, packet: &PacketMeta) -> Result<ForwardingDecision> {
        let table = self.mac_to_port.entry(packet.switch).or_default();
        table.insert(packet.src, packet.in_port);

        let match_key = FlowMatch::forward(packet.in_port, packet.dst);
        let decision = match table.get(&packet.dst) {
            Some(&port) => ForwardingDecision::forward(OutputPort::Physical(port), match_key),
            None => {
                debug!("Switch {:x} has not learned {}, flooding", packet.switch, packet.dst);
                ForwardingDecision::flood(match_key)
            }
        };
        Ok(decision)
    }
}
