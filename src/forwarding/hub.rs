use super::{ForwardingDecision, ForwardingStrategy};
use crate::error::Result;
use crate::protocol::messages::{FlowMatch, OutputPort};
use crate::types::PacketMeta;

/// Floods everything and installs a catch-all flood rule so the switch stops
/// asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hub;

impl ForwardingStrategy for Hub {
    fn name(&self) -> &'static str {
        "hub"
    }

    fn decide(&mut self, _packet: &PacketMeta) -> Result<ForwardingDecision> {
        Ok(ForwardingDecision::forward(OutputPort::Flood, FlowMatch::wildcard()))
    }
}
