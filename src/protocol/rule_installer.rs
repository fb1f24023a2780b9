use std::sync::Arc;

use log::debug;
use tokio::sync::mpsc;

use super::messages::*;
use crate::error::{ControllerError, Result};
use crate::types::{PortNo, SwitchId};

/// Outbound side of the switch connections.
///
/// Submissions are fire-and-forget: an `Ok` means the command was queued, not
/// that the switch applied it.
pub trait SwitchChannel: Send + Sync {
    fn send(&self, switch: SwitchId, message: OutboundMessage) -> Result<()>;
}

/// Queues every command on an unbounded tokio channel for a writer task.
#[derive(Debug, Clone)]
pub struct MpscSwitchChannel {
    tx: mpsc::UnboundedSender<(SwitchId, OutboundMessage)>,
}

impl MpscSwitchChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(SwitchId, OutboundMessage)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SwitchChannel for MpscSwitchChannel {
    fn send(&self, switch: SwitchId, message: OutboundMessage) -> Result<()> {
        self.tx
            .send((switch, message))
            .map_err(|_| ControllerError::ChannelClosed { switch })
    }
}

/// Builds flow-mods, packet-outs and stats requests and hands them to the
/// channel. Shared by every forwarding strategy and by the monitor.
#[derive(Clone)]
pub struct RuleInstaller {
    channel: Arc<dyn SwitchChannel>,
}

impl RuleInstaller {
    pub fn new(channel: Arc<dyn SwitchChannel>) -> Self {
        Self { channel }
    }

    /// Lowest-priority catch-all sending whole packets to the controller.
    pub fn install_table_miss(&self, switch: SwitchId) -> Result<()> {
        debug!("Installing table-miss rule on switch {:x}", switch);
        self.install(
            switch,
            TABLE_MISS_PRIORITY,
            FlowMatch::wildcard(),
            OutputPort::Controller { max_len: NO_BUFFER },
        )
    }

    pub fn install_forward(
        &self,
        switch: SwitchId,
        flow_match: FlowMatch,
        output: OutputPort,
        priority: u16,
    ) -> Result<()> {
        debug!(
            "Installing rule on switch {:x}: in_port={:?} eth_dst={:?} -> {} (priority {})",
            switch, flow_match.in_port, flow_match.eth_dst, output, priority
        );
        self.install(switch, priority, flow_match, output)
    }

    pub fn packet_out(
        &self,
        switch: SwitchId,
        buffer: PacketBuffer,
        in_port: PortNo,
        output: OutputPort,
    ) -> Result<()> {
        self.channel.send(
            switch,
            OutboundMessage::PacketOut(PacketOut {
                buffer,
                in_port,
                actions: vec![Action::Output(output)],
            }),
        )
    }

    pub fn request_stats(&self, switch: SwitchId) -> Result<()> {
        self.channel
            .send(switch, OutboundMessage::StatsRequest(StatsRequest::Port))?;
        self.channel
            .send(switch, OutboundMessage::StatsRequest(StatsRequest::Flow))?;
        debug!("Sent stats requests to switch {:x}", switch);
        Ok(())
    }

    fn install(
        &self,
        switch: SwitchId,
        priority: u16,
        flow_match: FlowMatch,
        output: OutputPort,
    ) -> Result<()> {
        self.channel.send(
            switch,
            OutboundMessage::FlowMod(FlowMod {
                priority,
                flow_match,
                actions: vec![Action::Output(output)],
                apply_immediately: true,
            }),
        )
    }
}
