use log::{debug, error, info, warn};
use tokio::sync::{broadcast, mpsc};

use super::events::{ControllerEvent, PacketIn};
use super::messages::PacketBuffer;
use super::monitor;
use super::rule_installer::RuleInstaller;
use super::switch_registry::SharedSwitchRegistry;
use crate::error::Result;
use crate::forwarding::ForwardingStrategy;
use crate::packet;
use crate::types::SwitchId;

/// Single writer of all forwarding state.
///
/// Events are handled one at a time in arrival order, so a topology update
/// and a packet-in never interleave. An unrecoverable error stops the engine
/// and closes its queue.
pub struct ControllerEngine {
    strategy: Box<dyn ForwardingStrategy>,
    installer: RuleInstaller,
    registry: SharedSwitchRegistry,
    forward_priority: u16,
}

impl ControllerEngine {
    pub fn new(
        strategy: Box<dyn ForwardingStrategy>,
        installer: RuleInstaller,
        registry: SharedSwitchRegistry,
        forward_priority: u16,
    ) -> Self {
        Self {
            strategy,
            installer,
            registry,
            forward_priority,
        }
    }

    /// Processes events until the queue closes or shutdown is signalled.
    /// Events already queued at shutdown are still handled.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<ControllerEvent>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        info!("Controller engine started with {} forwarding", self.strategy.name());

        let result = self.process(&mut events, &mut shutdown_rx).await;
        match &result {
            Ok(()) => info!("Controller engine stopped"),
            Err(e) => error!("Controller engine stopped on unrecoverable error: {}", e),
        }
        result
    }

    async fn process(
        &mut self,
        events: &mut mpsc::Receiver<ControllerEvent>,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<()> {
        loop {
            tokio::select! {
                biased;
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await?,
                    None => return Ok(()),
                },
                _ = shutdown_rx.recv() => {
                    events.close();
                    while let Some(event) = events.recv().await {
                        self.handle_event(event).await?;
                    }
                    return Ok(());
                }
            }
        }
    }

    pub async fn handle_event(&mut self, event: ControllerEvent) -> Result<()> {
        match event {
            ControllerEvent::SwitchConnected { switch } => {
                self.handle_switch_connected(switch).await
            }
            ControllerEvent::SwitchDisconnected { switch } => {
                self.handle_switch_disconnected(switch).await
            }
            ControllerEvent::TopologyChanged(snapshot) => self.strategy.apply_snapshot(&snapshot),
            ControllerEvent::PacketIn(packet_in) => return self.handle_packet_in(packet_in),
            ControllerEvent::StatsReply { switch, reply } => {
                monitor::log_stats_reply(switch, &reply)
            }
        }
        Ok(())
    }

    async fn handle_switch_connected(&mut self, switch: SwitchId) {
        if self.registry.write().await.register(switch) {
            debug!("Register datapath {:016x}", switch);
        }
        if let Err(e) = self.installer.install_table_miss(switch) {
            error!("Failed to install table-miss rule on switch {:x}: {}", switch, e);
        }
    }

    async fn handle_switch_disconnected(&mut self, switch: SwitchId) {
        if let Some(info) = self.registry.write().await.unregister(switch) {
            debug!(
                "Unregister datapath {:016x}, connected since {}",
                switch, info.connected_at
            );
        }
        self.strategy.switch_disconnected(switch);
    }

    fn handle_packet_in(&mut self, packet_in: PacketIn) -> Result<()> {
        let parsed = packet::parse_frame(packet_in.switch, packet_in.in_port, &packet_in.data);
        let meta = match parsed {
            Ok(meta) => meta,
            Err(e) => {
                warn!("Dropping packet-in: {}", e);
                return Ok(());
            }
        };
        debug!(
            "packet in {:x} {} {} {}",
            meta.switch, meta.src, meta.dst, meta.in_port
        );

        let decision = self.strategy.decide(&meta)?;

        if decision.install_rule {
            if let Err(e) = self.installer.install_forward(
                meta.switch,
                decision.match_key,
                decision.output,
                self.forward_priority,
            ) {
                warn!("Failed to install rule on switch {:x}: {}", meta.switch, e);
            }
        }

        let buffer = match packet_in.buffer_id {
            Some(id) => PacketBuffer::Buffered(id),
            None => PacketBuffer::Raw(packet_in.data),
        };
        if let Err(e) = self
            .installer
            .packet_out(meta.switch, buffer, meta.in_port, decision.output)
        {
            warn!("Failed to send packet-out to switch {:x}: {}", meta.switch, e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControllerError;
    use crate::forwarding::{ForwardingDecision, Hub, LearningSwitch, ShortestPathForwarding};
    use crate::protocol::messages::*;
    use crate::protocol::rule_installer::MpscSwitchChannel;
    use crate::protocol::switch_registry::SwitchRegistry;
    use crate::types::{LinkDescriptor, PacketMeta, TopologySnapshot};
    use pnet::packet::ethernet::EtherTypes;
    use pnet::util::MacAddr;
    use std::sync::Arc;

    const HA: MacAddr = MacAddr(0, 0, 0, 0, 0, 0xa);
    const HB: MacAddr = MacAddr(0, 0, 0, 0, 0, 0xb);

    type Outbound = mpsc::UnboundedReceiver<(SwitchId, OutboundMessage)>;

    fn engine(
        strategy: Box<dyn ForwardingStrategy>,
    ) -> (ControllerEngine, SharedSwitchRegistry, Outbound) {
        let (channel, rx) = MpscSwitchChannel::new();
        let registry = SwitchRegistry::shared();
        let engine = ControllerEngine::new(
            strategy,
            RuleInstaller::new(Arc::new(channel)),
            registry.clone(),
            DEFAULT_FORWARD_PRIORITY,
        );
        (engine, registry, rx)
    }

    fn packet_in(switch: SwitchId, in_port: u32, src: MacAddr, dst: MacAddr) -> ControllerEvent {
        ControllerEvent::PacketIn(PacketIn {
            switch,
            in_port,
            buffer_id: None,
            data: packet::build_frame(src, dst, EtherTypes::Ipv4, &[0u8; 20]),
        })
    }

    fn drain(rx: &mut Outbound) -> Vec<(SwitchId, OutboundMessage)> {
        let mut sent = Vec::new();
        while let Ok(message) = rx.try_recv() {
            sent.push(message);
        }
        sent
    }

    fn linear() -> ControllerEvent {
        let mut links = Vec::new();
        links.extend(LinkDescriptor::bidirectional(1, 1, 2, 1));
        links.extend(LinkDescriptor::bidirectional(2, 2, 3, 1));
        ControllerEvent::TopologyChanged(TopologySnapshot {
            switches: vec![1, 2, 3],
            links,
        })
    }

    #[tokio::test]
    async fn connect_registers_and_installs_table_miss() {
        let (mut engine, registry, mut rx) = engine(Box::new(ShortestPathForwarding::default()));
        engine.handle_event(ControllerEvent::SwitchConnected { switch: 1 }).await.unwrap();

        assert!(registry.read().await.contains(1));
        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            (1, OutboundMessage::FlowMod(flow_mod)) => {
                assert_eq!(flow_mod.priority, TABLE_MISS_PRIORITY);
                assert!(flow_mod.flow_match.is_wildcard());
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn disconnect_unregisters() {
        let (mut engine, registry, _rx) = engine(Box::new(ShortestPathForwarding::default()));
        engine.handle_event(ControllerEvent::SwitchConnected { switch: 1 }).await.unwrap();
        engine.handle_event(ControllerEvent::SwitchDisconnected { switch: 1 }).await.unwrap();
        assert!(registry.read().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_destination_only_floods_the_packet() {
        let (mut engine, _registry, mut rx) = engine(Box::new(ShortestPathForwarding::default()));
        engine.handle_event(linear()).await.unwrap();
        engine.handle_event(packet_in(1, 2, HA, HB)).await.unwrap();

        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            (1, OutboundMessage::PacketOut(out)) => {
                assert_eq!(out.in_port, 2);
                assert_eq!(out.actions, vec![Action::Output(OutputPort::Flood)]);
                assert!(matches!(out.buffer, PacketBuffer::Raw(ref data) if data.len() == 34));
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn known_destination_installs_rule_then_sends_packet() {
        let (mut engine, _registry, mut rx) = engine(Box::new(ShortestPathForwarding::default()));
        engine.handle_event(linear()).await.unwrap();
        engine.handle_event(packet_in(3, 2, HB, HA)).await.unwrap();
        drain(&mut rx);

        engine
            .handle_event(ControllerEvent::PacketIn(PacketIn {
                switch: 1,
                in_port: 2,
                buffer_id: Some(17),
                data: packet::build_frame(HA, HB, EtherTypes::Ipv4, &[]),
            }))
            .await
            .unwrap();

        let sent = drain(&mut rx);
        assert_eq!(
            sent,
            vec![
                (
                    1,
                    OutboundMessage::FlowMod(FlowMod {
                        priority: 1,
                        flow_match: FlowMatch::forward(2, HB),
                        actions: vec![Action::Output(OutputPort::Physical(1))],
                        apply_immediately: true,
                    })
                ),
                (
                    1,
                    OutboundMessage::PacketOut(PacketOut {
                        buffer: PacketBuffer::Buffered(17),
                        in_port: 2,
                        actions: vec![Action::Output(OutputPort::Physical(1))],
                    })
                ),
            ]
        );
    }

    #[tokio::test]
    async fn malformed_packet_is_dropped_and_processing_continues() {
        let (mut engine, _registry, mut rx) = engine(Box::new(ShortestPathForwarding::default()));
        engine
            .handle_event(ControllerEvent::PacketIn(PacketIn {
                switch: 1,
                in_port: 2,
                buffer_id: None,
                data: vec![0u8; 6],
            }))
            .await
            .unwrap();
        assert!(drain(&mut rx).is_empty());

        engine.handle_event(packet_in(1, 2, HA, HB)).await.unwrap();
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn learning_strategy_reuses_the_installer() {
        let (mut engine, _registry, mut rx) = engine(Box::new(LearningSwitch::new()));
        engine.handle_event(packet_in(1, 1, HA, HB)).await.unwrap();
        engine.handle_event(packet_in(1, 2, HB, HA)).await.unwrap();

        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 3);
        match &sent[1] {
            (1, OutboundMessage::FlowMod(flow_mod)) => {
                assert_eq!(flow_mod.flow_match, FlowMatch::forward(2, HA));
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn hub_installs_wildcard_flood_rule() {
        let (mut engine, _registry, mut rx) = engine(Box::new(Hub));
        engine.handle_event(packet_in(1, 1, HA, HB)).await.unwrap();

        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 2);
        match &sent[0] {
            (1, OutboundMessage::FlowMod(flow_mod)) => {
                assert!(flow_mod.flow_match.is_wildcard());
                assert_eq!(flow_mod.priority, 1);
                assert_eq!(flow_mod.actions, vec![Action::Output(OutputPort::Flood)]);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn run_drains_queue_before_stopping() {
        let (engine, registry, mut rx) = engine(Box::new(ShortestPathForwarding::default()));
        let (events_tx, events_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        for switch in 1..=3 {
            events_tx
                .send(ControllerEvent::SwitchConnected { switch })
                .await
                .unwrap();
        }
        let handle = tokio::spawn(engine.run(events_rx, shutdown_rx));
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(registry.read().await.len(), 3);
        assert_eq!(drain(&mut rx).len(), 3);
        drop(events_tx);
    }

    /// Answers every packet as if the graph had been corrupted.
    struct CorruptedTopology;

    impl ForwardingStrategy for CorruptedTopology {
        fn name(&self) -> &'static str {
            "corrupted"
        }

        fn decide(&mut self, _packet: &PacketMeta) -> Result<ForwardingDecision> {
            Err(ControllerError::TopologyCorrupted("dangling host".to_string()))
        }
    }

    #[tokio::test]
    async fn unrecoverable_error_stops_the_engine() {
        let (engine, _registry, mut rx) = engine(Box::new(CorruptedTopology));
        let (events_tx, events_rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        events_tx.send(packet_in(1, 2, HA, HB)).await.unwrap();
        events_tx
            .send(ControllerEvent::SwitchConnected { switch: 1 })
            .await
            .unwrap();

        let result = tokio::spawn(engine.run(events_rx, shutdown_rx)).await.unwrap();
        assert!(matches!(result, Err(ControllerError::TopologyCorrupted(_))));
        // nothing after the failure was handled and the queue is closed
        assert!(drain(&mut rx).is_empty());
        assert!(events_tx.is_closed());
    }
}
