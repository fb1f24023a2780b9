use log::{debug, error, info, warn};

use super::{ForwardingDecision, ForwardingStrategy};
use crate::error::{ControllerError, Result};
use crate::network::TopologyStore;
use crate::protocol::messages::{FlowMatch, OutputPort};
use crate::routing::PathResolver;
use crate::types::{Node, PacketMeta, PortNo, SwitchId, TopologySnapshot};

/// Forwards along hop-count shortest paths over the discovered topology.
///
/// Sources are attached to the topology the first time they are seen. A
/// packet whose destination is unknown, unreachable or whose cached path no
/// longer fits the graph is flooded without installing a rule. A corrupted
/// graph is returned as an error.
#[derive(Debug, Clone)]
pub struct ShortestPathForwarding {
    topology: TopologyStore,
    paths: PathResolver,
    prune_on_disconnect: bool,
}

impl Default for ShortestPathForwarding {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl ShortestPathForwarding {
    pub fn new(invalidate_paths_on_topology_change: bool, prune_on_disconnect: bool) -> Self {
        Self {
            topology: TopologyStore::new(),
            paths: PathResolver::new(invalidate_paths_on_topology_change),
            prune_on_disconnect,
        }
    }

    pub fn topology(&self) -> &TopologyStore {
        &self.topology
    }

    pub fn paths(&self) -> &PathResolver {
        &self.paths
    }

    /// Egress port on the packet's switch toward the next hop of its path.
    pub fn next_hop_port(&mut self, packet: &PacketMeta) -> Result<PortNo> {
        let path = self.paths.resolve(&self.topology, packet.src, packet.dst)?;
        let here = Node::Switch(packet.switch);

        let next_hop = path
            .iter()
            .position(|node| *node == here)
            .and_then(|index| path.get(index + 1))
            .copied()
            .ok_or(ControllerError::NotOnPath {
                switch: packet.switch,
                src: packet.src,
                dst: packet.dst,
            })?;

        self.topology.neighbor_port(here, next_hop)
    }
}

impl ForwardingStrategy for ShortestPathForwarding {
    fn name(&self) -> &'static str {
        "shortest_path"
    }

    fn apply_snapshot(&mut self, snapshot: &TopologySnapshot) {
        if self.topology.apply_snapshot(snapshot) {
            info!(
                "Topology now has {} switches and {} edges (version {})",
                self.topology.switch_count(),
                self.topology.edge_count(),
                self.topology.version()
            );
        }
    }

    fn switch_disconnected(&mut self, switch: SwitchId) {
        if self.prune_on_disconnect && self.topology.remove_switch(switch) {
            info!("Switch {:x} removed from topology", switch);
        }
    }

    fn decide(&mut self, packet: &PacketMeta) -> Result<ForwardingDecision> {
        self.topology.attach_host(packet.src, packet.switch, packet.in_port);
        let match_key = FlowMatch::forward(packet.in_port, packet.dst);

        match self.next_hop_port(packet) {
            Ok(port) => Ok(ForwardingDecision::forward(OutputPort::Physical(port), match_key)),
            Err(e @ ControllerError::NoPath { .. }) => {
                debug!("{}, flooding", e);
                Ok(ForwardingDecision::flood(match_key))
            }
            Err(e) if e.is_stale_path() => {
                warn!("Stale path on switch {:x}: {}, flooding", packet.switch, e);
                Ok(ForwardingDecision::flood(match_key))
            }
            Err(e) if e.is_recoverable() => {
                warn!("Path lookup failed on switch {:x}: {}, flooding", packet.switch, e);
                Ok(ForwardingDecision::flood(match_key))
            }
            Err(e) => {
                error!("Path lookup on switch {:x} hit a corrupted topology: {}", packet.switch, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LinkDescriptor;
    use pnet::util::MacAddr;

    const HA: MacAddr = MacAddr(0, 0, 0, 0, 0, 0xa);
    const HB: MacAddr = MacAddr(0, 0, 0, 0, 0, 0xb);

    fn linear() -> TopologySnapshot {
        let mut links = Vec::new();
        links.extend(LinkDescriptor::bidirectional(1, 1, 2, 1));
        links.extend(LinkDescriptor::bidirectional(2, 2, 3, 1));
        TopologySnapshot {
            switches: vec![1, 2, 3],
            links,
        }
    }

    fn packet(switch: SwitchId, in_port: PortNo, src: MacAddr, dst: MacAddr) -> PacketMeta {
        PacketMeta {
            switch,
            in_port,
            src,
            dst,
        }
    }

    fn forwarding_with_hosts(invalidate: bool) -> ShortestPathForwarding {
        let mut forwarding = ShortestPathForwarding::new(invalidate, true);
        forwarding.apply_snapshot(&linear());
        // HB talks first so it is known as a destination
        forwarding.decide(&packet(3, 2, HB, HA)).unwrap();
        forwarding
    }

    #[test]
    fn unknown_destination_floods_without_rule() {
        let mut forwarding = ShortestPathForwarding::default();
        forwarding.apply_snapshot(&linear());

        let decision = forwarding.decide(&packet(1, 2, HA, HB)).unwrap();
        assert_eq!(decision.output, OutputPort::Flood);
        assert!(!decision.install_rule);
        // the source was still learned
        assert!(forwarding.topology().contains(&Node::Host(HA)));
    }

    #[test]
    fn known_destination_forwards_toward_next_hop() {
        let mut forwarding = forwarding_with_hosts(true);

        let decision = forwarding.decide(&packet(1, 2, HA, HB)).unwrap();
        assert_eq!(decision.output, OutputPort::Physical(1));
        assert!(decision.install_rule);
        assert_eq!(decision.match_key, FlowMatch::forward(2, HB));
    }

    #[test]
    fn transit_and_egress_switches_use_their_own_ports() {
        let mut forwarding = forwarding_with_hosts(true);
        forwarding.decide(&packet(1, 2, HA, HB)).unwrap();

        let transit = forwarding.decide(&packet(2, 1, HA, HB)).unwrap();
        assert_eq!(transit.output, OutputPort::Physical(2));
        assert_eq!(transit.match_key, FlowMatch::forward(1, HB));

        let egress = forwarding.decide(&packet(3, 1, HA, HB)).unwrap();
        assert_eq!(egress.output, OutputPort::Physical(2));

        // the path was computed once and reused by every hop
        assert_eq!(forwarding.paths().computations(), 1);
    }

    #[test]
    fn switch_off_the_path_floods() {
        let mut forwarding = forwarding_with_hosts(true);
        forwarding.apply_snapshot(&TopologySnapshot {
            switches: vec![4],
            links: LinkDescriptor::bidirectional(4, 1, 2, 3).to_vec(),
        });
        forwarding.decide(&packet(1, 2, HA, HB)).unwrap();

        let decision = forwarding.decide(&packet(4, 1, HA, HB)).unwrap();
        assert_eq!(decision.output, OutputPort::Flood);
        assert!(!decision.install_rule);
    }

    #[test]
    fn stale_cached_path_floods_instead_of_failing() {
        let mut forwarding = ShortestPathForwarding::new(false, true);
        forwarding.apply_snapshot(&linear());
        forwarding.decide(&packet(3, 2, HB, HA)).unwrap();
        let before = forwarding.decide(&packet(1, 2, HA, HB)).unwrap();
        assert_eq!(before.output, OutputPort::Physical(1));

        forwarding.switch_disconnected(2);

        let decision = forwarding.decide(&packet(1, 2, HA, HB)).unwrap();
        assert_eq!(decision.output, OutputPort::Flood);
        assert!(!decision.install_rule);
    }

    #[test]
    fn invalidation_routes_around_changes() {
        let mut forwarding = forwarding_with_hosts(true);
        let before = forwarding.decide(&packet(1, 2, HA, HB)).unwrap();
        assert_eq!(before.output, OutputPort::Physical(1));

        forwarding.apply_snapshot(&TopologySnapshot {
            switches: vec![],
            links: LinkDescriptor::bidirectional(1, 3, 3, 3).to_vec(),
        });

        let decision = forwarding.decide(&packet(1, 2, HA, HB)).unwrap();
        assert_eq!(decision.output, OutputPort::Physical(3));
    }

    #[test]
    fn corrupted_path_is_an_error_not_a_flood() {
        let mut forwarding = forwarding_with_hosts(true);
        let version = forwarding.topology.version();
        forwarding
            .paths
            .insert_cached(HA, HB, vec![Node::Switch(1), Node::Host(HB)], version);

        let err = forwarding.decide(&packet(1, 2, HA, HB)).unwrap_err();
        assert!(matches!(err, ControllerError::TopologyCorrupted(_)));
    }

    #[test]
    fn disconnect_without_pruning_keeps_the_graph() {
        let mut forwarding = ShortestPathForwarding::new(true, false);
        forwarding.apply_snapshot(&linear());
        forwarding.switch_disconnected(2);
        assert!(forwarding.topology().contains(&Node::Switch(2)));
    }

    #[test]
    fn host_on_the_same_switch_is_reached_directly() {
        let mut forwarding = ShortestPathForwarding::default();
        forwarding.apply_snapshot(&linear());
        forwarding.decide(&packet(1, 3, HB, HA)).unwrap();

        let decision = forwarding.decide(&packet(1, 2, HA, HB)).unwrap();
        assert_eq!(decision.output, OutputPort::Physical(3));
        assert!(decision.install_rule);
    }
}
