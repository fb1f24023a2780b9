use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use log::debug;
use pnet::util::MacAddr;

use crate::error::{ControllerError, Result};
use crate::types::{Node, PortNo, SwitchId, TopologySnapshot};

/// Edge annotation. Host-to-switch edges carry no port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub port: Option<PortNo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAttachment {
    pub address: MacAddr,
    pub switch: SwitchId,
    pub port: PortNo,
    pub discovered_at: DateTime<Utc>,
}

/// Directed graph of switches and hosts.
///
/// Snapshots only ever add to the graph. `version` is bumped on every
/// structural change that can alter a shortest path between existing nodes;
/// attaching a new host does not bump it since a host leaf is never a transit
/// hop.
#[derive(Debug, Clone, Default)]
pub struct TopologyStore {
    adjacency: BTreeMap<Node, BTreeMap<Node, Edge>>,
    hosts: HashMap<MacAddr, HostAttachment>,
    version: u64,
}

impl TopologyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn contains(&self, node: &Node) -> bool {
        self.adjacency.contains_key(node)
    }

    /// Unions the snapshot into the graph. Returns true if anything changed.
    pub fn apply_snapshot(&mut self, snapshot: &TopologySnapshot) -> bool {
        let mut changed = false;

        for &switch in &snapshot.switches {
            changed |= self.add_node(Node::Switch(switch));
        }

        for link in &snapshot.links {
            let (src, dst) = (Node::Switch(link.src), Node::Switch(link.dst));
            changed |= self.insert_edge(src, dst, Some(link.port));
        }

        if changed {
            self.version += 1;
            debug!(
                "Topology updated to version {}: {} switches, {} edges",
                self.version,
                self.switch_count(),
                self.edge_count()
            );
        }

        changed
    }

    /// Records `address` as attached to `switch` on `port`.
    ///
    /// The first attachment wins: returns false and leaves the graph untouched
    /// when the address is already a node.
    pub fn attach_host(&mut self, address: MacAddr, switch: SwitchId, port: PortNo) -> bool {
        let host = Node::Host(address);
        if self.contains(&host) {
            return false;
        }

        let switch_node = Node::Switch(switch);
        self.add_node(host);
        self.insert_edge(switch_node, host, Some(port));
        self.insert_edge(host, switch_node, None);
        self.hosts.insert(
            address,
            HostAttachment {
                address,
                switch,
                port,
                discovered_at: Utc::now(),
            },
        );

        debug!("Host {} attached to switch {:x} port {}", address, switch, port);
        true
    }

    /// Egress port on `from` toward `to`.
    pub fn neighbor_port(&self, from: Node, to: Node) -> Result<PortNo> {
        let edge = self
            .adjacency
            .get(&from)
            .and_then(|out| out.get(&to))
            .ok_or(ControllerError::NoSuchEdge { from, to })?;

        edge.port.ok_or(ControllerError::NoEgressPort { from, to })
    }

    /// Outgoing neighbours of `node` in `Node` order.
    pub fn neighbors(&self, node: &Node) -> impl Iterator<Item = Node> + '_ {
        self.adjacency
            .get(node)
            .into_iter()
            .flat_map(|out| out.keys().copied())
    }

    /// Drops a switch, every edge touching it and every host attached to it.
    pub fn remove_switch(&mut self, switch: SwitchId) -> bool {
        let node = Node::Switch(switch);
        if self.adjacency.remove(&node).is_none() {
            return false;
        }

        let orphaned: Vec<HostAttachment> = self
            .hosts()
            .filter(|attachment| attachment.switch == switch)
            .cloned()
            .collect();

        for attachment in &orphaned {
            debug!(
                "Host {} detached with switch {:x} (attached since {})",
                attachment.address, switch, attachment.discovered_at
            );
            self.hosts.remove(&attachment.address);
            self.adjacency.remove(&Node::Host(attachment.address));
        }

        for out in self.adjacency.values_mut() {
            out.remove(&node);
        }

        self.version += 1;
        debug!(
            "Switch {:x} pruned from topology with {} attached hosts (version {})",
            switch,
            orphaned.len(),
            self.version
        );
        true
    }

    pub fn host(&self, address: &MacAddr) -> Option<&HostAttachment> {
        self.hosts.get(address)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &HostAttachment> {
        self.hosts.values()
    }

    pub fn switches(&self) -> impl Iterator<Item = SwitchId> + '_ {
        self.adjacency.keys().filter_map(Node::as_switch)
    }

    pub fn switch_count(&self) -> usize {
        self.switches().count()
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeMap::len).sum()
    }

    fn add_node(&mut self, node: Node) -> bool {
        if self.adjacency.contains_key(&node) {
            return false;
        }
        self.adjacency.insert(node, BTreeMap::new());
        true
    }

    fn insert_edge(&mut self, from: Node, to: Node, port: Option<PortNo>) -> bool {
        let mut changed = self.add_node(to);
        let out = self.adjacency.entry(from).or_insert_with(|| {
            changed = true;
            BTreeMap::new()
        });

        let edge = Edge { port };
        if out.get(&to) != Some(&edge) {
            out.insert(to, edge);
            changed = true;
        }
        changed
    }
}
