pub mod hub;
pub mod learning;
pub mod shortest_path;

pub use hub::Hub;
pub use learning::LearningSwitch;
pub use shortest_path::ShortestPathForwarding;

use serde::{Deserialize, Serialize};

use crate::config::ControllerConfig;
use crate::error::Result;
use crate::protocol::messages::{FlowMatch, OutputPort};
use crate::types::{PacketMeta, SwitchId, TopologySnapshot};

/// What to do with one packet-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardingDecision {
    pub output: OutputPort,
    pub install_rule: bool,
    pub match_key: FlowMatch,
}

impl ForwardingDecision {
    /// Send out `port` and teach the switch to do the same for `match_key`.
    pub fn forward(port: OutputPort, match_key: FlowMatch) -> Self {
        Self {
            output: port,
            install_rule: true,
            match_key,
        }
    }

    /// Flood this packet only.
    pub fn flood(match_key: FlowMatch) -> Self {
        Self {
            output: OutputPort::Flood,
            install_rule: false,
            match_key,
        }
    }
}

/// A way of answering packet-ins. The engine owns exactly one and calls it
/// from a single task, so implementations keep plain owned state.
pub trait ForwardingStrategy: Send {
    fn name(&self) -> &'static str;

    fn apply_snapshot(&mut self, _snapshot: &TopologySnapshot) {}

    fn switch_disconnected(&mut self, _switch: SwitchId) {}

    /// Errors are reserved for conditions the controller cannot continue
    /// from; anything answerable by flooding comes back as a decision.
    fn decide(&mut self, packet: &PacketMeta) -> Result<ForwardingDecision>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ForwardingMode {
    #[default]
    ShortestPath,
    Learning,
    Hub,
}

pub fn build_strategy(config: &ControllerConfig) -> Box<dyn ForwardingStrategy> {
    match config.mode {
        ForwardingMode::ShortestPath => Box::new(ShortestPathForwarding::new(
            config.invalidate_paths_on_topology_change,
            config.prune_on_disconnect,
        )),
        ForwardingMode::Learning => Box::new(LearningSwitch::new()),
        ForwardingMode::Hub => Box::new(Hub),
    }
}
