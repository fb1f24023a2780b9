//! Scripted event sequences for driving a controller without live switches.
//!
//! A scenario is a JSON array of steps:
//!
//! ```json
//! [
//!   { "switch_connected": 1 },
//!   { "topology": { "switches": [1, 2], "links": [{ "src": 1, "dst": 2, "port": 1 }] } },
//!   { "packet_in": { "switch": 1, "in_port": 2,
//!                    "src": "00:00:00:00:00:0a", "dst": "00:00:00:00:00:0b" } },
//!   { "sleep_ms": 100 }
//! ]
//! ```

use std::fs;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use pnet::packet::ethernet::EtherTypes;
use pnet::util::MacAddr;
use serde::Deserialize;

use crate::packet;
use crate::protocol::{ControllerEvent, PacketIn};
use crate::types::{PortNo, SwitchId, TopologySnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStep {
    SwitchConnected(SwitchId),
    SwitchDisconnected(SwitchId),
    Topology(TopologySnapshot),
    PacketIn {
        switch: SwitchId,
        in_port: PortNo,
        src: String,
        dst: String,
        #[serde(default)]
        buffer_id: Option<u32>,
    },
    SleepMs(u64),
}

/// What replaying a step amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioAction {
    Event(ControllerEvent),
    Pause(Duration),
}

impl ScenarioStep {
    pub fn into_action(self) -> Result<ScenarioAction> {
        let event = match self {
            ScenarioStep::SwitchConnected(switch) => ControllerEvent::SwitchConnected { switch },
            ScenarioStep::SwitchDisconnected(switch) => {
                ControllerEvent::SwitchDisconnected { switch }
            }
            ScenarioStep::Topology(snapshot) => ControllerEvent::TopologyChanged(snapshot),
            ScenarioStep::PacketIn {
                switch,
                in_port,
                src,
                dst,
                buffer_id,
            } => {
                let src: MacAddr = src
                    .parse()
                    .map_err(|e| anyhow!("invalid source address {:?}: {:?}", src, e))?;
                let dst: MacAddr = dst
                    .parse()
                    .map_err(|e| anyhow!("invalid destination address {:?}: {:?}", dst, e))?;
                ControllerEvent::PacketIn(PacketIn {
                    switch,
                    in_port,
                    buffer_id,
                    data: packet::build_frame(src, dst, EtherTypes::Ipv4, &[]),
                })
            }
            ScenarioStep::SleepMs(ms) => {
                return Ok(ScenarioAction::Pause(Duration::from_millis(ms)));
            }
        };
        Ok(ScenarioAction::Event(event))
    }
}

pub fn parse_scenario(content: &str) -> Result<Vec<ScenarioAction>> {
    let steps: Vec<ScenarioStep> = serde_json::from_str(content)?;
    steps.into_iter().map(ScenarioStep::into_action).collect()
}

pub fn load_scenario(path: &str) -> Result<Vec<ScenarioAction>> {
    let content = fs::read_to_string(path).with_context(|| format!("reading scenario {}", path))?;
    parse_scenario(&content).with_context(|| format!("parsing scenario {}", path))
}
