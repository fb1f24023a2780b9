use crate::types::{Node, SwitchId};
use pnet::util::MacAddr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("no path from {src} to {dst}")]
    NoPath { src: MacAddr, dst: MacAddr },

    #[error("no edge from {from} to {to}")]
    NoSuchEdge { from: Node, to: Node },

    #[error("edge from {from} to {to} has no egress port")]
    NoEgressPort { from: Node, to: Node },

    #[error("switch {switch:x} is not an intermediate hop of the path from {src} to {dst}")]
    NotOnPath {
        switch: SwitchId,
        src: MacAddr,
        dst: MacAddr,
    },

    #[error("malformed packet of {len} bytes from switch {switch:x}")]
    MalformedPacket { switch: SwitchId, len: usize },

    #[error("channel to switch {switch:x} is closed")]
    ChannelClosed { switch: SwitchId },

    #[error("topology invariant violated: {0}")]
    TopologyCorrupted(String),
}

impl ControllerError {
    /// True for conditions that are answered by flooding or dropping a single
    /// packet rather than stopping the controller.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ControllerError::NoPath { .. }
            | ControllerError::NoSuchEdge { .. }
            | ControllerError::NoEgressPort { .. }
            | ControllerError::NotOnPath { .. }
            | ControllerError::MalformedPacket { .. }
            | ControllerError::ChannelClosed { .. } => true,
            ControllerError::TopologyCorrupted(_) => false,
        }
    }

    /// True when the cached path no longer matches the graph.
    pub fn is_stale_path(&self) -> bool {
        matches!(
            self,
            ControllerError::NoSuchEdge { .. }
                | ControllerError::NoEgressPort { .. }
                | ControllerError::NotOnPath { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ControllerError>;
