pub mod algorithms;
pub mod config;
pub mod error;
pub mod forwarding;
pub mod network;
pub mod packet;
pub mod protocol;
pub mod routing;
pub mod scenario;
pub mod types;

pub use config::ControllerConfig;
pub use error::{ControllerError, Result};
pub use forwarding::{ForwardingDecision, ForwardingMode, ForwardingStrategy};
pub use network::TopologyStore;
pub use protocol::{Controller, ControllerEngine, ControllerEvent, RuleInstaller, SwitchChannel};
pub use routing::PathResolver;
pub use types::{LinkDescriptor, Node, PacketMeta, PortNo, SwitchId, TopologySnapshot};

pub use pnet::util::MacAddr;
