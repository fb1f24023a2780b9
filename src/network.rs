pub mod topology;

pub use topology::{Edge, HostAttachment, TopologyStore};
