use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::forwarding::ForwardingMode;
use crate::protocol::messages::DEFAULT_FORWARD_PRIORITY;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub mode: ForwardingMode,
    pub forward_priority: u16,
    pub event_queue_capacity: usize,
    pub monitor_enabled: bool,
    pub stats_interval_secs: u64,
    /// Recompute cached paths computed before the latest topology change.
    pub invalidate_paths_on_topology_change: bool,
    /// Remove a disconnected switch and its hosts from the topology graph.
    pub prune_on_disconnect: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            mode: ForwardingMode::ShortestPath,
            forward_priority: DEFAULT_FORWARD_PRIORITY,
            event_queue_capacity: 1024,
            monitor_enabled: true,
            stats_interval_secs: 5,
            invalidate_paths_on_topology_change: true,
            prune_on_disconnect: true,
        }
    }
}

impl ControllerConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ControllerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.forward_priority == 0 {
            anyhow::bail!("forward_priority must be above the table-miss priority 0");
        }
        if self.event_queue_capacity == 0 {
            anyhow::bail!("event_queue_capacity must be at least 1");
        }
        if self.monitor_enabled && self.stats_interval_secs == 0 {
            anyhow::bail!("stats_interval_secs must be at least 1 when the monitor is enabled");
        }
        Ok(())
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}
