use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::types::SwitchId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchInfo {
    pub id: SwitchId,
    pub connected_at: DateTime<Utc>,
}

/// Switches currently connected to the controller.
#[derive(Debug, Clone, Default)]
pub struct SwitchRegistry {
    switches: BTreeMap<SwitchId, SwitchInfo>,
}

pub type SharedSwitchRegistry = Arc<RwLock<SwitchRegistry>>;

impl SwitchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedSwitchRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Returns false if the switch was already registered.
    pub fn register(&mut self, id: SwitchId) -> bool {
        if self.switches.contains_key(&id) {
            return false;
        }
        self.switches.insert(
            id,
            SwitchInfo {
                id,
                connected_at: Utc::now(),
            },
        );
        true
    }

    /// Returns the entry of a switch that was registered.
    pub fn unregister(&mut self, id: SwitchId) -> Option<SwitchInfo> {
        self.switches.remove(&id)
    }

    pub fn contains(&self, id: SwitchId) -> bool {
        self.switches.contains_key(&id)
    }

    pub fn get(&self, id: SwitchId) -> Option<&SwitchInfo> {
        self.switches.get(&id)
    }

    pub fn ids(&self) -> Vec<SwitchId> {
        self.switches.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.switches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }
}
