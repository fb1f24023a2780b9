pub mod engine;
pub mod events;
pub mod messages;
pub mod monitor;
pub mod rule_installer;
pub mod switch_registry;

pub use engine::ControllerEngine;
pub use events::{ControllerEvent, PacketIn};
pub use messages::*;
pub use rule_installer::{MpscSwitchChannel, RuleInstaller, SwitchChannel};
pub use switch_registry::{SharedSwitchRegistry, SwitchRegistry};

use std::sync::Arc;

use anyhow::Context;
use log::{info, warn};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::config::ControllerConfig;
use crate::error::Result;
use crate::forwarding;

/// Running controller: the engine task plus, when enabled, the stats monitor.
pub struct Controller {
    events_tx: mpsc::Sender<ControllerEvent>,
    registry: SharedSwitchRegistry,
    shutdown_tx: broadcast::Sender<()>,
    engine_handle: JoinHandle<Result<()>>,
    monitor_handle: Option<JoinHandle<()>>,
}

impl Controller {
    /// Validates `config` and spawns the controller tasks on the current
    /// tokio runtime.
    pub fn start(
        config: &ControllerConfig,
        channel: Arc<dyn SwitchChannel>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let (events_tx, events_rx) = mpsc::channel(config.event_queue_capacity);
        let (shutdown_tx, _) = broadcast::channel(1);
        let registry = SwitchRegistry::shared();
        let installer = RuleInstaller::new(channel);

        let engine = ControllerEngine::new(
            forwarding::build_strategy(config),
            installer.clone(),
            registry.clone(),
            config.forward_priority,
        );
        let engine_handle = tokio::spawn(engine.run(events_rx, shutdown_tx.subscribe()));

        let monitor_handle = config.monitor_enabled.then(|| {
            monitor::start_monitor_task(
                registry.clone(),
                installer,
                config.stats_interval(),
                shutdown_tx.subscribe(),
            )
        });

        info!(
            "Controller started ({:?} mode, monitor {})",
            config.mode,
            if monitor_handle.is_some() { "on" } else { "off" }
        );
        Ok(Self {
            events_tx,
            registry,
            shutdown_tx,
            engine_handle,
            monitor_handle,
        })
    }

    pub async fn submit(&self, event: ControllerEvent) -> anyhow::Result<()> {
        self.events_tx
            .send(event)
            .await
            .map_err(|_| anyhow::anyhow!("controller engine is no longer running"))
    }

    /// Resolves once the engine has stopped taking events.
    pub async fn closed(&self) {
        self.events_tx.closed().await
    }

    pub fn registry(&self) -> SharedSwitchRegistry {
        self.registry.clone()
    }

    /// Stops every task once the events already queued have been handled.
    /// Fails if the engine stopped on an unrecoverable error.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let _ = self.shutdown_tx.send(());
        drop(self.events_tx);

        if let Some(monitor) = self.monitor_handle {
            if let Err(e) = monitor.await {
                warn!("Stats monitor ended abnormally: {}", e);
            }
        }
        let outcome = self.engine_handle.await.context("controller engine task failed")?;
        info!("Controller stopped");
        outcome.context("controller engine stopped on an unrecoverable error")
    }
}
