use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::{debug, info, warn};
use tokio::runtime::Builder;

use sdn_controller::protocol::{MpscSwitchChannel, OutboundMessage};
use sdn_controller::scenario::{self, ScenarioAction};
use sdn_controller::{Controller, ControllerConfig, ForwardingMode, SwitchId};

#[derive(Parser)]
#[command(name = "sdn-controller", about = "Shortest-path forwarding SDN controller")]
struct Cli {
    /// JSON configuration file
    #[arg(long)]
    config: Option<String>,

    /// JSON event script to replay instead of waiting for ctrl-c
    #[arg(long)]
    scenario: Option<String>,

    #[arg(long, value_enum)]
    mode: Option<ForwardingMode>,

    /// Seconds between stats polls
    #[arg(long)]
    stats_interval: Option<u64>,

    #[arg(long)]
    no_monitor: bool,

    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut config = match &cli.config {
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::default(),
    };
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(secs) = cli.stats_interval {
        config.stats_interval_secs = secs;
    }
    if cli.no_monitor {
        config.monitor_enabled = false;
    }

    let rt = Builder::new_multi_thread().enable_all().build()?;
    rt.block_on(run(config, cli.scenario))
}

async fn run(config: ControllerConfig, scenario_path: Option<String>) -> Result<()> {
    info!("Starting controller in {:?} mode", config.mode);

    let (channel, mut outbound) = MpscSwitchChannel::new();
    let writer = tokio::spawn(async move {
        while let Some((switch, message)) = outbound.recv().await {
            log_outbound(switch, &message);
        }
    });

    let controller = Controller::start(&config, Arc::new(channel))?;

    match scenario_path {
        Some(path) => {
            let actions = scenario::load_scenario(&path)?;
            info!("Replaying {} scenario steps from {}", actions.len(), path);
            for action in actions {
                match action {
                    ScenarioAction::Event(event) => {
                        if controller.submit(event).await.is_err() {
                            warn!("Controller engine stopped, abandoning the scenario");
                            break;
                        }
                    }
                    ScenarioAction::Pause(duration) => tokio::time::sleep(duration).await,
                }
            }
        }
        None => {
            info!("Waiting for events, press ctrl-c to stop");
            tokio::select! {
                result = tokio::signal::ctrl_c() => result?,
                _ = controller.closed() => warn!("Controller engine stopped by itself"),
            }
        }
    }

    let stopped = controller.shutdown().await;
    writer.await?;
    stopped
}

fn log_outbound(switch: SwitchId, message: &OutboundMessage) {
    match message {
        OutboundMessage::FlowMod(flow_mod) => info!(
            "-> {:016x} flow-mod priority={} match={:?} actions={:?}",
            switch, flow_mod.priority, flow_mod.flow_match, flow_mod.actions
        ),
        OutboundMessage::PacketOut(packet_out) => info!(
            "-> {:016x} packet-out in_port={} actions={:?}",
            switch, packet_out.in_port, packet_out.actions
        ),
        OutboundMessage::StatsRequest(request) => {
            debug!("-> {:016x} stats request {:?}", switch, request)
        }
    }
}
