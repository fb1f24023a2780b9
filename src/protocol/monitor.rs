use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::interval;

use super::messages::{Action, FlowStats, PortStats, StatsReply};
use super::rule_installer::RuleInstaller;
use super::switch_registry::SharedSwitchRegistry;
use crate::types::SwitchId;

/// Priority of the forwarding rules shown in flow reports. Table-miss and
/// anything installed above the default priority are left out.
const REPORTED_FLOW_PRIORITY: u16 = 1;

pub fn start_monitor_task(
    registry: SharedSwitchRegistry,
    installer: RuleInstaller,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        monitor_task(registry, installer, period, &mut shutdown_rx).await;
    })
}

async fn monitor_task(
    registry: SharedSwitchRegistry,
    installer: RuleInstaller,
    period: Duration,
    shutdown_rx: &mut broadcast::Receiver<()>,
) {
    let mut ticker = interval(period);
    info!("Stats monitor started, polling every {:?}", period);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Stats monitor shutting down");
                break;
            }
            _ = ticker.tick() => {
                poll_switches(&registry, &installer).await;
            }
        }
    }
}

/// Sends port and flow stats requests to every live switch. Returns how many
/// switches were asked.
pub async fn poll_switches(registry: &SharedSwitchRegistry, installer: &RuleInstaller) -> usize {
    let switches = registry.read().await.ids();
    let mut polled = 0;

    for switch in switches {
        match installer.request_stats(switch) {
            Ok(()) => polled += 1,
            Err(e) => warn!("Stats request to switch {:x} failed: {}", switch, e),
        }
    }

    polled
}

pub fn log_stats_reply(switch: SwitchId, reply: &StatsReply) {
    let lines = match reply {
        StatsReply::Port(stats) => format_port_report(switch, stats),
        StatsReply::Flow(stats) => format_flow_report(switch, stats),
    };
    for line in lines {
        info!("{}", line);
    }
}

pub fn format_port_report(switch: SwitchId, stats: &[PortStats]) -> Vec<String> {
    let mut sorted: Vec<&PortStats> = stats.iter().collect();
    sorted.sort_by_key(|stat| stat.port_no);

    let mut lines = vec![
        format!(
            "Port stats of {:016x} at {}",
            switch,
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        ),
        format!(
            "{:<16}  {:>8}  {:>10}  {:>12}  {:>10}  {:>10}  {:>12}  {:>10}",
            "datapath",
            "port",
            "rx-pkts",
            "rx-bytes",
            "rx-errors",
            "tx-pkts",
            "tx-bytes",
            "tx-errors"
        ),
    ];
    for stat in sorted {
        lines.push(format!(
            "{:016x}  {:>8x}  {:>10}  {:>12}  {:>10}  {:>10}  {:>12}  {:>10}",
            switch,
            stat.port_no,
            stat.rx_packets,
            stat.rx_bytes,
            stat.rx_errors,
            stat.tx_packets,
            stat.tx_bytes,
            stat.tx_errors
        ));
    }
    lines
}

pub fn format_flow_report(switch: SwitchId, stats: &[FlowStats]) -> Vec<String> {
    let mut learned: Vec<&FlowStats> = stats
        .iter()
        .filter(|flow| flow.priority == REPORTED_FLOW_PRIORITY)
        .collect();
    learned.sort_by_key(|flow| (flow.flow_match.in_port, flow.flow_match.eth_dst));

    let mut lines = vec![
        format!("Flow stats of {:016x} at {}", switch, Utc::now().format("%Y-%m-%d %H:%M:%S")),
        format!(
            "{:<16}  {:>8}  {:>17}  {:>8}  {:>10}  {:>12}",
            "datapath", "in-port", "eth-dst", "out-port", "packets", "bytes"
        ),
    ];
    for flow in learned {
        let in_port = flow
            .flow_match
            .in_port
            .map(|port| format!("{:x}", port))
            .unwrap_or_else(|| "*".to_string());
        let eth_dst = flow
            .flow_match
            .eth_dst
            .map(|mac| mac.to_string())
            .unwrap_or_else(|| "*".to_string());
        let out_port = match flow.actions.first() {
            Some(Action::Output(port)) => port.to_string(),
            None => "drop".to_string(),
        };
        lines.push(format!(
            "{:016x}  {:>8}  {:>17}  {:>8}  {:>10}  {:>12}",
            switch, in_port, eth_dst, out_port, flow.packet_count, flow.byte_count
        ));
    }
    lines
}
