use std::time::Duration;

use colored::*;
use scanr_common::config::Config;
use scanr_common::network::host::Host;
use scanr_common::network::range::TargetRange;
use scanr_common::scan::DiscoveryMode;
use scanr_core::orchestrator::{Orchestrator, ScanReport};

use crate::mprint;
use crate::terminal::format::{self, Detail};
use crate::terminal::{colors, print, spinner};

pub async fn discover(
    orchestrator: &Orchestrator,
    mode: DiscoveryMode,
    targets: &TargetRange,
    cfg: &Config,
) -> anyhow::Result<ScanReport> {
    spinner::get_spinner().start(format!("{mode} discovery of {} hosts...", targets.len()));
    let result = orchestrator.run_discovery(mode, targets).await;
    spinner::get_spinner().finish_and_clear();

    let report = result?;
    discovery_ends(&report, mode, cfg);
    Ok(report)
}

fn discovery_ends(report: &ScanReport, mode: DiscoveryMode, cfg: &Config) {
    if report.hosts.is_empty() {
        print::empty_report("hosts", cfg.quiet);
        return;
    }

    if cfg.quiet > 0 {
        mprint!();
    }

    print::section(&format!("{mode} discovery"), cfg.quiet);
    print_hosts(&report.hosts, cfg);
    print::summary(&summary_line(report.hosts.len(), report.summary.executed, report.elapsed), cfg.quiet);
}

fn print_hosts(hosts: &[Host], cfg: &Config) {
    for (idx, host) in hosts.iter().enumerate() {
        match cfg.quiet {
            2 => print::status(format!("{} alive", host.address)),
            _ => print::host(idx, host.address, &host_details(host)),
        }
    }
}

fn host_details(host: &Host) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![("State".to_string(), "alive".color(colors::PRIMARY))];
    details.extend(format::mac_to_detail(&host.mac));
    details.extend(format::vendor_to_detail(&host.vendor));
    details
}

fn summary_line(hosts_len: usize, probes: usize, total_time: Duration) -> String {
    let active_hosts: ColoredString = format!("{hosts_len} hosts alive").bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    format!("Discovery Complete: {active_hosts} after {probes} probes in {total_time}")
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
