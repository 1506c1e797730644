use std::time::Duration;

use colored::*;
use scanr_common::config::Config;
use scanr_common::network::host::Host;
use scanr_common::network::port::PortSet;
use scanr_common::network::range::TargetRange;
use scanr_common::scan::PortScanMode;
use scanr_core::orchestrator::{Orchestrator, ScanReport};

use crate::mprint;
use crate::terminal::{format, print, spinner};

pub async fn scan(
    orchestrator: &Orchestrator,
    mode: PortScanMode,
    targets: &TargetRange,
    ports: &PortSet,
    cfg: &Config,
) -> anyhow::Result<ScanReport> {
    spinner::get_spinner().start(format!(
        "{mode} scan of {} ports on {} hosts...",
        ports.len(),
        targets.len()
    ));
    let result = orchestrator.run_port_scan(mode, targets, ports).await;
    spinner::get_spinner().finish_and_clear();

    let report = result?;
    scan_ends(&report, mode, cfg);
    Ok(report)
}

fn scan_ends(report: &ScanReport, mode: PortScanMode, cfg: &Config) {
    let label = format::port_state_label(mode);

    if report.hosts.is_empty() {
        print::empty_report(&label, cfg.quiet);
        return;
    }

    if cfg.quiet > 0 {
        mprint!();
    }

    print::section(&format!("{mode} port scan"), cfg.quiet);
    print_hosts(&report.hosts, mode, cfg);

    let port_count: usize = report.hosts.iter().map(|host| host.ports.len()).sum();
    print::summary(&summary_line(port_count, &label, report.hosts.len(), report.elapsed), cfg.quiet);
}

fn print_hosts(hosts: &[Host], mode: PortScanMode, cfg: &Config) {
    for (idx, host) in hosts.iter().enumerate() {
        match cfg.quiet {
            2 => {
                for port in &host.ports {
                    print::status(format!("{}:{port}/{} {}", host.address, mode.transport(), mode.positive_state()));
                }
            }
            _ => print::host(idx, host.address, &[format::ports_to_detail(&host.ports, mode)]),
        }
    }
}

fn summary_line(port_count: usize, label: &str, hosts_len: usize, total_time: Duration) -> String {
    let found: ColoredString = format!("{port_count} {label}").bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    format!("Port Scan Complete: {found} on {hosts_len} hosts in {total_time}")
}
