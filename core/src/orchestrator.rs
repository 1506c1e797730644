//! # Scan Orchestrator
//!
//! Implements the two scan use cases, host discovery and port scanning.
//!
//! For every run the orchestrator:
//! 1. expands the request into one [`ProbeTask`] per target (ARP, ICMP) or
//!    per `(target, port)` pair (everything else),
//! 2. hands the batch to the [scheduler](crate::scheduler) together with a
//!    fresh [`ResultTable`],
//! 3. freezes the table into a sorted [`ScanReport`] and enriches ARP results
//!    with MAC vendors.

use std::net::Ipv4Addr;
use std::slice;
use std::sync::Arc;
use std::time::{Duration, Instant};

use scanr_common::config::ScanConfig;
use scanr_common::error::{Result, ScanError};
use scanr_common::network::host::Host;
use scanr_common::network::port::PortSet;
use scanr_common::network::range::TargetRange;
use scanr_common::probe::{PacketSpec, tcp_flags};
use scanr_common::scan::{DiscoveryMode, PortScanMode, ProbeTask, ScanMode, Verdict};
use scanr_common::vendors::VendorRepository;
use scanr_common::{debug, info};

use crate::aggregator::ResultTable;
use crate::classifier;
use crate::prober::Prober;
use crate::scheduler::{self, BatchSummary, ProgressCallback};

/// Lowest source port handed to probes.
pub const SOURCE_PORT_FLOOR: u16 = 50_000;

/// Frozen outcome of one scan mode over one target set.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub mode: ScanMode,
    /// Ascending by address; ports ascending inside each host.
    pub hosts: Vec<Host>,
    pub summary: BatchSummary,
    pub elapsed: Duration,
}

pub struct Orchestrator {
    prober: Arc<dyn Prober>,
    config: ScanConfig,
    vendor_repo: Option<Arc<dyn VendorRepository>>,
    on_progress: Option<ProgressCallback>,
}

impl Orchestrator {
    pub fn new(prober: Arc<dyn Prober>, config: ScanConfig) -> Self {
        Self {
            prober,
            config,
            vendor_repo: None,
            on_progress: None,
        }
    }

    pub fn with_vendors(mut self, vendor_repo: Arc<dyn VendorRepository>) -> Self {
        self.vendor_repo = Some(vendor_repo);
        self
    }

    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Runs `mode` against `targets`. Port scans also need `ports`.
    pub async fn run(&self, mode: ScanMode, targets: &TargetRange, ports: Option<&PortSet>) -> Result<ScanReport> {
        match mode {
            ScanMode::Discovery(mode) => self.run_discovery(mode, targets).await,
            ScanMode::PortScan(mode) => {
                let ports = ports.ok_or(ScanError::NoPorts)?;
                self.run_port_scan(mode, targets, ports).await
            }
        }
    }

    pub async fn run_discovery(&self, mode: DiscoveryMode, targets: &TargetRange) -> Result<ScanReport> {
        if targets.is_empty() {
            return Err(ScanError::NoTargets);
        }
        let tasks = discovery_tasks(mode, targets);
        let mut report = self.execute(ScanMode::Discovery(mode), tasks).await?;
        if mode == DiscoveryMode::Arp {
            self.enrich_vendors(&mut report.hosts);
        }
        Ok(report)
    }

    pub async fn run_port_scan(&self, mode: PortScanMode, targets: &TargetRange, ports: &PortSet) -> Result<ScanReport> {
        if targets.is_empty() {
            return Err(ScanError::NoTargets);
        }
        if ports.is_empty() {
            return Err(ScanError::NoPorts);
        }
        let tasks = port_scan_tasks(mode, targets, ports);
        self.execute(ScanMode::PortScan(mode), tasks).await
    }

    async fn execute(&self, mode: ScanMode, tasks: Vec<ProbeTask>) -> Result<ScanReport> {
        let started = Instant::now();
        info!("Starting {mode} ({} probes, {} workers)", tasks.len(), self.config.workers);

        let table = Arc::new(ResultTable::new());
        let prober = Arc::clone(&self.prober);
        let config = self.config;
        let job = Arc::new(move |task: ProbeTask| probe(prober.as_ref(), task, config));

        let summary = scheduler::run_batch(
            tasks,
            self.config.workers,
            job,
            Arc::clone(&table),
            self.on_progress.clone(),
        )
        .await?;

        let hosts = table.freeze();
        let elapsed = started.elapsed();
        debug!("{mode} finished: {summary:?} in {elapsed:?}");

        Ok(ScanReport {
            mode,
            hosts,
            summary,
            elapsed,
        })
    }

    fn enrich_vendors(&self, hosts: &mut [Host]) {
        let Some(repo) = &self.vendor_repo else {
            return;
        };
        for host in hosts.iter_mut() {
            if let Some(mac) = host.mac {
                host.vendor = repo.get_vendor(mac);
            }
        }
    }
}

pub fn discovery_tasks(mode: DiscoveryMode, targets: &TargetRange) -> Vec<ProbeTask> {
    match mode.probe_ports() {
        None => targets.iter().map(|&target| ProbeTask::host(target, mode)).collect(),
        Some(ports) => targets
            .iter()
            .flat_map(|&target| ports.iter().map(move |&port| ProbeTask::discovery_port(target, port, mode)))
            .collect(),
    }
}

pub fn port_scan_tasks(mode: PortScanMode, targets: &TargetRange, ports: &PortSet) -> Vec<ProbeTask> {
    targets
        .iter()
        .flat_map(|&target| ports.iter().map(move |port| ProbeTask::port(target, port, mode)))
        .collect()
}

/// Builds the packet for `task`; `None` for a port-based task without a port.
pub fn packet_for(task: &ProbeTask) -> Option<PacketSpec> {
    let target = task.target;
    let spec = match task.mode {
        ScanMode::Discovery(DiscoveryMode::Arp) => PacketSpec::Arp { target },
        ScanMode::Discovery(DiscoveryMode::Icmp) => PacketSpec::IcmpEcho {
            target,
            identifier: rand::random(),
            sequence: 1,
        },
        ScanMode::Discovery(DiscoveryMode::Tcp) | ScanMode::PortScan(PortScanMode::Syn) => {
            tcp(target, task.port?, tcp_flags::SYN)
        }
        ScanMode::PortScan(PortScanMode::Ack) => tcp(target, task.port?, tcp_flags::ACK),
        ScanMode::PortScan(PortScanMode::Fin) => tcp(target, task.port?, tcp_flags::FIN),
        ScanMode::Discovery(DiscoveryMode::Udp) | ScanMode::PortScan(PortScanMode::Udp) => PacketSpec::Udp {
            target,
            source_port: source_port(),
            destination_port: task.port?,
        },
    };
    Some(spec)
}

fn tcp(target: Ipv4Addr, destination_port: u16, flags: u8) -> PacketSpec {
    PacketSpec::Tcp {
        target,
        source_port: source_port(),
        destination_port,
        flags,
    }
}

fn source_port() -> u16 {
    rand::random_range(SOURCE_PORT_FLOOR..u16::MAX)
}

/// One unit of work: send, wait, classify.
fn probe(prober: &dyn Prober, task: ProbeTask, config: ScanConfig) -> Result<Verdict> {
    let Some(spec) = packet_for(&task) else {
        return Ok(Verdict::NoVerdict);
    };

    let response = match task.mode {
        ScanMode::Discovery(DiscoveryMode::Arp | DiscoveryMode::Icmp) => {
            prober.send_and_wait_one(&spec, config.timeout, config.retries)?
        }
        _ => prober
            .send_and_wait_many(slice::from_ref(&spec), config.timeout, config.retries)?
            .into_iter()
            .next()
            .map(|(_, response)| response),
    };

    Ok(classifier::classify(&task, response.as_ref()))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
