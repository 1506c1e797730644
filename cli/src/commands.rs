pub mod discover;
pub mod scan;

use std::ffi::OsString;

use clap::{ArgAction, Parser};
use scanr_common::error::{Result, ScanError};
use scanr_common::network::port::PortSet;
use scanr_common::network::target::Target;
use scanr_common::scan::{self as precedence, DiscoveryMode, PortScanMode, Selection};

/// `-p-` cannot be declared as a clap flag; it is rewritten into this one.
const ALL_PORTS_SHORTHAND: &str = "-p-";
const ALL_PORTS_FLAG: &str = "--all-ports";

#[derive(Parser, Debug)]
#[command(name = "scanr", version)]
#[command(about = "A concurrent network recon scanner.")]
pub struct CommandLine {
    /// Run host discovery
    #[arg(short = 's', long = "discover")]
    pub discover: bool,
    /// Discover with ARP who-has requests (local link only)
    #[arg(long = "ARP")]
    pub arp: bool,
    /// Discover with ICMP echo requests [default]
    #[arg(long = "ICMP")]
    pub icmp: bool,
    /// Discover with TCP SYNs to common service ports
    #[arg(long = "TCP")]
    pub tcp: bool,
    /// Discover with UDP datagrams to common service ports
    #[arg(long = "UDP")]
    pub udp: bool,

    /// Run a port scan
    #[arg(short = 'p', long = "port-scan")]
    pub port_scan: bool,
    /// SYN (half-open) scan [default]
    #[arg(long = "SYN")]
    pub syn: bool,
    /// ACK scan, reports unfiltered ports
    #[arg(long = "ACK")]
    pub ack: bool,
    /// FIN scan
    #[arg(long = "FIN")]
    pub fin: bool,
    /// UDP port scan
    #[arg(long = "UPORT")]
    pub uport: bool,

    /// Target: 10.0.0.1, 10.0.0.1-254, 10.0.0.1-10.0.0.9 or a comma list
    #[arg(short = 't', long = "target", value_name = "SPEC")]
    pub target: Target,
    /// Ports: 22, 1-1024, 22,80,8000-8100 [default: 1-1024]
    #[arg(long = "port", value_name = "SPEC")]
    pub port: Option<String>,
    /// Scan all 65535 ports (also accepted as -p-)
    #[arg(long = "all-ports")]
    pub all_ports: bool,

    /// Seconds to wait for each reply [default: 1.5]
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<f64>,
    /// Extra attempts for unanswered probes [default: 0]
    #[arg(long = "retry", value_name = "N")]
    pub retry: Option<u32>,
    /// Probes in flight at once [default: 150]
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Less output (-q hides headers, -qq prints results only)
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,
    /// Debug output
    #[arg(short, long)]
    pub verbose: bool,
    /// Skip MAC vendor lookups
    #[arg(long)]
    pub no_vendor: bool,
}

/// What a command line asks for, after defaults and precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPlan {
    pub discovery: Option<Selection<DiscoveryMode>>,
    pub port_scan: Option<Selection<PortScanMode>>,
    /// Set only when a port scan is requested.
    pub ports: Option<PortSet>,
    pub ports_defaulted: bool,
    /// `--port` or `-p-` given without `-p`.
    pub ignored_port_flags: bool,
}

impl CommandLine {
    pub fn parse_args() -> std::result::Result<Self, clap::Error> {
        Self::try_parse_from(rewrite_args(std::env::args_os()))
    }

    pub fn requested_discovery(&self) -> Vec<DiscoveryMode> {
        [
            (self.arp, DiscoveryMode::Arp),
            (self.icmp, DiscoveryMode::Icmp),
            (self.tcp, DiscoveryMode::Tcp),
            (self.udp, DiscoveryMode::Udp),
        ]
        .into_iter()
        .filter_map(|(set, mode)| set.then_some(mode))
        .collect()
    }

    pub fn requested_port_scan(&self) -> Vec<PortScanMode> {
        [
            (self.syn, PortScanMode::Syn),
            (self.ack, PortScanMode::Ack),
            (self.fin, PortScanMode::Fin),
            (self.uport, PortScanMode::Udp),
        ]
        .into_iter()
        .filter_map(|(set, mode)| set.then_some(mode))
        .collect()
    }

    /// Validates the flag combination. Nothing here touches the network.
    pub fn scan_plan(&self) -> Result<ScanPlan> {
        let discovery_flags = self.requested_discovery();
        let port_scan_flags = self.requested_port_scan();

        if !self.discover && !discovery_flags.is_empty() {
            return Err(ScanError::ConflictingScanMode(format!(
                "--{} selects a discovery technique but -s was not given",
                discovery_flags[0]
            )));
        }
        if !self.port_scan && !port_scan_flags.is_empty() {
            let flag = match port_scan_flags[0] {
                PortScanMode::Udp => "UPORT".to_string(),
                mode => mode.to_string(),
            };
            return Err(ScanError::ConflictingScanMode(format!(
                "--{flag} selects a port scan technique but -p was not given"
            )));
        }
        if !self.discover && !self.port_scan {
            return Err(ScanError::InvalidConfig(
                "nothing to do, pass -s (discovery) and/or -p (port scan)".into(),
            ));
        }

        let discovery = self
            .discover
            .then(|| precedence::select(&DiscoveryMode::PRECEDENCE, &discovery_flags, DiscoveryMode::DEFAULT));
        let port_scan = self
            .port_scan
            .then(|| precedence::select(&PortScanMode::PRECEDENCE, &port_scan_flags, PortScanMode::DEFAULT));

        let ports = match self.port_scan {
            true => Some(PortSet::from_request(self.port.as_deref(), self.all_ports)?),
            false => None,
        };

        Ok(ScanPlan {
            discovery,
            port_scan,
            ports,
            ports_defaulted: self.port_scan && self.port.is_none() && !self.all_ports,
            ignored_port_flags: !self.port_scan && (self.port.is_some() || self.all_ports),
        })
    }
}

fn rewrite_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| match arg == ALL_PORTS_SHORTHAND {
            true => OsString::from(ALL_PORTS_FLAG),
            false => arg,
        })
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
