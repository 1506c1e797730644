//! Scan modes, probe tasks and verdicts.

use std::fmt;
use std::net::Ipv4Addr;

use pnet::util::MacAddr;

/// Ports knocked on by TCP discovery; any answer proves the host is up.
pub const TCP_DISCOVERY_PORTS: [u16; 20] = [
    80, 443, 21, 22, 23, 25, 53, 135, 139, 137, 445, 1158, 1433, 1521, 3306, 3389, 7001, 8000, 8080,
    9090,
];

/// Ports used by UDP discovery.
pub const UDP_DISCOVERY_PORTS: [u16; 15] = [7, 9, 13, 15, 37, 53, 67, 68, 69, 135, 137, 138, 139, 445, 520];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryMode {
    Arp,
    Icmp,
    Tcp,
    Udp,
}

impl DiscoveryMode {
    /// Highest priority first.
    pub const PRECEDENCE: [DiscoveryMode; 4] = [Self::Arp, Self::Icmp, Self::Tcp, Self::Udp];
    pub const DEFAULT: DiscoveryMode = Self::Icmp;

    /// Ports probed per host, `None` when one probe per host is enough.
    pub fn probe_ports(&self) -> Option<&'static [u16]> {
        match self {
            Self::Arp | Self::Icmp => None,
            Self::Tcp => Some(&TCP_DISCOVERY_PORTS),
            Self::Udp => Some(&UDP_DISCOVERY_PORTS),
        }
    }
}

impl fmt::Display for DiscoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Arp => "ARP",
            Self::Icmp => "ICMP",
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortScanMode {
    Syn,
    Ack,
    Fin,
    Udp,
}

impl PortScanMode {
    /// Highest priority first.
    pub const PRECEDENCE: [PortScanMode; 4] = [Self::Syn, Self::Ack, Self::Fin, Self::Udp];
    pub const DEFAULT: PortScanMode = Self::Syn;

    pub fn transport(&self) -> &'static str {
        match self {
            Self::Udp => "UDP",
            _ => "TCP",
        }
    }

    /// What a positive verdict means for this technique.
    pub fn positive_state(&self) -> &'static str {
        match self {
            Self::Ack => "unfiltered",
            _ => "open",
        }
    }
}

impl fmt::Display for PortScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Syn => "SYN",
            Self::Ack => "ACK",
            Self::Fin => "FIN",
            Self::Udp => "UDP",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanMode {
    Discovery(DiscoveryMode),
    PortScan(PortScanMode),
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::Discovery(mode) => write!(f, "{mode} discovery"),
            ScanMode::PortScan(mode) => write!(f, "{mode} port scan"),
        }
    }
}

/// Outcome of picking one mode out of the flags a user passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<M> {
    pub mode: M,
    /// No flag was given and the family default was used.
    pub defaulted: bool,
    /// Requested modes that lost against `mode`.
    pub overridden: Vec<M>,
}

/// First-match-wins resolution over `precedence`.
pub fn select<M: Copy + PartialEq>(precedence: &[M], requested: &[M], default: M) -> Selection<M> {
    let mut winners = precedence.iter().copied().filter(|mode| requested.contains(mode));

    match winners.next() {
        Some(mode) => Selection {
            mode,
            defaulted: false,
            overridden: winners.collect(),
        },
        None => Selection {
            mode: default,
            defaulted: true,
            overridden: Vec::new(),
        },
    }
}

/// One unit of work for the scheduler. Passed by value; two tasks with the
/// same fields are the same task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeTask {
    pub target: Ipv4Addr,
    pub port: Option<u16>,
    pub mode: ScanMode,
}

impl ProbeTask {
    pub fn host(target: Ipv4Addr, mode: DiscoveryMode) -> Self {
        Self {
            target,
            port: None,
            mode: ScanMode::Discovery(mode),
        }
    }

    pub fn discovery_port(target: Ipv4Addr, port: u16, mode: DiscoveryMode) -> Self {
        Self {
            target,
            port: Some(port),
            mode: ScanMode::Discovery(mode),
        }
    }

    pub fn port(target: Ipv4Addr, port: u16, mode: PortScanMode) -> Self {
        Self {
            target,
            port: Some(port),
            mode: ScanMode::PortScan(mode),
        }
    }
}

/// Classified result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    HostAlive {
        address: Ipv4Addr,
        mac: Option<MacAddr>,
    },
    PortOpen {
        address: Ipv4Addr,
        port: u16,
    },
    PortClosedOrFiltered {
        address: Ipv4Addr,
        port: u16,
    },
    NoVerdict,
}

impl Verdict {
    pub fn alive(address: Ipv4Addr) -> Self {
        Self::HostAlive { address, mac: None }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Self::HostAlive { .. } | Self::PortOpen { .. })
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
