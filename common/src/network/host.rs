use std::net::Ipv4Addr;

use pnet::util::MacAddr;

/// A responsive host as it appears in the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub address: Ipv4Addr,
    pub mac: Option<MacAddr>,
    pub vendor: Option<String>,
    /// Ascending, duplicate free. Empty for discovery results.
    pub ports: Vec<u16>,
}

impl Host {
    pub fn new(address: Ipv4Addr) -> Self {
        Self {
            address,
            mac: None,
            vendor: None,
            ports: Vec::new(),
        }
    }

    pub fn with_mac(mut self, mac: MacAddr) -> Self {
        self.mac = Some(mac);
        self
    }

    pub fn with_ports(mut self, ports: Vec<u16>) -> Self {
        self.ports = ports;
        self
    }
}
