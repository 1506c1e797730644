//! Per-run result table.
//!
//! Workers write into it concurrently; [`ResultTable::freeze`] turns it into
//! the sorted host list once the batch is over. Hosts are never removed and a
//! `(host, port)` pair is stored at most once.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use pnet::util::MacAddr;
use scanr_common::network::host::Host;
use scanr_common::scan::Verdict;

#[derive(Debug, Default)]
struct HostRecord {
    mac: Option<MacAddr>,
    ports: BTreeSet<u16>,
}

#[derive(Debug, Default)]
pub struct ResultTable {
    hosts: Mutex<BTreeMap<Ipv4Addr, HostRecord>>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `address` as alive. A MAC learned later fills a missing one but
    /// never replaces it.
    ///
    /// Returns `true` the first time the host is seen.
    pub fn record_alive(&self, address: Ipv4Addr, mac: Option<MacAddr>) -> bool {
        let mut hosts = self.lock();
        let is_new = !hosts.contains_key(&address);
        let record = hosts.entry(address).or_default();
        if record.mac.is_none() {
            record.mac = mac;
        }
        is_new
    }

    /// Returns `true` if the pair was not yet recorded.
    pub fn record_port(&self, address: Ipv4Addr, port: u16) -> bool {
        self.lock().entry(address).or_default().ports.insert(port)
    }

    /// Stores the positive verdicts, ignores the rest.
    pub fn record(&self, verdict: &Verdict) -> bool {
        match *verdict {
            Verdict::HostAlive { address, mac } => self.record_alive(address, mac),
            Verdict::PortOpen { address, port } => self.record_port(address, port),
            Verdict::PortClosedOrFiltered { .. } | Verdict::NoVerdict => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of the table: hosts ascending by address, ports ascending.
    pub fn freeze(&self) -> Vec<Host> {
        self.lock()
            .iter()
            .map(|(&address, record)| {
                let host = Host::new(address).with_ports(record.ports.iter().copied().collect());
                match record.mac {
                    Some(mac) => host.with_mac(mac),
                    None => host,
                }
            })
            .collect()
    }

    // A worker that panicked mid-insert leaves at worst one partial record;
    // the map itself stays consistent.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<Ipv4Addr, HostRecord>> {
        self.hosts.lock().unwrap_or_else(PoisonError::into_inner)
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
