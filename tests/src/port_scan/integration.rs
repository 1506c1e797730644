#![cfg(test)]
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use scanr_common::config::ScanConfig;
use scanr_common::network::host::Host;
use scanr_common::network::port::PortSet;
use scanr_common::network::target;
use scanr_common::probe::tcp_flags;
use scanr_common::scan::{DiscoveryMode, PortScanMode, ScanMode};
use scanr_core::orchestrator::Orchestrator;

use crate::mock::{Reaction, ScriptedProber};

const HOST: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

fn orchestrator(prober: ScriptedProber, workers: usize) -> (Orchestrator, Arc<ScriptedProber>) {
    let prober = Arc::new(prober);
    let config = ScanConfig {
        workers,
        ..ScanConfig::default()
    };
    (Orchestrator::new(prober.clone(), config), prober)
}

fn ports(list: &[u16]) -> PortSet {
    list.iter().copied().collect()
}

#[tokio::test]
async fn syn_scan_reports_syn_ack_ports_only() {
    let (orchestrator, _) = orchestrator(
        ScriptedProber::new()
            .on_port(HOST, 80, Reaction::Tcp(tcp_flags::SYN_ACK))
            .on_port(HOST, 443, Reaction::Tcp(tcp_flags::RST | tcp_flags::ACK)),
        8,
    );
    let targets = target::expand("10.0.0.1").unwrap();

    let report = orchestrator
        .run_port_scan(PortScanMode::Syn, &targets, &ports(&[80, 443]))
        .await
        .unwrap();

    assert_eq!(report.hosts, vec![Host::new(HOST).with_ports(vec![80])]);
    assert_eq!(report.summary.positive, 1);
    assert_eq!(report.summary.closed_or_filtered, 1);
}

#[tokio::test]
async fn ack_scan_reports_ports_answering_with_a_bare_rst() {
    let (orchestrator, _) = orchestrator(
        ScriptedProber::new()
            .on_port(HOST, 22, Reaction::Tcp(tcp_flags::RST))
            .on_port(HOST, 25, Reaction::Tcp(tcp_flags::RST | tcp_flags::ACK)),
        8,
    );
    let targets = target::expand("10.0.0.1").unwrap();

    let report = orchestrator
        .run_port_scan(PortScanMode::Ack, &targets, &ports(&[22, 25, 53]))
        .await
        .unwrap();

    assert_eq!(report.hosts, vec![Host::new(HOST).with_ports(vec![22])]);
}

#[tokio::test]
async fn fin_scan_reports_silent_ports_as_open() {
    let (orchestrator, _) = orchestrator(
        ScriptedProber::new().on_port(HOST, 21, Reaction::Tcp(tcp_flags::RST | tcp_flags::ACK)),
        8,
    );
    let targets = target::expand("10.0.0.1").unwrap();

    let report = orchestrator
        .run_port_scan(PortScanMode::Fin, &targets, &ports(&[21, 8080]))
        .await
        .unwrap();

    assert_eq!(report.hosts, vec![Host::new(HOST).with_ports(vec![8080])]);
}

#[tokio::test]
async fn udp_scan_reports_ports_quoted_by_port_unreachable() {
    let (orchestrator, _) = orchestrator(
        ScriptedProber::new()
            .on_port(HOST, 161, Reaction::PortUnreachable)
            .on_port(HOST, 53, Reaction::UdpReply),
        8,
    );
    let targets = target::expand("10.0.0.1").unwrap();

    let report = orchestrator
        .run_port_scan(PortScanMode::Udp, &targets, &ports(&[53, 123, 161]))
        .await
        .unwrap();

    assert_eq!(report.hosts, vec![Host::new(HOST).with_ports(vec![161])]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn thousand_probes_are_each_sent_exactly_once() {
    let (orchestrator, prober) = orchestrator(
        ScriptedProber::new()
            .on_port(HOST, 7, Reaction::Tcp(tcp_flags::SYN_ACK))
            .on_port(HOST, 1000, Reaction::Tcp(tcp_flags::SYN_ACK)),
        150,
    );
    let targets = target::expand("10.0.0.1").unwrap();
    let port_set: PortSet = (1..=1000).collect();

    let report = orchestrator
        .run_port_scan(PortScanMode::Syn, &targets, &port_set)
        .await
        .unwrap();

    assert_eq!(report.summary.executed, 1000);
    assert_eq!(report.hosts, vec![Host::new(HOST).with_ports(vec![7, 1000])]);

    let mut per_port: HashMap<u16, usize> = HashMap::new();
    for spec in prober.sent() {
        if let Some(port) = spec.destination_port() {
            *per_port.entry(port).or_default() += 1;
        }
    }
    assert_eq!(per_port.len(), 1000);
    assert!(per_port.values().all(|&count| count == 1));
}

#[tokio::test]
async fn discovery_and_port_scan_keep_separate_results() {
    let (orchestrator, _) = orchestrator(
        ScriptedProber::new()
            .on_host(HOST, Reaction::EchoReply)
            .on_port(HOST, 443, Reaction::Tcp(tcp_flags::SYN_ACK)),
        8,
    );
    let targets = target::expand("10.0.0.1").unwrap();
    let port_set = ports(&[443]);

    let discovery = orchestrator
        .run(ScanMode::Discovery(DiscoveryMode::Icmp), &targets, None)
        .await
        .unwrap();
    let scan = orchestrator
        .run(ScanMode::PortScan(PortScanMode::Syn), &targets, Some(&port_set))
        .await
        .unwrap();

    assert_eq!(discovery.hosts, vec![Host::new(HOST)]);
    assert_eq!(scan.hosts, vec![Host::new(HOST).with_ports(vec![443])]);
}

#[tokio::test]
async fn every_target_is_scanned_on_every_port() {
    let (orchestrator, prober) = orchestrator(ScriptedProber::new(), 4);
    let targets = target::expand("10.0.0.1-3").unwrap();

    let report = orchestrator
        .run_port_scan(PortScanMode::Syn, &targets, &ports(&[22, 80]))
        .await
        .unwrap();

    assert!(report.hosts.is_empty());
    assert_eq!(prober.sent().len(), 6);
}
