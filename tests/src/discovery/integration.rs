#![cfg(test)]
use std::net::Ipv4Addr;
use std::sync::Arc;

use pnet::util::MacAddr;
use scanr_common::config::ScanConfig;
use scanr_common::error::ScanError;
use scanr_common::network::host::Host;
use scanr_common::network::target;
use scanr_common::probe::{PacketSpec, tcp_flags};
use scanr_common::scan::{DiscoveryMode, TCP_DISCOVERY_PORTS, UDP_DISCOVERY_PORTS};
use scanr_common::vendors::VendorRepository;
use scanr_core::network::raw::RawProber;
use scanr_core::orchestrator::Orchestrator;

use crate::mock::{Reaction, ScriptedProber};

const GATEWAY: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);
const QUIET_PEER: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 2);

fn orchestrator(prober: ScriptedProber) -> (Orchestrator, Arc<ScriptedProber>) {
    let prober = Arc::new(prober);
    let orchestrator = Orchestrator::new(prober.clone(), ScanConfig::default());
    (orchestrator, prober)
}

struct FixedVendor;

impl VendorRepository for FixedVendor {
    fn get_vendor(&self, _mac: MacAddr) -> Option<String> {
        Some("Acme Networks".into())
    }
}

#[tokio::test]
async fn icmp_discovery_reports_only_hosts_that_echo() {
    let (orchestrator, prober) = orchestrator(ScriptedProber::new().on_host(GATEWAY, Reaction::EchoReply));
    let targets = target::expand("192.168.1.1-2").unwrap();

    let report = orchestrator.run_discovery(DiscoveryMode::Icmp, &targets).await.unwrap();

    assert_eq!(report.hosts, vec![Host::new(GATEWAY)]);
    assert_eq!(report.summary.executed, 2);
    assert_eq!(report.summary.positive, 1);
    assert_eq!(prober.sent().len(), 2);
    assert!(prober.sent().iter().all(|spec| matches!(spec, PacketSpec::IcmpEcho { .. })));
}

#[tokio::test]
async fn arp_discovery_keeps_the_mac_and_its_vendor() {
    let mac = MacAddr::new(0x52, 0x54, 0x00, 0xab, 0xcd, 0xef);
    let prober = Arc::new(ScriptedProber::new().on_host(GATEWAY, Reaction::ArpReply(mac)));
    let orchestrator = Orchestrator::new(prober, ScanConfig::default()).with_vendors(Arc::new(FixedVendor));
    let targets = target::expand("192.168.1.1-2").unwrap();

    let report = orchestrator.run_discovery(DiscoveryMode::Arp, &targets).await.unwrap();

    assert_eq!(report.hosts.len(), 1);
    assert_eq!(report.hosts[0].address, GATEWAY);
    assert_eq!(report.hosts[0].mac, Some(mac));
    assert_eq!(report.hosts[0].vendor.as_deref(), Some("Acme Networks"));
}

#[tokio::test]
async fn tcp_discovery_counts_a_host_once_however_many_ports_answer() {
    let (orchestrator, prober) = orchestrator(
        ScriptedProber::new()
            .on_port(GATEWAY, 22, Reaction::Tcp(tcp_flags::SYN_ACK))
            .on_port(GATEWAY, 80, Reaction::Tcp(tcp_flags::RST | tcp_flags::ACK))
            .on_port(GATEWAY, 443, Reaction::Tcp(tcp_flags::SYN_ACK)),
    );
    let targets = target::expand("192.168.1.1").unwrap();

    let report = orchestrator.run_discovery(DiscoveryMode::Tcp, &targets).await.unwrap();

    assert_eq!(report.hosts, vec![Host::new(GATEWAY)]);
    assert_eq!(report.summary.executed, TCP_DISCOVERY_PORTS.len());
    assert_eq!(prober.sent().len(), TCP_DISCOVERY_PORTS.len());
}

#[tokio::test]
async fn tcp_discovery_counts_icmp_errors_quoting_the_syn() {
    let (orchestrator, _) = orchestrator(
        ScriptedProber::new()
            .on_port(GATEWAY, 443, Reaction::PortUnreachable)
            .on_host(QUIET_PEER, Reaction::Prohibited { router: GATEWAY }),
    );
    let targets = target::expand("192.168.1.1-3").unwrap();

    let report = orchestrator.run_discovery(DiscoveryMode::Tcp, &targets).await.unwrap();

    let alive: Vec<Ipv4Addr> = report.hosts.iter().map(|h| h.address).collect();
    assert_eq!(alive, vec![GATEWAY, QUIET_PEER]);
}

#[tokio::test]
async fn udp_discovery_treats_any_reply_as_alive() {
    let (orchestrator, _) = orchestrator(
        ScriptedProber::new()
            .on_port(GATEWAY, UDP_DISCOVERY_PORTS[0], Reaction::PortUnreachable)
            .on_port(QUIET_PEER, UDP_DISCOVERY_PORTS[1], Reaction::UdpReply),
    );
    let targets = target::expand("192.168.1.1-3").unwrap();

    let report = orchestrator.run_discovery(DiscoveryMode::Udp, &targets).await.unwrap();

    let alive: Vec<Ipv4Addr> = report.hosts.iter().map(|h| h.address).collect();
    assert_eq!(alive, vec![GATEWAY, QUIET_PEER]);
}

#[tokio::test]
async fn collaborator_failure_aborts_the_run() {
    let (orchestrator, _) = orchestrator(
        ScriptedProber::new()
            .on_host(GATEWAY, Reaction::EchoReply)
            .on_host(QUIET_PEER, Reaction::Fail(ScanError::CollaboratorFailure("socket closed".into()))),
    );
    let targets = target::expand("192.168.1.1-2").unwrap();

    let err = orchestrator.run_discovery(DiscoveryMode::Icmp, &targets).await.unwrap_err();

    assert_eq!(err, ScanError::CollaboratorFailure("socket closed".into()));
}

#[tokio::test]
async fn timeouts_are_silence_not_errors() {
    let (orchestrator, _) = orchestrator(
        ScriptedProber::new()
            .on_host(GATEWAY, Reaction::EchoReply)
            .on_host(QUIET_PEER, Reaction::Timeout),
    );
    let targets = target::expand("192.168.1.1-2").unwrap();

    let report = orchestrator.run_discovery(DiscoveryMode::Icmp, &targets).await.unwrap();

    assert_eq!(report.hosts, vec![Host::new(GATEWAY)]);
    assert_eq!(report.summary.silent, 1);
    assert_eq!(report.summary.failed, 0);
}

#[tokio::test]
async fn range_results_come_back_sorted() {
    let mut scripted = ScriptedProber::new();
    for last in [5, 3, 1, 4, 2] {
        scripted = scripted.on_host(Ipv4Addr::new(10, 0, 0, last), Reaction::EchoReply);
    }
    let (orchestrator, _) = orchestrator(scripted);
    let targets = target::expand("10.0.0.1-5").unwrap();

    let report = orchestrator.run_discovery(DiscoveryMode::Icmp, &targets).await.unwrap();

    let alive: Vec<Ipv4Addr> = report.hosts.iter().map(|h| h.address).collect();
    let expected: Vec<Ipv4Addr> = (1..=5).map(|last| Ipv4Addr::new(10, 0, 0, last)).collect();
    assert_eq!(alive, expected);
}

#[tokio::test]
async fn empty_target_set_is_rejected() {
    let (orchestrator, prober) = orchestrator(ScriptedProber::new());
    let targets = scanr_common::network::range::TargetRange::new();

    let err = orchestrator.run_discovery(DiscoveryMode::Arp, &targets).await.unwrap_err();

    assert_eq!(err, ScanError::NoTargets);
    assert!(prober.sent().is_empty());
}

/// Real ICMP echo against loopback. Needs raw sockets.
#[tokio::test(flavor = "multi_thread")]
#[cfg(target_os = "linux")]
#[ignore = "requires root privileges"]
async fn privileged_icmp_discovery_loopback() {
    let targets = target::expand("127.0.0.1").unwrap();
    let prober = Arc::new(RawProber::new(targets.as_slice()));
    let orchestrator = Orchestrator::new(prober, ScanConfig::default());

    match orchestrator.run_discovery(DiscoveryMode::Icmp, &targets).await {
        Ok(report) => assert_eq!(report.hosts, vec![Host::new(Ipv4Addr::LOCALHOST)]),
        Err(ScanError::CollaboratorFailure(reason)) => {
            eprintln!("Skipping loopback test: {reason}");
        }
        Err(e) => panic!("Discovery failed: {e}"),
    }
}
