//! Turns a reply, or its absence, into a [`Verdict`].
//!
//! Every function here is pure: the same task and response always give the
//! same verdict.

use scanr_common::probe::{ARP_OP_REPLY, ICMP_DEST_UNREACHABLE, ICMP_ECHO_REPLY, ICMP_PORT_UNREACHABLE};
use scanr_common::probe::{Protocol, ResponsePacket, tcp_flags};
use scanr_common::scan::{DiscoveryMode, PortScanMode, ProbeTask, ScanMode, Verdict};

pub fn classify(task: &ProbeTask, response: Option<&ResponsePacket>) -> Verdict {
    match task.mode {
        ScanMode::Discovery(DiscoveryMode::Arp) => arp(response),
        ScanMode::Discovery(DiscoveryMode::Icmp) => icmp(response),
        ScanMode::Discovery(DiscoveryMode::Tcp | DiscoveryMode::Udp) => any_reply(task, response),
        ScanMode::PortScan(PortScanMode::Syn) => syn(task, response),
        ScanMode::PortScan(PortScanMode::Ack) => ack(task, response),
        ScanMode::PortScan(PortScanMode::Fin) => fin(task, response),
        ScanMode::PortScan(PortScanMode::Udp) => udp(response),
    }
}

/// An is-at reply proves the host, and carries its MAC.
pub fn arp(response: Option<&ResponsePacket>) -> Verdict {
    match response {
        Some(&ResponsePacket::Arp { operation: ARP_OP_REPLY, sender_ip, sender_mac }) => Verdict::HostAlive {
            address: sender_ip,
            mac: Some(sender_mac),
        },
        _ => Verdict::NoVerdict,
    }
}

pub fn icmp(response: Option<&ResponsePacket>) -> Verdict {
    match response {
        Some(&ResponsePacket::Icmp { source, icmp_type: ICMP_ECHO_REPLY, .. }) => Verdict::alive(source),
        _ => Verdict::NoVerdict,
    }
}

/// TCP and UDP discovery: anything at all coming back means someone is home,
/// an ICMP error quoting the probe included. The host is the one the probe
/// went to, whatever address answered.
pub fn any_reply(task: &ProbeTask, response: Option<&ResponsePacket>) -> Verdict {
    match response {
        Some(_) => Verdict::alive(task.target),
        None => Verdict::NoVerdict,
    }
}

pub fn syn(task: &ProbeTask, response: Option<&ResponsePacket>) -> Verdict {
    let Some(reply) = response else {
        return Verdict::NoVerdict;
    };
    match (reply.tcp_flags(), reply.source_port()) {
        (Some(tcp_flags::SYN_ACK), Some(port)) => Verdict::PortOpen {
            address: reply.source(),
            port,
        },
        (Some(flags), _) if flags & tcp_flags::RST != 0 => closed_or_filtered(task),
        _ => Verdict::NoVerdict,
    }
}

/// A bare RST means the packet got through a stateless filter.
pub fn ack(task: &ProbeTask, response: Option<&ResponsePacket>) -> Verdict {
    let Some(reply) = response else {
        return closed_or_filtered(task);
    };
    match (reply.tcp_flags(), reply.source_port()) {
        (Some(tcp_flags::RST), Some(port)) => Verdict::PortOpen {
            address: reply.source(),
            port,
        },
        _ => Verdict::NoVerdict,
    }
}

/// Closed ports must RST a FIN, so silence is taken as open.
pub fn fin(task: &ProbeTask, response: Option<&ResponsePacket>) -> Verdict {
    match (response, task.port) {
        (None, Some(port)) => Verdict::PortOpen {
            address: task.target,
            port,
        },
        _ => Verdict::NoVerdict,
    }
}

/// Port-unreachable quoting our datagram marks the quoted port.
pub fn udp(response: Option<&ResponsePacket>) -> Verdict {
    match response {
        Some(&ResponsePacket::Icmp {
            source,
            icmp_type: ICMP_DEST_UNREACHABLE,
            icmp_code: ICMP_PORT_UNREACHABLE,
            quoted: Some(quoted),
            ..
        }) if quoted.protocol == Protocol::Udp => Verdict::PortOpen {
            address: source,
            port: quoted.destination_port,
        },
        _ => Verdict::NoVerdict,
    }
}

fn closed_or_filtered(task: &ProbeTask) -> Verdict {
    match task.port {
        Some(port) => Verdict::PortClosedOrFiltered {
            address: task.target,
            port,
        },
        None => Verdict::NoVerdict,
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

#[cfg(test)]
mod tests {
    use super::*;
    use pnet::util::MacAddr;
    use scanr_common::probe::{ARP_OP_REQUEST, QuotedDatagram};
    use std::net::Ipv4Addr;

    const HOST: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

    fn tcp_reply(port: u16, flags: u8) -> ResponsePacket {
        ResponsePacket::Tcp {
            source: HOST,
            source_port: port,
            destination_port: 54_321,
            flags,
        }
    }

    fn icmp_reply(icmp_type: u8, icmp_code: u8, quoted: Option<QuotedDatagram>) -> ResponsePacket {
        ResponsePacket::Icmp {
            source: HOST,
            icmp_type,
            icmp_code,
            identifier: None,
            quoted,
        }
    }

    #[test]
    fn syn_ack_is_open_under_syn_only() {
        let reply = tcp_reply(80, tcp_flags::SYN_ACK);

        let syn_task = ProbeTask::port(HOST, 80, PortScanMode::Syn);
        assert_eq!(classify(&syn_task, Some(&reply)), Verdict::PortOpen { address: HOST, port: 80 });

        let ack_task = ProbeTask::port(HOST, 80, PortScanMode::Ack);
        assert_eq!(classify(&ack_task, Some(&reply)), Verdict::NoVerdict);
    }

    #[test]
    fn syn_reports_port_from_reply() {
        let task = ProbeTask::port(HOST, 443, PortScanMode::Syn);
        let reply = tcp_reply(8443, tcp_flags::SYN_ACK);
        assert_eq!(syn(&task, Some(&reply)), Verdict::PortOpen { address: HOST, port: 8443 });
    }

    #[test]
    fn syn_rst_is_closed_and_silence_is_nothing() {
        let task = ProbeTask::port(HOST, 22, PortScanMode::Syn);
        let rst = tcp_reply(22, tcp_flags::RST | tcp_flags::ACK);
        assert_eq!(syn(&task, Some(&rst)), Verdict::PortClosedOrFiltered { address: HOST, port: 22 });
        assert_eq!(syn(&task, None), Verdict::NoVerdict);
        assert!(!syn(&task, Some(&rst)).is_positive());
    }

    #[test]
    fn ack_rst_is_unfiltered() {
        let task = ProbeTask::port(HOST, 443, PortScanMode::Ack);
        assert_eq!(
            classify(&task, Some(&tcp_reply(443, tcp_flags::RST))),
            Verdict::PortOpen { address: HOST, port: 443 }
        );
        assert_eq!(classify(&task, None), Verdict::PortClosedOrFiltered { address: HOST, port: 443 });
    }

    #[test]
    fn fin_silence_is_open_and_rst_is_nothing() {
        let task = ProbeTask::port(HOST, 25, PortScanMode::Fin);
        assert_eq!(classify(&task, None), Verdict::PortOpen { address: HOST, port: 25 });
        assert_eq!(classify(&task, Some(&tcp_reply(25, tcp_flags::RST))), Verdict::NoVerdict);
    }

    #[test]
    fn udp_port_unreachable_marks_quoted_port() {
        let task = ProbeTask::port(HOST, 161, PortScanMode::Udp);
        let quoted = QuotedDatagram {
            protocol: Protocol::Udp,
            destination: HOST,
            source_port: 51_000,
            destination_port: 161,
        };
        assert_eq!(
            classify(&task, Some(&icmp_reply(3, 3, Some(quoted)))),
            Verdict::PortOpen { address: HOST, port: 161 }
        );
        assert_eq!(classify(&task, Some(&icmp_reply(3, 1, Some(quoted)))), Verdict::NoVerdict);
        assert_eq!(classify(&task, Some(&icmp_reply(3, 3, None))), Verdict::NoVerdict);
        assert_eq!(classify(&task, None), Verdict::NoVerdict);
    }

    #[test]
    fn arp_reply_carries_mac() {
        let mac = MacAddr::new(0xde, 0xad, 0xbe, 0xef, 0, 1);
        let task = ProbeTask::host(HOST, DiscoveryMode::Arp);
        let reply = ResponsePacket::Arp { operation: ARP_OP_REPLY, sender_ip: HOST, sender_mac: mac };
        assert_eq!(classify(&task, Some(&reply)), Verdict::HostAlive { address: HOST, mac: Some(mac) });

        let request = ResponsePacket::Arp { operation: ARP_OP_REQUEST, sender_ip: HOST, sender_mac: mac };
        assert_eq!(classify(&task, Some(&request)), Verdict::NoVerdict);
    }

    #[test]
    fn icmp_needs_echo_reply() {
        let task = ProbeTask::host(HOST, DiscoveryMode::Icmp);
        assert_eq!(classify(&task, Some(&icmp_reply(0, 0, None))), Verdict::alive(HOST));
        assert_eq!(classify(&task, Some(&icmp_reply(3, 1, None))), Verdict::NoVerdict);
        assert_eq!(classify(&task, None), Verdict::NoVerdict);
    }

    #[test]
    fn tcp_discovery_counts_any_reply_for_the_probed_host() {
        let task = ProbeTask::discovery_port(Ipv4Addr::new(10, 0, 0, 9), 443, DiscoveryMode::Tcp);
        assert_eq!(
            classify(&task, Some(&tcp_reply(443, tcp_flags::RST))),
            Verdict::alive(Ipv4Addr::new(10, 0, 0, 9))
        );
        assert_eq!(classify(&task, None), Verdict::NoVerdict);

        let udp_task = ProbeTask::discovery_port(HOST, 53, DiscoveryMode::Udp);
        assert_eq!(classify(&udp_task, Some(&icmp_reply(3, 3, None))), Verdict::alive(HOST));
    }

    #[test]
    fn icmp_error_quoting_tcp_is_alive_but_never_an_open_udp_port() {
        let quoted = QuotedDatagram {
            protocol: Protocol::Tcp,
            destination: HOST,
            source_port: 51_000,
            destination_port: 80,
        };
        let reply = icmp_reply(3, 3, Some(quoted));

        let discovery = ProbeTask::discovery_port(HOST, 80, DiscoveryMode::Tcp);
        assert_eq!(classify(&discovery, Some(&reply)), Verdict::alive(HOST));

        let udp_task = ProbeTask::port(HOST, 80, PortScanMode::Udp);
        assert_eq!(classify(&udp_task, Some(&reply)), Verdict::NoVerdict);

        let syn_task = ProbeTask::port(HOST, 80, PortScanMode::Syn);
        assert_eq!(classify(&syn_task, Some(&reply)), Verdict::NoVerdict);
    }
}
