//! A [`Prober`] that answers from a table instead of the network.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::time::Duration;

use pnet::util::MacAddr;
use scanr_common::error::{Result, ScanError};
use scanr_common::probe::{
    ARP_OP_REPLY, ICMP_DEST_UNREACHABLE, ICMP_ECHO_REPLY, ICMP_PORT_UNREACHABLE, PacketSpec,
    QuotedDatagram, ResponsePacket,
};
use scanr_core::prober::Prober;

/// How a scripted peer reacts to a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    EchoReply,
    ArpReply(MacAddr),
    /// Answers a TCP probe with these flags, ports mirrored.
    Tcp(u8),
    /// ICMP port-unreachable quoting the probe, sent by the target itself.
    PortUnreachable,
    /// ICMP administratively-prohibited quoting the probe, sent by `router`.
    Prohibited { router: Ipv4Addr },
    UdpReply,
    Timeout,
    Fail(ScanError),
}

#[derive(Default)]
pub struct ScriptedProber {
    reactions: HashMap<(Ipv4Addr, Option<u16>), Reaction>,
    sent: Mutex<Vec<PacketSpec>>,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reaction for every probe to `target` without a more specific entry.
    pub fn on_host(mut self, target: Ipv4Addr, reaction: Reaction) -> Self {
        self.reactions.insert((target, None), reaction);
        self
    }

    pub fn on_port(mut self, target: Ipv4Addr, port: u16, reaction: Reaction) -> Self {
        self.reactions.insert((target, Some(port)), reaction);
        self
    }

    /// Every probe handed to this prober so far.
    pub fn sent(&self) -> Vec<PacketSpec> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    fn react(&self, spec: &PacketSpec) -> Result<Option<ResponsePacket>> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(*spec);
        }

        let target = spec.target();
        let reaction = spec
            .destination_port()
            .and_then(|port| self.reactions.get(&(target, Some(port))))
            .or_else(|| self.reactions.get(&(target, None)));

        let Some(reaction) = reaction else {
            return Ok(None);
        };

        let response = match (reaction, *spec) {
            (Reaction::Timeout, _) => return Err(ScanError::ProbeTimeout { target }),
            (Reaction::Fail(e), _) => return Err(e.clone()),
            (Reaction::EchoReply, PacketSpec::IcmpEcho { identifier, .. }) => ResponsePacket::Icmp {
                source: target,
                icmp_type: ICMP_ECHO_REPLY,
                icmp_code: 0,
                identifier: Some(identifier),
                quoted: None,
            },
            (&Reaction::ArpReply(mac), PacketSpec::Arp { .. }) => ResponsePacket::Arp {
                operation: ARP_OP_REPLY,
                sender_ip: target,
                sender_mac: mac,
            },
            (&Reaction::Tcp(flags), PacketSpec::Tcp { source_port, destination_port, .. }) => ResponsePacket::Tcp {
                source: target,
                source_port: destination_port,
                destination_port: source_port,
                flags,
            },
            (Reaction::PortUnreachable, PacketSpec::Tcp { .. } | PacketSpec::Udp { .. }) => {
                unreachable(target, ICMP_PORT_UNREACHABLE, spec)
            }
            (&Reaction::Prohibited { router }, PacketSpec::Tcp { .. } | PacketSpec::Udp { .. }) => {
                unreachable(router, ICMP_ADMIN_PROHIBITED, spec)
            }
            (Reaction::UdpReply, PacketSpec::Udp { source_port, destination_port, .. }) => ResponsePacket::Udp {
                source: target,
                source_port: destination_port,
                destination_port: source_port,
            },
            _ => return Ok(None),
        };

        Ok(response.answers(spec).then_some(response))
    }
}

const ICMP_ADMIN_PROHIBITED: u8 = 13;

fn unreachable(source: Ipv4Addr, icmp_code: u8, spec: &PacketSpec) -> ResponsePacket {
    let quoted = match (spec.source_port(), spec.destination_port()) {
        (Some(source_port), Some(destination_port)) => Some(QuotedDatagram {
            protocol: spec.protocol(),
            destination: spec.target(),
            source_port,
            destination_port,
        }),
        _ => None,
    };
    ResponsePacket::Icmp {
        source,
        icmp_type: ICMP_DEST_UNREACHABLE,
        icmp_code,
        identifier: None,
        quoted,
    }
}

impl Prober for ScriptedProber {
    fn send_and_wait_one(&self, spec: &PacketSpec, _timeout: Duration, _retries: u32) -> Result<Option<ResponsePacket>> {
        self.react(spec)
    }

    fn send_and_wait_many(
        &self,
        specs: &[PacketSpec],
        _timeout: Duration,
        _retries: u32,
    ) -> Result<Vec<(PacketSpec, ResponsePacket)>> {
        let mut answered = Vec::new();
        for spec in specs {
            if let Some(response) = self.react(spec)? {
                answered.push((*spec, response));
            }
        }
        Ok(answered)
    }
}
