//! Wire-level vocabulary shared by the scan engine and the packet collaborator.
//!
//! [`PacketSpec`] describes what to send, [`ResponsePacket`] what came back.
//! Neither carries raw bytes; building and parsing frames is the job of
//! `scanr-protocols`.

use std::fmt;
use std::net::Ipv4Addr;

use pnet::util::MacAddr;

/// TCP control bits, as they appear in the flags byte of the header.
pub mod tcp_flags {
    pub const FIN: u8 = 0b0000_0001;
    pub const SYN: u8 = 0b0000_0010;
    pub const RST: u8 = 0b0000_0100;
    pub const ACK: u8 = 0b0001_0000;
    pub const SYN_ACK: u8 = SYN | ACK;
}

pub const ARP_OP_REQUEST: u16 = 1;
pub const ARP_OP_REPLY: u16 = 2;
pub const ICMP_ECHO_REPLY: u8 = 0;
pub const ICMP_DEST_UNREACHABLE: u8 = 3;
pub const ICMP_PORT_UNREACHABLE: u8 = 3;
pub const ICMP_ECHO_REQUEST: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Arp,
    Icmp,
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Arp => "ARP",
            Protocol::Icmp => "ICMP",
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        };
        f.write_str(name)
    }
}

/// A single probe the collaborator is asked to put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketSpec {
    Arp {
        target: Ipv4Addr,
    },
    IcmpEcho {
        target: Ipv4Addr,
        identifier: u16,
        sequence: u16,
    },
    Tcp {
        target: Ipv4Addr,
        source_port: u16,
        destination_port: u16,
        flags: u8,
    },
    Udp {
        target: Ipv4Addr,
        source_port: u16,
        destination_port: u16,
    },
}

impl PacketSpec {
    pub fn target(&self) -> Ipv4Addr {
        match *self {
            PacketSpec::Arp { target }
            | PacketSpec::IcmpEcho { target, .. }
            | PacketSpec::Tcp { target, .. }
            | PacketSpec::Udp { target, .. } => target,
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            PacketSpec::Arp { .. } => Protocol::Arp,
            PacketSpec::IcmpEcho { .. } => Protocol::Icmp,
            PacketSpec::Tcp { .. } => Protocol::Tcp,
            PacketSpec::Udp { .. } => Protocol::Udp,
        }
    }

    pub fn destination_port(&self) -> Option<u16> {
        match *self {
            PacketSpec::Tcp { destination_port, .. } | PacketSpec::Udp { destination_port, .. } => {
                Some(destination_port)
            }
            _ => None,
        }
    }

    pub fn source_port(&self) -> Option<u16> {
        match *self {
            PacketSpec::Tcp { source_port, .. } | PacketSpec::Udp { source_port, .. } => Some(source_port),
            _ => None,
        }
    }
}

/// Addressing of the TCP segment or UDP datagram quoted inside an ICMP error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuotedDatagram {
    pub protocol: Protocol,
    /// Where the quoted datagram was headed. The ICMP error itself may come
    /// from a router on the way.
    pub destination: Ipv4Addr,
    pub source_port: u16,
    pub destination_port: u16,
}

/// A captured reply, reduced to the fields the classifiers look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponsePacket {
    Arp {
        operation: u16,
        sender_ip: Ipv4Addr,
        sender_mac: MacAddr,
    },
    Icmp {
        source: Ipv4Addr,
        icmp_type: u8,
        icmp_code: u8,
        identifier: Option<u16>,
        quoted: Option<QuotedDatagram>,
    },
    Tcp {
        source: Ipv4Addr,
        source_port: u16,
        destination_port: u16,
        flags: u8,
    },
    Udp {
        source: Ipv4Addr,
        source_port: u16,
        destination_port: u16,
    },
}

impl ResponsePacket {
    pub fn protocol(&self) -> Protocol {
        match self {
            ResponsePacket::Arp { .. } => Protocol::Arp,
            ResponsePacket::Icmp { .. } => Protocol::Icmp,
            ResponsePacket::Tcp { .. } => Protocol::Tcp,
            ResponsePacket::Udp { .. } => Protocol::Udp,
        }
    }

    pub fn source(&self) -> Ipv4Addr {
        match *self {
            ResponsePacket::Arp { sender_ip, .. } => sender_ip,
            ResponsePacket::Icmp { source, .. }
            | ResponsePacket::Tcp { source, .. }
            | ResponsePacket::Udp { source, .. } => source,
        }
    }

    pub fn source_port(&self) -> Option<u16> {
        match *self {
            ResponsePacket::Tcp { source_port, .. } | ResponsePacket::Udp { source_port, .. } => {
                Some(source_port)
            }
            _ => None,
        }
    }

    /// TCP flags byte, `None` for every other protocol.
    pub fn tcp_flags(&self) -> Option<u8> {
        match *self {
            ResponsePacket::Tcp { flags, .. } => Some(flags),
            _ => None,
        }
    }

    /// Whether this reply answers `spec` (same peer, mirrored ports).
    pub fn answers(&self, spec: &PacketSpec) -> bool {
        match (*self, *spec) {
            (ResponsePacket::Arp { operation, sender_ip, .. }, PacketSpec::Arp { target }) => {
                operation == ARP_OP_REPLY && sender_ip == target
            }
            (
                ResponsePacket::Icmp { source, icmp_type, identifier, .. },
                PacketSpec::IcmpEcho { target, identifier: id, .. },
            ) => source == target && icmp_type == ICMP_ECHO_REPLY && identifier == Some(id),
            (
                ResponsePacket::Tcp { source, source_port, destination_port, .. },
                PacketSpec::Tcp { target, source_port: sport, destination_port: dport, .. },
            ) => source == target && source_port == dport && destination_port == sport,
            (
                ResponsePacket::Udp { source, source_port, destination_port },
                PacketSpec::Udp { target, source_port: sport, destination_port: dport },
            ) => source == target && source_port == dport && destination_port == sport,
            (ResponsePacket::Icmp { quoted: Some(quoted), .. }, PacketSpec::Tcp { .. } | PacketSpec::Udp { .. }) => {
                quoted.protocol == spec.protocol()
                    && quoted.destination == spec.target()
                    && Some(quoted.source_port) == spec.source_port()
                    && Some(quoted.destination_port) == spec.destination_port()
            }
            _ => false,
        }
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
