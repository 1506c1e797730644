use std::net::Ipv4Addr;

use anyhow::Context;
use pnet::packet::Packet;
use pnet::packet::icmp::destination_unreachable::DestinationUnreachablePacket;
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{self, IcmpCode, IcmpPacket, IcmpType, IcmpTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use scanr_common::probe::{ICMP_ECHO_REQUEST, Protocol, QuotedDatagram, ResponsePacket};

pub const ICMP_ECHO_LEN: usize = 8;

pub fn create_echo_request(identifier: u16, sequence: u16) -> anyhow::Result<Vec<u8>> {
    let mut buffer = vec![0u8; ICMP_ECHO_LEN];
    {
        let mut echo = MutableEchoRequestPacket::new(&mut buffer).context("creating icmp echo request")?;
        echo.set_icmp_type(IcmpType(ICMP_ECHO_REQUEST));
        echo.set_icmp_code(IcmpCode(0));
        echo.set_identifier(identifier);
        echo.set_sequence_number(sequence);
    }
    let checksum = icmp::checksum(&IcmpPacket::new(&buffer).context("reading back icmp echo request")?);
    buffer[2..4].copy_from_slice(&checksum.to_be_bytes());
    Ok(buffer)
}

/// Parses an ICMP message received from `source`.
///
/// Echo replies keep their identifier; destination-unreachable errors keep
/// the addressing of the TCP segment or UDP datagram they quote.
pub fn parse(source: Ipv4Addr, bytes: &[u8]) -> anyhow::Result<ResponsePacket> {
    let message = IcmpPacket::new(bytes).context(format!("truncated ICMP message ({} bytes)", bytes.len()))?;
    let icmp_type = message.get_icmp_type();

    let identifier = match icmp_type {
        IcmpTypes::EchoReply => EchoReplyPacket::new(bytes).map(|echo| echo.get_identifier()),
        _ => None,
    };
    let quoted = match icmp_type {
        IcmpTypes::DestinationUnreachable => quoted_datagram(bytes),
        _ => None,
    };

    Ok(ResponsePacket::Icmp {
        source,
        icmp_type: icmp_type.0,
        icmp_code: message.get_icmp_code().0,
        identifier,
        quoted,
    })
}

/// Digs the IPv4 destination and ports out of the original datagram an ICMP
/// error carries. TCP and UDP both open with the two port fields, and the
/// quote is only guaranteed to hold the first eight bytes.
fn quoted_datagram(bytes: &[u8]) -> Option<QuotedDatagram> {
    let unreachable = DestinationUnreachablePacket::new(bytes)?;
    let original = unreachable.payload();
    let ip = Ipv4Packet::new(original)?;
    let protocol = match ip.get_next_level_protocol() {
        IpNextHeaderProtocols::Tcp => Protocol::Tcp,
        IpNextHeaderProtocols::Udp => Protocol::Udp,
        _ => return None,
    };
    let header_len = ip.get_header_length() as usize * 4;
    let ports = original.get(header_len..header_len + 8)?;
    Some(QuotedDatagram {
        protocol,
        destination: ip.get_destination(),
        source_port: u16::from_be_bytes([ports[0], ports[1]]),
        destination_port: u16::from_be_bytes([ports[2], ports[3]]),
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
