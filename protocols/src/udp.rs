use std::net::Ipv4Addr;

use anyhow::Context;
use pnet::packet::udp::{MutableUdpPacket, UdpPacket};
use scanr_common::probe::ResponsePacket;

pub const UDP_HDR_LEN: usize = 8;

/// Builds a UDP datagram. The checksum is left at zero, which IPv4 reads as
/// "not computed".
pub fn create_packet(src_port: u16, dst_port: u16, payload: &[u8]) -> anyhow::Result<Vec<u8>> {
    let total_len: usize = UDP_HDR_LEN + payload.len();
    let mut buffer: Vec<u8> = vec![0u8; total_len];
    {
        let mut udp: MutableUdpPacket = MutableUdpPacket::new(&mut buffer).context("creating udp packet")?;
        udp.set_source(src_port);
        udp.set_destination(dst_port);
        udp.set_length(total_len as u16);
        udp.set_payload(payload);
        udp.set_checksum(0);
    }
    Ok(buffer)
}

pub fn parse(source: Ipv4Addr, bytes: &[u8]) -> anyhow::Result<ResponsePacket> {
    let udp = UdpPacket::new(bytes).context(format!("truncated UDP datagram ({} bytes)", bytes.len()))?;
    Ok(ResponsePacket::Udp {
        source,
        source_port: udp.get_source(),
        destination_port: udp.get_destination(),
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
