use std::net::Ipv4Addr;

use anyhow::Context;
use pnet::packet::tcp::{self, MutableTcpPacket, TcpPacket};
use scanr_common::probe::ResponsePacket;

pub const TCP_HDR_LEN: usize = 20;
const WINDOW: u16 = 1024;

/// Builds a bare 20-byte TCP header carrying `flags`.
///
/// The checksum covers the IPv4 pseudo-header, so the source address must be
/// the one the kernel will actually put on the wire.
pub fn create_packet(
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
    src_port: u16,
    dst_port: u16,
    flags: u8,
) -> anyhow::Result<Vec<u8>> {
    let mut buffer = vec![0u8; TCP_HDR_LEN];
    {
        let mut segment = MutableTcpPacket::new(&mut buffer).context("creating tcp packet")?;
        segment.set_source(src_port);
        segment.set_destination(dst_port);
        segment.set_sequence(rand::random());
        segment.set_acknowledgement(0);
        segment.set_data_offset((TCP_HDR_LEN / 4) as u8);
        segment.set_flags(flags);
        segment.set_window(WINDOW);
        segment.set_urgent_ptr(0);
        let checksum = tcp::ipv4_checksum(&segment.to_immutable(), &src_addr, &dst_addr);
        segment.set_checksum(checksum);
    }
    Ok(buffer)
}

pub fn parse(source: Ipv4Addr, bytes: &[u8]) -> anyhow::Result<ResponsePacket> {
    let segment = TcpPacket::new(bytes).context(format!("truncated TCP segment ({} bytes)", bytes.len()))?;
    Ok(ResponsePacket::Tcp {
        source,
        source_port: segment.get_source(),
        destination_port: segment.get_destination(),
        flags: segment.get_flags(),
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
