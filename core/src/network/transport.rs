//! Raw channels used by [`RawProber`](super::raw::RawProber).
//!
//! Layer-4 channels let the kernel write the IPv4 header; the datalink
//! channel is only opened for ARP, which has no IP header at all. Every
//! channel comes back as a sending and a receiving half so a listener thread
//! can own the receiver while workers share the sender.

use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use pnet::datalink::{self, Channel, DataLinkReceiver, DataLinkSender, NetworkInterface};
use pnet::packet::Packet;
use pnet::packet::icmp::IcmpPacket;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::tcp::TcpPacket;
use pnet::packet::udp::UdpPacket;
use pnet::transport::{self, TransportChannelType, TransportProtocol, TransportReceiver, TransportSender};
use scanr_common::debug;
use scanr_common::error::{Result, ScanError};
use scanr_common::probe::ResponsePacket;
use scanr_protocols::{arp, icmp, tcp, udp};

const TRANSPORT_BUFFER_SIZE: usize = 4096;
/// Upper bound on a single blocking read, so callers can watch their deadline.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);
const MIN_WAIT: Duration = Duration::from_millis(1);

const CHANNEL_TYPE_UDP: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Udp));
const CHANNEL_TYPE_TCP: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Tcp));
const CHANNEL_TYPE_ICMP: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Icmp));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    TcpLayer4,
    UdpLayer4,
    IcmpLayer4,
}

/// Sending half of a layer-4 channel.
pub struct TransportOutbound {
    transport_type: TransportType,
    tx: TransportSender,
}

/// Receiving half of a layer-4 channel, read by a single listener thread.
pub struct TransportInbound {
    transport_type: TransportType,
    rx: TransportReceiver,
}

macro_rules! recv_parsed {
    ($rx:expr, $iter_func:path, $parse:path, $wait:expr) => {{
        let mut iterator = $iter_func($rx);
        match iterator.next_with_timeout($wait) {
            Ok(Some((packet, IpAddr::V4(source)))) => $parse(source, packet.packet()).ok(),
            Ok(_) => None,
            Err(e) => {
                debug!("Raw socket read failed: {e}");
                None
            }
        }
    }};
}

/// Opens a raw socket for `transport_type` and splits it into its halves.
pub fn open_transport(transport_type: TransportType) -> Result<(TransportOutbound, TransportInbound)> {
    let channel_type: TransportChannelType = match transport_type {
        TransportType::TcpLayer4 => CHANNEL_TYPE_TCP,
        TransportType::UdpLayer4 => CHANNEL_TYPE_UDP,
        TransportType::IcmpLayer4 => CHANNEL_TYPE_ICMP,
    };
    let (tx, rx) = transport::transport_channel(TRANSPORT_BUFFER_SIZE, channel_type)
        .map_err(|e| channel_error("opening raw socket", e))?;
    Ok((TransportOutbound { transport_type, tx }, TransportInbound { transport_type, rx }))
}

impl TransportOutbound {
    /// Sends a ready-made segment. Routing errors only cost this one probe.
    pub fn send_to(&mut self, bytes: &[u8], destination: Ipv4Addr) -> Result<()> {
        let dst = IpAddr::V4(destination);
        let sent = match self.transport_type {
            TransportType::TcpLayer4 => TcpPacket::new(bytes).map(|p| self.tx.send_to(p, dst)),
            TransportType::UdpLayer4 => UdpPacket::new(bytes).map(|p| self.tx.send_to(p, dst)),
            TransportType::IcmpLayer4 => IcmpPacket::new(bytes).map(|p| self.tx.send_to(p, dst)),
        };
        match sent {
            Some(Ok(_)) => Ok(()),
            Some(Err(e)) if e.kind() == io::ErrorKind::PermissionDenied => Err(channel_error("sending probe", e)),
            Some(Err(e)) => {
                debug!("Sending to {destination} failed: {e}");
                Ok(())
            }
            None => Err(ScanError::CollaboratorFailure(format!(
                "{} byte probe is too short for {:?}",
                bytes.len(),
                self.transport_type
            ))),
        }
    }
}

impl TransportInbound {
    /// Waits at most `wait` for the next packet of this channel's protocol.
    pub fn recv(&mut self, wait: Duration) -> Option<ResponsePacket> {
        let wait = wait.max(MIN_WAIT);
        match self.transport_type {
            TransportType::TcpLayer4 => recv_parsed!(&mut self.rx, transport::tcp_packet_iter, tcp::parse, wait),
            TransportType::UdpLayer4 => recv_parsed!(&mut self.rx, transport::udp_packet_iter, udp::parse, wait),
            TransportType::IcmpLayer4 => recv_parsed!(&mut self.rx, transport::icmp_packet_iter, icmp::parse, wait),
        }
    }
}

pub struct EthernetOutbound {
    tx: Box<dyn DataLinkSender>,
}

pub struct EthernetInbound {
    rx: Box<dyn DataLinkReceiver>,
}

/// Opens the datalink channel of `intf`. Reads give up after [`POLL_INTERVAL`].
pub fn open_ethernet(intf: &NetworkInterface) -> Result<(EthernetOutbound, EthernetInbound)> {
    let cfg = datalink::Config {
        read_timeout: Some(POLL_INTERVAL),
        ..Default::default()
    };
    match datalink::channel(intf, cfg) {
        Ok(Channel::Ethernet(tx, rx)) => Ok((EthernetOutbound { tx }, EthernetInbound { rx })),
        Ok(_) => Err(ScanError::CollaboratorFailure(format!(
            "unsupported channel type on {}",
            intf.name
        ))),
        Err(e) => Err(channel_error(&format!("opening datalink channel on {}", intf.name), e)),
    }
}

impl EthernetOutbound {
    pub fn send(&mut self, frame: &[u8]) -> Result<()> {
        match self.tx.send_to(frame, None) {
            Some(Err(e)) if e.kind() == io::ErrorKind::PermissionDenied => Err(channel_error("sending frame", e)),
            Some(Err(e)) => {
                debug!("Sending ARP frame failed: {e}");
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl EthernetInbound {
    /// Next ARP message seen on the link, `None` after one read timeout.
    pub fn recv(&mut self) -> Option<ResponsePacket> {
        match self.rx.next() {
            Ok(frame) => arp::parse_frame(frame).ok(),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => None,
            Err(e) => {
                debug!("Datalink read failed: {e}");
                None
            }
        }
    }
}

fn channel_error(what: &str, err: io::Error) -> ScanError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => {
            ScanError::CollaboratorFailure(format!("{what}: {err} (raw sockets need root privileges)"))
        }
        _ => ScanError::CollaboratorFailure(format!("{what}: {err}")),
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
