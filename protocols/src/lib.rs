//! Packet builders and response parsers.
//!
//! Builders return the bytes a raw channel expects: a whole Ethernet frame for
//! ARP, a bare transport segment for ICMP, TCP and UDP (the kernel writes the
//! IPv4 header). Parsers reduce a captured packet to a [`ResponsePacket`].
//!
//! [`ResponsePacket`]: scanr_common::probe::ResponsePacket

pub mod arp;
pub mod ethernet;
pub mod icmp;
pub mod tcp;
pub mod udp;
