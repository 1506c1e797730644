//! Route selection for raw probes.
//!
//! Raw probes need to know which local interface and source address the
//! kernel would use towards a target: TCP and UDP checksums cover the source
//! address, and ARP only works for targets sharing a subnet with one of our
//! interfaces.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::IpNetwork;
use rayon::prelude::*;

use crate::utils::interface::NetworkInterfaceExtension;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ViabilityError {
    /// The interface is operationally down.
    IsDown,
    /// Loopback cannot carry ARP.
    IsLoopback,
    /// The interface does not have a MAC address.
    NoMacAddress,
    /// The interface does not support broadcast (required for ARP).
    NotBroadcast,
    /// The interface is a point-to-point link (e.g., a VPN).
    IsPointToPoint,
    /// The interface has no IPv4 address.
    NoIpv4,
}

/// Where probes for one target leave the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub interface: Option<NetworkInterface>,
    pub source: Ipv4Addr,
    /// The target sits inside one of the interface's subnets.
    pub on_link: bool,
}

/// Interfaces that are up, not loopback and carry at least one address.
pub fn usable_interfaces() -> Vec<NetworkInterface> {
    datalink::interfaces()
        .into_iter()
        .filter(|i| i.is_up() && !i.is_loopback() && !i.ips.is_empty())
        .collect()
}

/// Checks that ARP requests can be broadcast on `interface`.
pub fn is_viable_arp_interface(interface: &NetworkInterface) -> Result<(), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if interface.is_loopback() {
        return Err(ViabilityError::IsLoopback);
    }
    if interface.mac.is_none() {
        return Err(ViabilityError::NoMacAddress);
    }
    if !interface.is_broadcast() {
        return Err(ViabilityError::NotBroadcast);
    }
    if interface.is_point_to_point() {
        return Err(ViabilityError::IsPointToPoint);
    }
    if interface.get_ipv4_nets().is_empty() {
        return Err(ViabilityError::NoIpv4);
    }

    Ok(())
}

/// Resolves the route of every target, in parallel.
///
/// Targets without any route (no default gateway, unreachable network) are
/// left out of the map.
pub fn map_targets_to_routes(targets: &[Ipv4Addr]) -> HashMap<Ipv4Addr, Route> {
    let interfaces: Vec<NetworkInterface> = usable_interfaces();
    map_targets_with(targets, &interfaces)
}

fn map_targets_with(targets: &[Ipv4Addr], interfaces: &[NetworkInterface]) -> HashMap<Ipv4Addr, Route> {
    type ThreadSocket = Option<UdpSocket>;

    targets
        .par_iter()
        .map_init(
            || -> ThreadSocket { None },
            |socket, &target| route_with(target, interfaces, socket).map(|route| (target, route)),
        )
        .flatten()
        .collect()
}

fn route_with(target: Ipv4Addr, interfaces: &[NetworkInterface], socket: &mut Option<UdpSocket>) -> Option<Route> {
    if let Some(idx) = find_local_index(interfaces, target) {
        let interface = &interfaces[idx];
        let source = interface
            .get_ipv4_nets()
            .into_iter()
            .find(|net| net.contains(target))
            .map(|net| net.ip())?;
        return Some(Route {
            interface: Some(interface.clone()),
            source,
            on_link: true,
        });
    }

    let source = resolve_route_source_ip(target, socket)?;
    let interface = interfaces
        .iter()
        .find(|iface| iface.ips.iter().any(|net| net.ip() == IpAddr::V4(source)))
        .cloned();

    Some(Route {
        interface,
        source,
        on_link: false,
    })
}

fn find_local_index(interfaces: &[NetworkInterface], target: Ipv4Addr) -> Option<usize> {
    interfaces.iter().position(|iface| {
        iface.ips.iter().any(|ip_net| match ip_net {
            IpNetwork::V4(v4) => v4.contains(target) && v4.prefix() < 32,
            IpNetwork::V6(_) => false,
        })
    })
}

/// Asks the kernel which source address it would pick towards `target`.
///
/// Connecting a UDP socket sends nothing, it only binds a route.
fn resolve_route_source_ip(target: Ipv4Addr, socket: &mut Option<UdpSocket>) -> Option<Ipv4Addr> {
    if socket.is_none() {
        *socket = UdpSocket::bind("0.0.0.0:0").ok();
    }

    let socket = socket.as_ref()?;
    socket.connect((target, 53)).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(v4) if !v4.is_unspecified() => Some(v4),
        _ => None,
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
