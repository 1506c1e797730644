use colored::*;
use pnet::util::MacAddr;
use scanr_common::scan::PortScanMode;

use crate::terminal::colors;

pub type Detail = (String, ColoredString);

pub fn mac_to_detail(mac: &Option<MacAddr>) -> Option<Detail> {
    mac.map(|mac| ("MAC".to_string(), mac.to_string().color(colors::MAC_ADDR)))
}

pub fn vendor_to_detail(vendor: &Option<String>) -> Option<Detail> {
    vendor
        .as_ref()
        .map(|vendor| ("Vendor".to_string(), vendor.color(colors::VENDOR)))
}

/// `"TCP" : 22, 80, 443`, keyed by the transport the scan ran over.
pub fn ports_to_detail(ports: &[u16], mode: PortScanMode) -> Detail {
    let joined: String = ports
        .iter()
        .map(|port| port.to_string())
        .collect::<Vec<String>>()
        .join(", ");
    (mode.transport().to_string(), joined.color(colors::PORT))
}

/// "open TCP ports", "unfiltered TCP ports", "open UDP ports".
pub fn port_state_label(mode: PortScanMode) -> String {
    format!("{} {} ports", mode.positive_state(), mode.transport())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
