//! # Scan Target Model
//!
//! Parses the `--target` argument into the addresses it denotes.
//!
//! Accepted forms:
//! * A single IPv4 address (`192.168.1.5`).
//! * A last-octet range (`192.168.1.1-254`), or the same range with the end
//!   written in full (`192.168.1.1-192.168.1.254`). Only the last octet may vary.
//! * A comma separated list of the above (`10.0.0.1,10.0.0.7-9`).

use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::{Result, ScanError};
use crate::network::range::{Ipv4Range, TargetRange};

/// Represents a distinct target to be scanned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// Scan a single specific host.
    Host { target_addr: Ipv4Addr },
    /// Scan consecutive addresses inside one /24.
    Range { ipv4_range: Ipv4Range },
    /// Holds a list of different targets
    Multi { targets: Vec<Target> },
}

impl FromStr for Target {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ScanError::invalid_target(s, "target cannot be empty"));
        }

        if s.contains(',') {
            return parse_commas(s);
        }

        if let Some(target) = parse_host(s) {
            return Ok(target);
        }

        if let Some(target) = parse_ip_range(s)? {
            return Ok(target);
        }

        Err(ScanError::invalid_target(
            s,
            "expected A.B.C.D, A.B.C.start-end or a comma separated list of those",
        ))
    }
}

impl Target {
    /// Expands the target into the ordered list of addresses it names.
    pub fn expand(&self) -> TargetRange {
        let mut collection = TargetRange::new();
        resolve_target(self, &mut collection);
        collection
    }
}

/// Parses and expands in one step.
pub fn expand(spec: &str) -> Result<TargetRange> {
    Ok(Target::from_str(spec)?.expand())
}

fn resolve_target(target: &Target, collection: &mut TargetRange) {
    match target {
        Target::Host { target_addr } => collection.add_single(*target_addr),
        Target::Range { ipv4_range } => collection.add_range(*ipv4_range),
        Target::Multi { targets } => {
            for target in targets {
                resolve_target(target, collection);
            }
        }
    }
}

/// Parses a comma-separated list of targets (e.g., "192.168.1.5,10.0.0.1-50").
fn parse_commas(s: &str) -> Result<Target> {
    let mut targets = Vec::new();

    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(ScanError::invalid_target(s, "empty entry in target list"));
        }
        targets.push(Target::from_str(part)?);
    }

    Ok(Target::Multi { targets })
}

fn parse_host(s: &str) -> Option<Target> {
    s.parse::<Ipv4Addr>()
        .ok()
        .map(|target_addr| Target::Host { target_addr })
}

/// Parses "A.B.C.start-end" or "A.B.C.start-A.B.C.end".
fn parse_ip_range(s: &str) -> Result<Option<Target>> {
    let Some((start_str, end_str)) = s.split_once('-') else {
        return Ok(None);
    };

    let start_addr = start_str
        .parse::<Ipv4Addr>()
        .map_err(|e| ScanError::invalid_target(s, format!("invalid start address '{start_str}': {e}")))?;

    let end_addr = parse_range_end_addr(end_str, &start_addr, s)?;

    if start_addr.octets()[3] > end_addr.octets()[3] {
        return Err(ScanError::invalid_target(s, "range end is lower than range start"));
    }

    let ipv4_range = Ipv4Range::new(start_addr, end_addr);
    Ok(Some(Target::Range { ipv4_range }))
}

/// Resolves the end of a range to a full address sharing the first three
/// octets of `start_addr`.
fn parse_range_end_addr(end_str: &str, start_addr: &Ipv4Addr, original_s: &str) -> Result<Ipv4Addr> {
    if let Ok(full_addr) = end_str.parse::<Ipv4Addr>() {
        if full_addr.octets()[..3] != start_addr.octets()[..3] {
            return Err(ScanError::invalid_target(
                original_s,
                "only the last octet may vary inside a range",
            ));
        }
        return Ok(full_addr);
    }

    if end_str.is_empty() || end_str.len() > 3 || !end_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScanError::invalid_target(
            original_s,
            format!("invalid range end '{end_str}'"),
        ));
    }

    let last_octet: u8 = end_str
        .parse()
        .map_err(|e| ScanError::invalid_target(original_s, format!("invalid range end '{end_str}': {e}")))?;

    let mut end_octets = start_addr.octets();
    end_octets[3] = last_octet;
    Ok(Ipv4Addr::from(end_octets))
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

    fn v4(d: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, d)
    }

    #[test]
    fn test_parse_range_end_addr_helper() {
        let start = Ipv4Addr::new(192, 168, 1, 10);
        let s = "192.168.1.10-255";

        assert_eq!(
            parse_range_end_addr("192.168.1.50", &start, s),
            Ok(Ipv4Addr::new(192, 168, 1, 50))
        );
        assert_eq!(
            parse_range_end_addr("50", &start, s),
            Ok(Ipv4Addr::new(192, 168, 1, 50))
        );

        // --- Error Cases ---

        // Different /24
        assert!(parse_range_end_addr("192.168.2.50", &start, s).is_err());
        // Out of octet bounds
        assert!(parse_range_end_addr("256", &start, s).is_err());
        // Partial multi-octet ends are not a thing here
        assert!(parse_range_end_addr("2.66", &start, s).is_err());
        // Empty
        assert!(parse_range_end_addr("", &start, s).is_err());
    }

    #[test]
    fn full_form_range_expands_in_order() {
        let targets = expand("10.0.0.1-10.0.0.5").unwrap();
        assert_eq!(targets.as_slice(), &[v4(1), v4(2), v4(3), v4(4), v4(5)]);
    }

    #[test]
    fn short_form_range_expands_last_octet() {
        let targets = expand("10.0.0.250-252").unwrap();
        assert_eq!(targets.as_slice(), &[v4(250), v4(251), v4(252)]);
    }

    #[test]
    fn single_address_is_a_singleton() {
        let targets = expand("10.0.0.7").unwrap();
        assert_eq!(targets.as_slice(), &[v4(7)]);
    }

    #[test]
    fn comma_list_is_unioned_without_duplicates() {
        let targets = expand("10.0.0.9, 10.0.0.1-2,10.0.0.9").unwrap();
        assert_eq!(targets.as_slice(), &[v4(9), v4(1), v4(2)]);
    }

    #[test]
    fn test_from_str_rejects_malformed_targets() {
        for bad in [
            "",
            "not-an-ip",
            "10.0.0",
            "10.0.0.256",
            "10.0.0.1-",
            "10.0.0.9-3",
            "10.0.0.1-10.0.1.5",
            "10.0.0.0/24",
            "10.0.0.1,,10.0.0.2",
            "::1",
        ] {
            assert!(
                matches!(Target::from_str(bad), Err(ScanError::InvalidTargetFormat { .. })),
                "'{bad}' should be rejected"
            );
        }
    }
}
