//! Port specification parsing.
//!
//! A port specification is a comma separated list of single ports (`80`) and
//! inclusive ranges (`1000-1002`). The result is a deduplicated set, iterated
//! in ascending order.

use std::collections::BTreeSet;

use crate::error::{Result, ScanError};

pub const DEFAULT_PORT_SPEC: &str = "1-1024";

/// Deduplicated set of ports in `1..=65535`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSet(BTreeSet<u16>);

impl PortSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every port from 1 to 65535.
    pub fn all() -> Self {
        Self((1..=u16::MAX).collect())
    }

    /// Resolves the pair of `--port <spec>` / `-p-` options.
    ///
    /// Giving both is a [`ScanError::ConflictingPortSpec`]; giving neither
    /// falls back to [`DEFAULT_PORT_SPEC`].
    pub fn from_request(spec: Option<&str>, all_ports: bool) -> Result<Self> {
        match (spec, all_ports) {
            (Some(_), true) => Err(ScanError::ConflictingPortSpec),
            (None, true) => Ok(Self::all()),
            (Some(spec), false) => parse(spec),
            (None, false) => parse(DEFAULT_PORT_SPEC),
        }
    }

    pub fn insert(&mut self, port: u16) -> bool {
        self.0.insert(port)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<u16> for PortSet {
    fn from_iter<T: IntoIterator<Item = u16>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Parses a port specification such as `"22,80,1000-1002"`.
pub fn parse(spec: &str) -> Result<PortSet> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(ScanError::invalid_port(spec, "no ports given"));
    }

    let mut ports = PortSet::new();
    for token in spec.split(',') {
        let token = token.trim();
        match token.split_once('-') {
            Some((start, end)) => {
                let start = parse_port(start, spec)?;
                let end = parse_port(end, spec)?;
                if start > end {
                    return Err(ScanError::invalid_port(
                        spec,
                        format!("range {start}-{end} is reversed"),
                    ));
                }
                for port in start..=end {
                    ports.insert(port);
                }
            }
            None => {
                ports.insert(parse_port(token, spec)?);
            }
        }
    }

    Ok(ports)
}

fn parse_port(token: &str, spec: &str) -> Result<u16> {
    if token.is_empty() || token.len() > 5 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScanError::invalid_port(spec, format!("'{token}' is not a port number")));
    }

    match token.parse::<u32>() {
        Ok(port @ 1..=65535) => Ok(port as u16),
        _ => Err(ScanError::invalid_port(spec, format!("{token} is outside 1-65535"))),
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
