//! # Scan Error Taxonomy
//!
//! Every fallible operation of the scan engine reports one of these variants.
//!
//! Parse-time variants ([`ScanError::InvalidTargetFormat`], [`ScanError::InvalidPortFormat`],
//! [`ScanError::ConflictingPortSpec`], [`ScanError::ConflictingScanMode`],
//! [`ScanError::InvalidConfig`]) are raised before a single packet leaves the machine.
//! [`ScanError::ProbeTimeout`] never escapes a worker: it is folded into a
//! `NoVerdict` by the scheduler. [`ScanError::CollaboratorFailure`] is fatal for the run.

use std::net::Ipv4Addr;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("invalid target '{input}': {reason}")]
    InvalidTargetFormat { input: String, reason: String },

    #[error("invalid port specification '{input}': {reason}")]
    InvalidPortFormat { input: String, reason: String },

    #[error("--port and -p- cannot be used together")]
    ConflictingPortSpec,

    #[error("{0}")]
    ConflictingScanMode(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("target specification expanded to zero addresses")]
    NoTargets,

    #[error("port specification expanded to zero ports")]
    NoPorts,

    #[error("probe to {target} timed out")]
    ProbeTimeout { target: Ipv4Addr },

    #[error("packet collaborator failed: {0}")]
    CollaboratorFailure(String),

    #[error("scan interrupted")]
    Interrupted,
}

impl ScanError {
    pub fn invalid_target(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTargetFormat {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_port(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPortFormat {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error must abort the whole batch.
    ///
    /// Only per-probe conditions are recoverable, anything else is either a
    /// parse-time error or a broken collaborator.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ProbeTimeout { .. })
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        Self::CollaboratorFailure(err.to_string())
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
