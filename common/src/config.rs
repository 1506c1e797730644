use std::time::Duration;

use crate::error::{Result, ScanError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1_500);
pub const DEFAULT_RETRIES: u32 = 0;
pub const DEFAULT_WORKERS: usize = 150;

/// Presentation settings for the terminal front end.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// 0 prints everything, 1 hides headers, 2 prints only result lines.
    pub quiet: u8,
    /// Raises the log filter to `debug`.
    pub verbose: bool,
    /// Skips the MAC vendor lookup for ARP results.
    pub no_vendor: bool,
}

/// Per-run scan parameters handed to the orchestrator.
///
/// The worker pool is created from `workers` at the start of every batch and
/// torn down when the batch returns; `timeout` and `retries` go untouched to
/// each probe call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanConfig {
    pub timeout: Duration,
    pub retries: u32,
    pub workers: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl ScanConfig {
    /// Builds a config from raw CLI values, falling back to defaults for `None`.
    pub fn from_options(
        timeout_secs: Option<f64>,
        retries: Option<u32>,
        workers: Option<usize>,
    ) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(secs) = timeout_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(ScanError::InvalidConfig(format!(
                    "timeout must be a positive number of seconds, got {secs}"
                )));
            }
            cfg.timeout = Duration::from_secs_f64(secs);
        }

        if let Some(retries) = retries {
            cfg.retries = retries;
        }

        if let Some(workers) = workers {
            if workers == 0 {
                return Err(ScanError::InvalidConfig("worker count must be at least 1".into()));
            }
            cfg.workers = workers;
        }

        Ok(cfg)
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
