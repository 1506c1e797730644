//! End-to-end scans of the orchestrator against a scripted prober.

pub mod mock;

#[cfg(test)]
mod discovery;
#[cfg(test)]
mod port_scan;
