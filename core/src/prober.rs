//! The packet collaborator seam.
//!
//! The scan engine never touches sockets: it hands a [`PacketSpec`] to a
//! [`Prober`] and classifies whatever comes back. [`RawProber`] is the
//! production implementation; tests script their own.
//!
//! [`RawProber`]: crate::network::raw::RawProber

use std::time::Duration;

use scanr_common::error::Result;
use scanr_common::probe::{PacketSpec, ResponsePacket};

/// Sends probes and waits for the replies that answer them.
///
/// Calls block the current thread. Silence is not an error: a probe nobody
/// answered yields `Ok(None)` or is missing from the returned pairs.
/// `retries` extra attempts are made for probes still unanswered after
/// `timeout`.
pub trait Prober: Send + Sync {
    fn send_and_wait_one(
        &self,
        spec: &PacketSpec,
        timeout: Duration,
        retries: u32,
    ) -> Result<Option<ResponsePacket>>;

    /// Returns one `(sent, reply)` pair per answered probe, in the order the
    /// probes were given.
    fn send_and_wait_many(
        &self,
        specs: &[PacketSpec],
        timeout: Duration,
        retries: u32,
    ) -> Result<Vec<(PacketSpec, ResponsePacket)>>;
}
