//! Raw-socket [`Prober`].
//!
//! Channels are opened on first use, one set per protocol family (one per
//! interface for ARP), and stay open for the life of the prober. Every worker
//! sends through the same channel; listener threads read the receiving halves
//! and hand each packet to the caller whose probe it answers. Opening sockets
//! requires root privileges.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::slice;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use pnet::datalink::NetworkInterface;
use pnet::util::MacAddr;
use scanr_common::debug;
use scanr_common::error::{Result, ScanError};
use scanr_common::network::interface::{self, Route};
use scanr_common::probe::{PacketSpec, Protocol, ResponsePacket};
use scanr_common::utils::interface::NetworkInterfaceExtension;
use scanr_protocols::{arp, icmp, tcp, udp};

use super::transport::{
    self, EthernetInbound, EthernetOutbound, POLL_INTERVAL, TransportInbound, TransportOutbound, TransportType,
};
use crate::prober::Prober;

type Routes = Arc<HashMap<Ipv4Addr, Route>>;

pub struct RawProber {
    routes: Routes,
    hubs: Mutex<Vec<(SessionKey, Arc<Hub>)>>,
}

impl RawProber {
    /// Resolves the route of every target up front. No socket is opened yet.
    pub fn new(targets: &[Ipv4Addr]) -> Self {
        let routes = interface::map_targets_to_routes(targets);
        debug!("Resolved routes for {}/{} targets", routes.len(), targets.len());
        Self { routes: Arc::new(routes), hubs: Mutex::new(Vec::new()) }
    }

    fn session_key(&self, spec: &PacketSpec) -> Option<SessionKey> {
        let PacketSpec::Arp { target } = *spec else {
            return Some(SessionKey::Transport(spec.protocol()));
        };

        let route = self.routes.get(&target).filter(|route| route.on_link);
        let Some(intf) = route.and_then(|route| route.interface.as_ref()) else {
            debug!("{target} is not on a local link, ARP probe skipped");
            return None;
        };
        match interface::is_viable_arp_interface(intf) {
            Ok(()) => Some(SessionKey::Link(intf.clone())),
            Err(reason) => {
                debug!("{} cannot carry ARP ({reason:?}), {target} skipped", intf.name);
                None
            }
        }
    }

    /// The hub for `key`, opened by whichever caller asks first.
    fn hub(&self, key: &SessionKey) -> Result<Arc<Hub>> {
        let mut hubs = lock(&self.hubs);
        if let Some((_, hub)) = hubs.iter().find(|(k, _)| k == key) {
            return Ok(Arc::clone(hub));
        }
        let hub = Arc::new(self.open(key)?);
        debug!("Opened {key:?} channels");
        hubs.push((key.clone(), Arc::clone(&hub)));
        Ok(hub)
    }

    fn open(&self, key: &SessionKey) -> Result<Hub> {
        let routes = Arc::clone(&self.routes);
        let hub = match key {
            SessionKey::Link(intf) => {
                let src_mac = intf
                    .mac
                    .ok_or_else(|| ScanError::CollaboratorFailure(format!("{} has no MAC address", intf.name)))?;
                let (tx, rx) = transport::open_ethernet(intf)?;
                let outbound = LinkOutbound { handle: tx, src_mac, fallback_addr: intf.primary_ipv4(), routes };
                Hub::start(Box::new(outbound), vec![Box::new(rx)])
            }
            SessionKey::Transport(Protocol::Arp) => {
                return Err(ScanError::CollaboratorFailure("ARP needs a link-layer session".into()));
            }
            // TCP and UDP probes also listen for the ICMP errors that answer them.
            SessionKey::Transport(protocol) => {
                let transport_type = match protocol {
                    Protocol::Tcp => TransportType::TcpLayer4,
                    Protocol::Udp => TransportType::UdpLayer4,
                    _ => TransportType::IcmpLayer4,
                };
                let (tx, rx) = transport::open_transport(transport_type)?;
                let mut inbound: Vec<Box<dyn Inbound>> = vec![Box::new(rx)];
                if transport_type != TransportType::IcmpLayer4 {
                    let (_, icmp_errors) = transport::open_transport(TransportType::IcmpLayer4)?;
                    inbound.push(Box::new(icmp_errors));
                }
                Hub::start(Box::new(Layer4Outbound { handle: tx, routes }), inbound)
            }
        };
        Ok(hub)
    }
}

impl Prober for RawProber {
    fn send_and_wait_one(&self, spec: &PacketSpec, timeout: Duration, retries: u32) -> Result<Option<ResponsePacket>> {
        Ok(self
            .send_and_wait_many(slice::from_ref(spec), timeout, retries)?
            .into_iter()
            .next()
            .map(|(_, response)| response))
    }

    fn send_and_wait_many(
        &self,
        specs: &[PacketSpec],
        timeout: Duration,
        retries: u32,
    ) -> Result<Vec<(PacketSpec, ResponsePacket)>> {
        let mut groups: Vec<(SessionKey, Vec<PacketSpec>)> = Vec::new();
        for spec in specs {
            let Some(key) = self.session_key(spec) else {
                continue;
            };
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, group)) => group.push(*spec),
                None => groups.push((key, vec![*spec])),
            }
        }

        let mut answered = Vec::new();
        for (key, group) in groups {
            let hub = self.hub(&key)?;
            answered.extend(exchange(&hub, &group, timeout, retries)?);
        }
        answered.sort_by_key(|(sent, _)| specs.iter().position(|spec| spec == sent));
        Ok(answered)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SessionKey {
    Link(NetworkInterface),
    Transport(Protocol),
}

/// Puts probes of one family on the wire.
trait Outbound: Send {
    fn send(&mut self, spec: &PacketSpec) -> Result<()>;
}

/// Yields parsed packets to a listener thread.
trait Inbound: Send {
    /// Next parsed packet, or `None` once `wait` ran out.
    fn recv(&mut self, wait: Duration) -> Option<ResponsePacket>;
}

impl Inbound for TransportInbound {
    fn recv(&mut self, wait: Duration) -> Option<ResponsePacket> {
        TransportInbound::recv(self, wait)
    }
}

impl Inbound for EthernetInbound {
    fn recv(&mut self, _wait: Duration) -> Option<ResponsePacket> {
        EthernetInbound::recv(self)
    }
}

struct LinkOutbound {
    handle: EthernetOutbound,
    src_mac: MacAddr,
    fallback_addr: Option<Ipv4Addr>,
    routes: Routes,
}

impl Outbound for LinkOutbound {
    fn send(&mut self, spec: &PacketSpec) -> Result<()> {
        let PacketSpec::Arp { target } = *spec else {
            return Err(ScanError::CollaboratorFailure(format!(
                "{} probe on a link-layer session",
                spec.protocol()
            )));
        };
        let src_addr = self
            .routes
            .get(&target)
            .map(|route| route.source)
            .or(self.fallback_addr)
            .ok_or_else(|| ScanError::CollaboratorFailure("no IPv4 source address for ARP".into()))?;

        let frame = arp::create_request(self.src_mac, src_addr, target).map_err(build_failure)?;
        self.handle.send(&frame)
    }
}

struct Layer4Outbound {
    handle: TransportOutbound,
    routes: Routes,
}

impl Outbound for Layer4Outbound {
    fn send(&mut self, spec: &PacketSpec) -> Result<()> {
        let bytes = match *spec {
            PacketSpec::IcmpEcho { identifier, sequence, .. } => icmp::create_echo_request(identifier, sequence),
            PacketSpec::Tcp { target, source_port, destination_port, flags } => {
                let Some(route) = self.routes.get(&target) else {
                    debug!("No route to {target}, TCP probe skipped");
                    return Ok(());
                };
                tcp::create_packet(route.source, target, source_port, destination_port, flags)
            }
            PacketSpec::Udp { source_port, destination_port, .. } => udp::create_packet(source_port, destination_port, &[]),
            PacketSpec::Arp { .. } => {
                return Err(ScanError::CollaboratorFailure("ARP probe on a transport session".into()));
            }
        }
        .map_err(build_failure)?;

        self.handle.send_to(&bytes, spec.target())
    }
}

/// Callers waiting for an answer, matched against every captured packet.
#[derive(Default)]
struct Pending {
    next_id: AtomicU64,
    waiters: Mutex<Vec<Waiter>>,
}

struct Waiter {
    id: u64,
    spec: PacketSpec,
    reply: Sender<ResponsePacket>,
}

/// A registered wait. Dropping it withdraws the registration.
struct Ticket<'a> {
    id: u64,
    reply: Receiver<ResponsePacket>,
    pending: &'a Pending,
}

impl Pending {
    fn register(&self, spec: PacketSpec) -> Ticket<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel();
        lock(&self.waiters).push(Waiter { id, spec, reply: tx });
        Ticket { id, reply: rx, pending: self }
    }

    /// Hands `reply` to the oldest waiter it answers. Returns whether anyone
    /// took it.
    fn deliver(&self, reply: ResponsePacket) -> bool {
        let mut waiters = lock(&self.waiters);
        let Some(pos) = waiters.iter().position(|waiter| reply.answers(&waiter.spec)) else {
            return false;
        };
        waiters.remove(pos).reply.send(reply).is_ok()
    }

    fn cancel(&self, id: u64) {
        lock(&self.waiters).retain(|waiter| waiter.id != id);
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        self.pending.cancel(self.id);
    }
}

/// One open set of channels shared by every caller of a family.
struct Hub {
    outbound: Mutex<Box<dyn Outbound>>,
    pending: Arc<Pending>,
    stop: Arc<AtomicBool>,
    listeners: Vec<JoinHandle<()>>,
}

impl Hub {
    /// Spawns one listener thread per receiving half.
    fn start(outbound: Box<dyn Outbound>, inbound: Vec<Box<dyn Inbound>>) -> Self {
        let pending = Arc::new(Pending::default());
        let stop = Arc::new(AtomicBool::new(false));
        let listeners = inbound
            .into_iter()
            .map(|mut rx| {
                let (pending, stop) = (Arc::clone(&pending), Arc::clone(&stop));
                thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        if let Some(reply) = rx.recv(POLL_INTERVAL) {
                            pending.deliver(reply);
                        }
                    }
                })
            })
            .collect();
        Self { outbound: Mutex::new(outbound), pending, stop, listeners }
    }

    fn send(&self, spec: &PacketSpec) -> Result<()> {
        lock(&self.outbound).send(spec)
    }
}

impl Drop for Hub {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        for listener in self.listeners.drain(..) {
            let _ = listener.join();
        }
    }
}

/// Sends every probe, then waits until `timeout` for the listeners to hand
/// back answers; probes still unanswered are sent again up to `retries` times.
fn exchange(
    hub: &Hub,
    specs: &[PacketSpec],
    timeout: Duration,
    retries: u32,
) -> Result<Vec<(PacketSpec, ResponsePacket)>> {
    let mut replies: Vec<Option<ResponsePacket>> = vec![None; specs.len()];

    for attempt in 0..=retries {
        let unanswered: Vec<usize> = (0..specs.len()).filter(|&i| replies[i].is_none()).collect();
        if unanswered.is_empty() {
            break;
        }
        if attempt > 0 {
            debug!("Resending {} unanswered probes (attempt {})", unanswered.len(), attempt + 1);
        }

        // Registered before sending, so a fast answer has somewhere to go.
        let tickets: Vec<(usize, Ticket<'_>)> =
            unanswered.iter().map(|&i| (i, hub.pending.register(specs[i]))).collect();
        for &i in &unanswered {
            hub.send(&specs[i])?;
        }

        let deadline = Instant::now() + timeout;
        for (i, ticket) in &tickets {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if let Ok(reply) = ticket.reply.recv_timeout(remaining) {
                replies[*i] = Some(reply);
            }
        }
    }

    Ok(specs
        .iter()
        .copied()
        .zip(replies)
        .filter_map(|(spec, reply)| reply.map(|reply| (spec, reply)))
        .collect())
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn build_failure(err: anyhow::Error) -> ScanError {
    ScanError::CollaboratorFailure(format!("building probe: {err:#}"))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
