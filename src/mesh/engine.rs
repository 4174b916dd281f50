//! Mesh engine: addressing, discovery schedule, send path and receive path.

use std::time::Duration;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument, trace, warn};

use super::{Clock, MeshConfig, MeshHandler, PeerTable, Reassembly, ReassemblyStore, SystemClock};
use crate::protocol::metrics::{FrameDirection, Metrics};
use crate::protocol::{
    Address, Capabilities, Error, HEADER_SIZE, Header, MessageType, MetricsSnapshot,
    PeerDiscovery, Result, UNASSIGNED, decode_header, encode_frame, fragment_plan,
    max_payload_len, payload_per_frame,
};
use crate::transport::{Destination, Transport};

/// Highest address handed out by address selection.
pub const MAX_ADDRESS: Address = 0xFFFF;

/// Addressing state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// No address chosen yet.
    Unaddressed,
    /// Address assigned; discovery broadcasts are running.
    Addressed,
}

/// Single-hop mesh node driven by periodic calls to [`MeshEngine::update`].
///
/// The engine owns its transport, peer table and reassembly store. It spawns
/// no threads; all work happens inside `update` and `send_message`, neither of
/// which may be called concurrently.
#[derive(Debug)]
pub struct MeshEngine<T, C = SystemClock> {
    transport: T,
    clock: C,
    config: MeshConfig,
    address: Address,
    next_message_id: u8,
    rng: StdRng,
    peers: PeerTable,
    reassembly: ReassemblyStore,
    max_message_size: usize,
    started_at: Duration,
    last_discovery: Option<Duration>,
    last_maintenance: Duration,
    metrics: Metrics,
}

impl<T: Transport> MeshEngine<T, SystemClock> {
    /// Create an engine using the system clock.
    pub fn new(transport: T, config: MeshConfig) -> Result<Self> {
        Self::with_clock(transport, config, SystemClock::new())
    }
}

impl<T: Transport, C: Clock> MeshEngine<T, C> {
    /// Create an engine with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFrameSize`] if the transport's frames cannot
    /// carry a header plus payload.
    pub fn with_clock(transport: T, config: MeshConfig, clock: C) -> Result<Self> {
        let frame = transport.max_frame_size();
        let per_frame = payload_per_frame(frame)?;
        let protocol_max = max_payload_len(frame)?;
        let max_message_size = config
            .max_message_size
            .map_or(protocol_max, |limit| limit.min(protocol_max));

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let now = clock.now();

        Ok(Self {
            transport,
            clock,
            config,
            address: UNASSIGNED,
            next_message_id: 0,
            rng,
            peers: PeerTable::new(),
            reassembly: ReassemblyStore::new(per_frame, max_message_size),
            max_message_size,
            started_at: now,
            last_discovery: None,
            last_maintenance: now,
            metrics: Metrics::default(),
        })
    }

    /// Configure the radio to hear discovery broadcasts and start the uptime
    /// and maintenance clocks.
    pub fn begin(&mut self) -> Result<()> {
        self.transport.open_broadcast_group(self.config.discovery_group)?;
        let now = self.clock.now();
        self.started_at = now;
        self.last_maintenance = now;
        self.last_discovery = None;
        debug!(group = self.config.discovery_group, "mesh engine started");
        Ok(())
    }

    /// Run one round of the schedule: discovery broadcast if due, drain every
    /// buffered frame, then age peers and partial messages if due.
    pub fn update<H: MeshHandler + ?Sized>(&mut self, handler: &mut H) {
        let now = self.clock.now();
        let discovery_due = self
            .last_discovery
            .is_none_or(|last| now.saturating_sub(last) >= self.config.discovery_interval);
        if discovery_due {
            if !self.is_ready() {
                self.choose_address();
            }
            self.send_peer_discovery();
        }

        while self.transport.frame_available() {
            let Some(frame) = self.transport.read_frame() else {
                break;
            };
            self.on_frame_received(&frame, handler);
        }

        let now = self.clock.now();
        if now.saturating_sub(self.last_maintenance) >= self.config.maintenance_interval {
            self.run_maintenance(handler);
            self.last_maintenance = now;
        }
    }

    /// Send an application message, fragmenting it as needed.
    ///
    /// Unicast fragments whose write fails are retried once after
    /// [`MeshConfig::retry_pause`]; broadcast fragments are sent once. Write
    /// failures are counted but not reported.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] before an address is assigned and
    /// [`Error::PayloadTooLarge`] if the payload exceeds the message size
    /// limit.
    #[instrument(level = "debug", skip(self, payload), fields(len = payload.len()))]
    pub fn send_message(
        &mut self,
        to: Address,
        msg_type: MessageType,
        payload: &[u8],
        broadcast: bool,
    ) -> Result<()> {
        if !self.is_ready() {
            return Err(Error::NotReady);
        }
        let dest = if broadcast {
            Destination::Broadcast(to)
        } else {
            Destination::Unicast(to)
        };
        self.transmit(dest, msg_type, payload)
    }

    /// Draw random addresses until one is not used by a known peer, assign
    /// it, and listen on it.
    #[instrument(level = "debug", skip(self))]
    pub fn choose_address(&mut self) -> Address {
        let address = loop {
            let candidate = self.rng.gen_range(1..=MAX_ADDRESS);
            if !self.peers.contains(candidate) {
                break candidate;
            }
            trace!(candidate, "address in use by a peer; drawing again");
        };

        self.address = address;
        if let Err(err) = self.transport.configure_unicast_address(address) {
            warn!(address, %err, "failed to configure unicast pipe");
        }
        info!(address, "chose address");
        address
    }

    /// This node's address, or zero before one is chosen.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Whether an address has been assigned.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.address != UNASSIGNED
    }

    /// Current addressing state.
    #[must_use]
    pub const fn state(&self) -> NodeState {
        if self.is_ready() {
            NodeState::Addressed
        } else {
            NodeState::Unaddressed
        }
    }

    /// Live peers.
    #[must_use]
    pub const fn peers(&self) -> &PeerTable {
        &self.peers
    }

    /// Messages currently being reassembled.
    #[must_use]
    pub fn pending_messages(&self) -> usize {
        self.reassembly.len()
    }

    /// Largest message this engine sends or reassembles.
    #[must_use]
    pub const fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Capability bits announced in discovery frames.
    #[must_use]
    pub const fn application_capabilities(&self) -> Capabilities {
        self.config.application_capabilities
    }

    /// Change the capability bits announced from the next discovery frame on.
    pub fn set_application_capabilities(&mut self, capabilities: Capabilities) {
        self.config.application_capabilities = capabilities;
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// Counter snapshot.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.totals()
    }

    /// Underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn send_peer_discovery(&mut self) {
        let now = self.clock.now();
        self.last_discovery = Some(now);

        let uptime = now.saturating_sub(self.started_at).as_secs();
        let announcement = PeerDiscovery::new(
            self.config.application_capabilities,
            u16::try_from(self.peers.count()).unwrap_or(u16::MAX),
            u32::try_from(uptime).unwrap_or(u32::MAX),
        );
        let dest = Destination::Broadcast(self.config.discovery_group);
        trace!(
            address = self.address,
            num_peers = announcement.num_peers,
            "sending peer discovery"
        );
        let body = announcement.to_bytes();
        if let Err(err) = self.transmit(dest, MessageType::PEER_DISCOVERY, &body) {
            warn!(%err, "failed to build discovery frame");
        }
    }

    fn transmit(&mut self, dest: Destination, msg_type: MessageType, payload: &[u8]) -> Result<()> {
        if payload.len() > self.max_message_size {
            return Err(Error::PayloadTooLarge {
                size: payload.len(),
                max: self.max_message_size,
            });
        }
        let plan = fragment_plan(payload.len(), self.transport.max_frame_size())?;

        let message_id = self.next_message_id;
        self.next_message_id = self.next_message_id.wrapping_add(1);

        for fragment in plan {
            let header = Header::new(
                msg_type,
                self.address,
                message_id,
                fragment.split_part,
                fragment.split_more,
            );
            let frame = encode_frame(&header, &payload[fragment.range()]);
            self.write_frame(dest, &frame);
            trace!(
                %dest,
                msg_id = message_id,
                split_part = fragment.split_part,
                split_more = fragment.split_more,
                len = fragment.len,
                "fragment sent"
            );
        }
        Ok(())
    }

    fn write_frame(&mut self, dest: Destination, frame: &[u8]) -> bool {
        let err = match self.transport.send_frame(dest, frame) {
            Ok(()) => {
                self.metrics.record_frame(FrameDirection::Sent);
                return true;
            }
            Err(err) => err,
        };

        if dest.is_broadcast() {
            debug!(%dest, %err, "broadcast write failed");
            self.metrics.record_send_failure();
            return false;
        }

        debug!(%dest, %err, "unicast write failed; retrying once");
        self.metrics.record_retry();
        self.clock.pause(self.config.retry_pause);
        match self.transport.send_frame(dest, frame) {
            Ok(()) => {
                self.metrics.record_frame(FrameDirection::Sent);
                true
            }
            Err(err) => {
                warn!(%dest, %err, "unicast write failed after retry; dropping fragment");
                self.metrics.record_send_failure();
                false
            }
        }
    }

    fn on_frame_received<H: MeshHandler + ?Sized>(&mut self, raw: &Bytes, handler: &mut H) {
        self.metrics.record_frame(FrameDirection::Received);

        let header = match decode_header(raw).and_then(|header| {
            header.validate()?;
            Ok(header)
        }) {
            Ok(header) => header,
            Err(err) => {
                self.metrics.record_malformed();
                debug!(%err, len = raw.len(), "discarding malformed frame");
                return;
            }
        };

        match self.reassembly.accept_fragment(&header, &raw[HEADER_SIZE..]) {
            Reassembly::Pending => {}
            Reassembly::Complete(message) => {
                let (header, payload) = message.into_parts();
                self.metrics.record_delivered(header.message_type());
                if header.message_type().is_internal() {
                    self.handle_discovery(&header, &payload, handler);
                } else {
                    handler.on_message(&header, &payload);
                }
            }
            Reassembly::Rejected(dropped) => {
                self.metrics.record_reassembly_rejected();
                handler.on_message_dropped(&dropped);
            }
        }
    }

    fn handle_discovery<H: MeshHandler + ?Sized>(
        &mut self,
        header: &Header,
        payload: &[u8],
        handler: &mut H,
    ) {
        let announcement = match PeerDiscovery::from_bytes(payload) {
            Ok(announcement) => announcement,
            Err(err) => {
                debug!(from = header.address_from(), %err, "ignoring discovery frame");
                return;
            }
        };

        let from = header.address_from();
        if from == UNASSIGNED || (self.is_ready() && from == self.address) {
            warn!(from, "discovery frame carries our own or no address; ignoring");
            return;
        }

        let is_new = self.peers.touch(from, announcement.application_capabilities);
        let Some(peer) = self.peers.lookup_mut(from) else {
            return;
        };
        peer.set_status(announcement.num_peers, announcement.uptime_seconds);

        if is_new {
            self.metrics.record_peer_joined();
            info!(
                address = from,
                uptime = announcement.uptime_seconds,
                num_peers = announcement.num_peers,
                "new peer"
            );
            handler.on_new_peer(peer);
        }
    }

    fn run_maintenance<H: MeshHandler + ?Sized>(&mut self, handler: &mut H) {
        for peer in self.peers.tick_and_evict(self.config.peer_timeout_ticks) {
            self.metrics.record_peer_lost();
            info!(address = peer.address(), "lost peer");
            handler.on_lost_peer(&peer);
        }

        for dropped in self
            .reassembly
            .tick_and_evict(self.config.reassembly_timeout_ticks)
        {
            self.metrics.record_reassembly_timeout();
            debug!(
                from = dropped.header().address_from(),
                msg_id = dropped.header().message_id(),
                fragments = dropped.fragments_received(),
                "partial message timed out"
            );
            handler.on_message_dropped(&dropped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{ManualClock, MeshEvent};
    use crate::transport::{MemoryTransport, RadioMedium};

    fn engine(
        medium: &RadioMedium,
        seed: u64,
    ) -> (MeshEngine<MemoryTransport, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let config = MeshConfig {
            retry_pause: Duration::from_millis(5),
            ..MeshConfig::default().with_seed(seed)
        };
        let mut engine = MeshEngine::with_clock(medium.attach(), config, clock.clone()).unwrap();
        engine.begin().unwrap();
        (engine, clock)
    }

    #[test]
    fn first_update_assigns_address_and_announces() {
        let medium = RadioMedium::default();
        let (mut node, _clock) = engine(&medium, 1);
        assert_eq!(node.state(), NodeState::Unaddressed);
        assert!(matches!(
            node.send_message(5, MessageType::USER, b"x", false),
            Err(Error::NotReady)
        ));

        node.update(&mut Vec::<MeshEvent>::new());
        assert_eq!(node.state(), NodeState::Addressed);
        assert!((1..=MAX_ADDRESS).contains(&node.address()));
        assert_eq!(node.transport().unicast_address(), Some(node.address()));

        let sent = node.transport().sent_frames();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, Destination::Broadcast(1));
        assert_eq!(sent[0].1.len(), HEADER_SIZE + 9);
    }

    #[test]
    fn choose_address_twice_with_empty_table() {
        let medium = RadioMedium::default();
        let (mut node, _clock) = engine(&medium, 2);
        let first = node.choose_address();
        let second = node.choose_address();
        assert_ne!(first, 0);
        assert_ne!(second, 0);
        assert_eq!(node.address(), second);
    }

    #[test]
    fn discovery_waits_for_interval() {
        let medium = RadioMedium::default();
        let (mut node, clock) = engine(&medium, 3);
        node.update(&mut Vec::<MeshEvent>::new());
        clock.advance(Duration::from_millis(2999));
        node.update(&mut Vec::<MeshEvent>::new());
        assert_eq!(node.transport().sent_frames().len(), 1);

        clock.advance(Duration::from_millis(1));
        node.update(&mut Vec::<MeshEvent>::new());
        assert_eq!(node.transport().sent_frames().len(), 2);
    }

    #[test]
    fn unicast_retry_once_then_give_up() {
        let medium = RadioMedium::default();
        let (mut node, clock) = engine(&medium, 4);
        let mut peer = medium.attach();
        peer.configure_unicast_address(500).unwrap();
        node.update(&mut Vec::<MeshEvent>::new());
        let before = clock.now();
        let attempts = node.transport().send_attempts();

        // 70 bytes: three fragments; the first fails twice, the second once.
        node.transport().fail_next_sends(3);
        node.send_message(500, MessageType::USER, &[1u8; 70], false).unwrap();

        assert_eq!(node.transport().send_attempts() - attempts, 5);
        assert_eq!(peer.pending(), 2);
        assert_eq!(clock.now() - before, Duration::from_millis(10));
        let metrics = node.metrics();
        assert_eq!(metrics.send_retries, 2);
        assert_eq!(metrics.send_failures, 1);
    }

    #[test]
    fn broadcast_failure_is_not_retried() {
        let medium = RadioMedium::default();
        let (mut node, _clock) = engine(&medium, 5);
        node.update(&mut Vec::<MeshEvent>::new());
        let attempts = node.transport().send_attempts();

        node.transport().fail_next_sends(1);
        node.send_message(9, MessageType::USER, b"hello", true).unwrap();
        assert_eq!(node.transport().send_attempts() - attempts, 1);
        assert_eq!(node.metrics().send_retries, 0);
        assert_eq!(node.metrics().send_failures, 1);
    }

    #[test]
    fn oversize_payload_rejected() {
        let medium = RadioMedium::default();
        let (mut node, _clock) = engine(&medium, 6);
        node.update(&mut Vec::<MeshEvent>::new());
        let max = node.max_message_size();
        assert!(matches!(
            node.send_message(9, MessageType::USER, &vec![0u8; max + 1], true),
            Err(Error::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn message_ids_wrap_per_engine() {
        let medium = RadioMedium::default();
        let (mut node, _clock) = engine(&medium, 7);
        node.update(&mut Vec::<MeshEvent>::new());
        for _ in 0..256 {
            node.send_message(1, MessageType::USER, b"", true).unwrap();
        }
        let sent = node.transport().sent_frames();
        let ids: Vec<u8> = sent
            .iter()
            .map(|(_, frame)| decode_header(frame).unwrap().message_id())
            .collect();
        // Discovery took id 0, so the 256th user message wraps back to 0.
        assert_eq!(ids[0], 0);
        assert_eq!(ids[1], 1);
        assert_eq!(ids[256], 0);
    }

    #[test]
    fn malformed_frames_are_counted_and_dropped() {
        let medium = RadioMedium::default();
        let (mut node, _clock) = engine(&medium, 8);
        node.transport().inject(Bytes::from_static(&[0x10, 0, 0]));
        let mut bad_version = Header::new(MessageType::USER, 3, 0, 0, false).to_bytes();
        bad_version[0] = 0x20;
        node.transport().inject(Bytes::copy_from_slice(&bad_version));

        let mut events: Vec<MeshEvent> = Vec::new();
        node.update(&mut events);
        assert!(events.is_empty());
        assert_eq!(node.metrics().malformed_frames, 2);
        assert_eq!(node.metrics().frames_received, 2);
    }
}
