//! Table of directly reachable peers with tick-based liveness.

use std::collections::HashMap;

use crate::protocol::{Address, Capabilities};

/// A node heard through its discovery broadcasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    address: Address,
    age: u16,
    capabilities: Capabilities,
    num_peers: u16,
    uptime_seconds: u32,
}

impl Peer {
    fn new(address: Address, capabilities: Capabilities) -> Self {
        Self {
            address,
            age: 0,
            capabilities,
            num_peers: 0,
            uptime_seconds: 0,
        }
    }

    /// Peer address
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Maintenance ticks since the last discovery frame
    #[must_use]
    pub const fn age(&self) -> u16 {
        self.age
    }

    /// Capabilities from the latest discovery frame
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Peer-table size the peer reported last
    #[must_use]
    pub const fn num_peers(&self) -> u16 {
        self.num_peers
    }

    /// Uptime the peer reported last
    #[must_use]
    pub const fn uptime_seconds(&self) -> u32 {
        self.uptime_seconds
    }

    pub(crate) fn set_status(&mut self, num_peers: u16, uptime_seconds: u32) {
        self.num_peers = num_peers;
        self.uptime_seconds = uptime_seconds;
    }
}

/// Live peers keyed by address.
#[derive(Debug, Default)]
pub struct PeerTable {
    peers: HashMap<Address, Peer>,
}

impl PeerTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sign of life from `address`.
    ///
    /// Creates the peer with age zero and returns `true` if it was unknown;
    /// otherwise resets its age, updates its capabilities and returns `false`.
    pub fn touch(&mut self, address: Address, capabilities: Capabilities) -> bool {
        match self.peers.get_mut(&address) {
            Some(peer) => {
                peer.age = 0;
                peer.capabilities = capabilities;
                false
            }
            None => {
                self.peers.insert(address, Peer::new(address, capabilities));
                true
            }
        }
    }

    /// Age every peer by one tick and remove those whose age reaches
    /// `timeout_ticks`. Evicted peers are returned ordered by address.
    pub fn tick_and_evict(&mut self, timeout_ticks: u16) -> Vec<Peer> {
        let mut expired = Vec::new();
        for peer in self.peers.values_mut() {
            peer.age = peer.age.saturating_add(1);
            if peer.age >= timeout_ticks {
                expired.push(peer.address);
            }
        }

        let mut evicted: Vec<Peer> = expired
            .into_iter()
            .filter_map(|address| self.peers.remove(&address))
            .collect();
        evicted.sort_by_key(Peer::address);
        evicted
    }

    /// Find a peer.
    #[must_use]
    pub fn lookup(&self, address: Address) -> Option<&Peer> {
        self.peers.get(&address)
    }

    pub(crate) fn lookup_mut(&mut self, address: Address) -> Option<&mut Peer> {
        self.peers.get_mut(&address)
    }

    /// Whether `address` belongs to a live peer.
    #[must_use]
    pub fn contains(&self, address: Address) -> bool {
        self.peers.contains_key(&address)
    }

    /// Number of live peers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.peers.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Iterate over live peers in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }
}
