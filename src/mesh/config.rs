//! Engine configuration.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::protocol::Capabilities;

/// Broadcast group every node listens on for discovery frames.
pub const DISCOVERY_GROUP: u32 = 1;

/// Mesh engine configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeshConfig {
    /// Period between discovery broadcasts.
    pub discovery_interval: Duration,
    /// Period between maintenance sweeps (one tick each).
    pub maintenance_interval: Duration,
    /// Ticks without a discovery frame before a peer is dropped.
    pub peer_timeout_ticks: u16,
    /// Ticks without a new fragment before a partial message is dropped.
    pub reassembly_timeout_ticks: u16,
    /// Upper bound on a reassembled message in bytes. `None` uses the
    /// largest payload the fragment scheme can carry over the transport.
    pub max_message_size: Option<usize>,
    /// Pause before the single retry of a failed unicast write.
    pub retry_pause: Duration,
    /// Capability bits announced in discovery frames.
    pub application_capabilities: Capabilities,
    /// Broadcast group used for discovery.
    pub discovery_group: u32,
    /// Seed for address selection. `None` draws from OS entropy.
    pub rng_seed: Option<u64>,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            discovery_interval: Duration::from_millis(3000),
            maintenance_interval: Duration::from_millis(4000),
            peer_timeout_ticks: 2,
            reassembly_timeout_ticks: 2,
            max_message_size: None,
            retry_pause: Duration::from_millis(2),
            application_capabilities: Capabilities::NONE,
            discovery_group: DISCOVERY_GROUP,
            rng_seed: None,
        }
    }
}

impl MeshConfig {
    /// Announce the given capability bits.
    #[must_use]
    pub const fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.application_capabilities = capabilities;
        self
    }

    /// Use a fixed seed for address selection.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}
