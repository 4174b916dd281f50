//! Peer discovery payload

use super::{Capabilities, DISCOVERY_PAYLOAD_SIZE, Error, PROTOCOL_VERSION, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Body of a discovery broadcast (9 bytes)
///
/// ```text
/// [version (1)] [network caps (1)] [application caps (1)] [num_peers (2)] [uptime_seconds (4)]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeerDiscovery {
    /// Protocol version of the announcing node
    pub protocol_version: u8,
    /// Reserved, always zero
    pub network_capabilities: u8,
    /// Application capability bits of the announcing node
    pub application_capabilities: Capabilities,
    /// Size of the announcing node's peer table
    pub num_peers: u16,
    /// Seconds since the announcing node started
    pub uptime_seconds: u32,
}

impl PeerDiscovery {
    /// Build an announcement for the current protocol version
    #[must_use]
    pub const fn new(
        application_capabilities: Capabilities,
        num_peers: u16,
        uptime_seconds: u32,
    ) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            network_capabilities: 0,
            application_capabilities,
            num_peers,
            uptime_seconds,
        }
    }

    /// Convert to bytes (little-endian)
    #[must_use]
    pub fn to_bytes(&self) -> [u8; DISCOVERY_PAYLOAD_SIZE] {
        let mut bytes = [0u8; DISCOVERY_PAYLOAD_SIZE];
        bytes[0] = self.protocol_version;
        bytes[1] = self.network_capabilities;
        bytes[2] = self.application_capabilities.bits();
        bytes[3..5].copy_from_slice(&self.num_peers.to_le_bytes());
        bytes[5..9].copy_from_slice(&self.uptime_seconds.to_le_bytes());
        bytes
    }

    /// Parse an announcement. The payload must be exactly
    /// [`DISCOVERY_PAYLOAD_SIZE`] bytes and carry this node's protocol version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw: &[u8; DISCOVERY_PAYLOAD_SIZE] =
            bytes.try_into().map_err(|_| Error::TooShort {
                needed: DISCOVERY_PAYLOAD_SIZE,
                got: bytes.len(),
            })?;

        if raw[0] != PROTOCOL_VERSION {
            return Err(Error::VersionMismatch {
                expected: PROTOCOL_VERSION,
                found: raw[0],
            });
        }

        Ok(Self {
            protocol_version: raw[0],
            network_capabilities: raw[1],
            application_capabilities: Capabilities::from_bits(raw[2]),
            num_peers: u16::from_le_bytes([raw[3], raw[4]]),
            uptime_seconds: u32::from_le_bytes([raw[5], raw[6], raw[7], raw[8]]),
        })
    }
}
