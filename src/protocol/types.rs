//! Addresses, message types and capability bits

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Node address on the radio network. Zero means "not yet assigned".
pub type Address = u32;

/// Reserved address of a node that has not chosen one yet
pub const UNASSIGNED: Address = 0;

/// Message type byte carried in every header.
///
/// Only [`MessageType::PEER_DISCOVERY`] is interpreted by the engine; every
/// other value is handed to the application untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MessageType(pub u8);

impl MessageType {
    /// Peer discovery broadcast
    pub const PEER_DISCOVERY: Self = Self(0);
    /// First type value available to applications
    pub const USER: Self = Self(1);

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Check whether this type is handled by the engine itself
    #[must_use]
    pub const fn is_internal(self) -> bool {
        self.0 == Self::PEER_DISCOVERY.0
    }
}

impl From<u8> for MessageType {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_internal() {
            write!(f, "PeerDiscovery")
        } else {
            write!(f, "User({})", self.0)
        }
    }
}

/// Application capability bitmask announced in discovery frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Capabilities(u8);

impl Capabilities {
    /// No capabilities
    pub const NONE: Self = Self(0);
    /// Node publishes events to subscribers
    pub const PUBLISH_EVENTS: Self = Self(1 << 0);

    /// Create from byte
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Convert to byte
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Add the bits of `other`
    #[must_use]
    pub const fn with(mut self, other: Self) -> Self {
        self.0 |= other.0;
        self
    }

    /// Check if every bit of `other` is set
    #[must_use]
    pub const fn has(self, other: Self) -> bool {
        other.0 != 0 && (self.0 & other.0) == other.0
    }

    /// Check if the node publishes events
    #[must_use]
    pub const fn publishes_events(self) -> bool {
        self.has(Self::PUBLISH_EVENTS)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.publishes_events() {
            write!(f, "PUBLISH_EVENTS")?;
            let rest = self.0 & !Self::PUBLISH_EVENTS.0;
            if rest != 0 {
                write!(f, " | {rest:#04x}")?;
            }
            Ok(())
        } else if self.0 == 0 {
            write!(f, "NONE")
        } else {
            write!(f, "{:#04x}", self.0)
        }
    }
}
