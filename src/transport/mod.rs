//! Radio transport contract and an in-memory radio medium.
//!
//! The engine never touches a radio driver directly. Anything that can put a
//! bounded frame on air, address it to a unicast pipe or a broadcast group,
//! and hand back received frames can carry the mesh.

mod error;
mod memory;

use std::fmt;

use bytes::Bytes;

use crate::protocol::Address;

pub use error::TransportError;
pub use memory::{DEFAULT_MAX_FRAME_SIZE, MemoryTransport, RadioMedium, SENT_LOG_CAPACITY};

/// Where a frame is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Acknowledged delivery to one node's unicast pipe.
    Unicast(Address),
    /// Unacknowledged delivery to every node listening on a group.
    Broadcast(u32),
}

impl Destination {
    /// Check whether this is a broadcast group.
    #[must_use]
    pub const fn is_broadcast(self) -> bool {
        matches!(self, Self::Broadcast(_))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unicast(addr) => write!(f, "node {addr}"),
            Self::Broadcast(group) => write!(f, "group {group}"),
        }
    }
}

/// Packet radio seen by the mesh engine.
///
/// Implementations are driven from a single thread; every call may block
/// briefly but none may wait for traffic.
pub trait Transport {
    /// Largest frame, header included, the radio accepts.
    fn max_frame_size(&self) -> usize;

    /// Listen for unicast frames addressed to `address`.
    fn configure_unicast_address(&mut self, address: Address) -> Result<(), TransportError>;

    /// Listen for frames broadcast to `group`.
    fn open_broadcast_group(&mut self, group: u32) -> Result<(), TransportError>;

    /// Put one frame on air. Failures are transient and may be retried.
    fn send_frame(&mut self, dest: Destination, frame: &[u8]) -> Result<(), TransportError>;

    /// Whether a received frame is waiting.
    fn frame_available(&mut self) -> bool;

    /// Take the next received frame, if any.
    fn read_frame(&mut self) -> Option<Bytes>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn max_frame_size(&self) -> usize {
        (**self).max_frame_size()
    }

    fn configure_unicast_address(&mut self, address: Address) -> Result<(), TransportError> {
        (**self).configure_unicast_address(address)
    }

    fn open_broadcast_group(&mut self, group: u32) -> Result<(), TransportError> {
        (**self).open_broadcast_group(group)
    }

    fn send_frame(&mut self, dest: Destination, frame: &[u8]) -> Result<(), TransportError> {
        (**self).send_frame(dest, frame)
    }

    fn frame_available(&mut self) -> bool {
        (**self).frame_available()
    }

    fn read_frame(&mut self) -> Option<Bytes> {
        (**self).read_frame()
    }
}
