//! Mesh frame header
//!
//! The header is 8 bytes and precedes the payload of every radio frame.

use super::{Address, Error, HEADER_SIZE, MessageType, PROTOCOL_VERSION, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const SPLIT_MORE_BIT: u8 = 0x80;
const SPLIT_PART_MASK: u8 = 0x7F;
const NIBBLE: u8 = 0x0F;

/// Mesh frame header (8 bytes)
///
/// # Wire Format
///
/// ```text
///  0       4       8              16 17           24              32
/// +-------+-------+---------------+-+-------------+---------------+
/// |version|  ttl  |  message id   |M| split part  |     type      |
/// +-------+-------+---------------+-+-------------+---------------+
/// |                  address_from (little-endian)                 |
/// +---------------------------------------------------------------+
/// ```
///
/// `M` is `split_more`. While it is set, `split_part` is the zero-based index
/// of the fragment. On the terminal fragment (`M` clear) `split_part` holds the
/// total fragment count minus one, which is also that fragment's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Header {
    protocol_version: u8,
    ttl: u8,
    message_id: u8,
    split_more: bool,
    split_part: u8,
    msg_type: MessageType,
    address_from: Address,
}

impl Header {
    /// Create a header for the current protocol version with a zero TTL.
    ///
    /// `split_part` is truncated to 7 bits.
    #[must_use]
    pub const fn new(
        msg_type: MessageType,
        address_from: Address,
        message_id: u8,
        split_part: u8,
        split_more: bool,
    ) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            ttl: 0,
            message_id,
            split_more,
            split_part: split_part & SPLIT_PART_MASK,
            msg_type,
            address_from,
        }
    }

    /// Replace the TTL nibble. Carried on the wire but never acted upon.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl & NIBBLE;
        self
    }

    /// Get protocol version
    #[must_use]
    pub const fn protocol_version(&self) -> u8 {
        self.protocol_version
    }

    /// Get TTL
    #[must_use]
    pub const fn ttl(&self) -> u8 {
        self.ttl
    }

    /// Get message ID
    #[must_use]
    pub const fn message_id(&self) -> u8 {
        self.message_id
    }

    /// More fragments follow this one
    #[must_use]
    pub const fn split_more(&self) -> bool {
        self.split_more
    }

    /// Fragment index, or final index on the terminal fragment
    #[must_use]
    pub const fn split_part(&self) -> u8 {
        self.split_part
    }

    /// Get message type
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        self.msg_type
    }

    /// Get sender address
    #[must_use]
    pub const fn address_from(&self) -> Address {
        self.address_from
    }

    /// Mark this header as describing the terminal fragment.
    pub(crate) fn set_terminal(&mut self, final_part: u8) {
        self.split_more = false;
        self.split_part = final_part & SPLIT_PART_MASK;
    }

    /// Reject headers from a different protocol version
    pub fn validate(&self) -> Result<()> {
        if self.protocol_version != PROTOCOL_VERSION {
            return Err(Error::VersionMismatch {
                expected: PROTOCOL_VERSION,
                found: self.protocol_version,
            });
        }
        Ok(())
    }

    /// Convert to bytes (little-endian address)
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];

        bytes[0] = ((self.protocol_version & NIBBLE) << 4) | (self.ttl & NIBBLE);
        bytes[1] = self.message_id;
        bytes[2] = (self.split_part & SPLIT_PART_MASK)
            | if self.split_more { SPLIT_MORE_BIT } else { 0 };
        bytes[3] = self.msg_type.as_u8();
        bytes[4..8].copy_from_slice(&self.address_from.to_le_bytes());

        bytes
    }

    /// Parse from bytes (little-endian address).
    ///
    /// Only the length is checked here; call [`Header::validate`] to enforce
    /// the protocol version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let Some(raw) = bytes.get(..HEADER_SIZE) else {
            return Err(Error::TooShort {
                needed: HEADER_SIZE,
                got: bytes.len(),
            });
        };

        Ok(Self {
            protocol_version: raw[0] >> 4,
            ttl: raw[0] & NIBBLE,
            message_id: raw[1],
            split_more: raw[2] & SPLIT_MORE_BIT != 0,
            split_part: raw[2] & SPLIT_PART_MASK,
            msg_type: MessageType(raw[3]),
            address_from: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
        })
    }
}

/// Encode a header for the current protocol version.
#[must_use]
pub fn encode_header(
    msg_type: MessageType,
    address_from: Address,
    message_id: u8,
    split_part: u8,
    split_more: bool,
) -> [u8; HEADER_SIZE] {
    Header::new(msg_type, address_from, message_id, split_part, split_more).to_bytes()
}

/// Decode a header, failing with [`Error::TooShort`] on short input.
pub fn decode_header(bytes: &[u8]) -> Result<Header> {
    Header::from_bytes(bytes)
}
