//! Mesh protocol error types

use thiserror::Error;

use crate::transport::TransportError;

/// Mesh protocol errors
#[derive(Error, Debug)]
pub enum Error {
    /// Frame shorter than the fixed header
    #[error("frame too short: need {needed} bytes, got {got}")]
    TooShort {
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },

    /// Protocol version does not match this implementation
    #[error("protocol version mismatch: expected {expected}, got {found}")]
    VersionMismatch {
        /// Version this node speaks
        expected: u8,
        /// Version carried by the frame
        found: u8,
    },

    /// Payload cannot be carried by the fragment scheme
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload size
        size: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Transport frame cannot hold a header plus at least one payload byte
    #[error("frame size {frame} leaves no room for payload after {header}-byte header")]
    InvalidFrameSize {
        /// Maximum frame size reported by the transport
        frame: usize,
        /// Fixed header size
        header: usize,
    },

    /// Operation requires an assigned address
    #[error("node has no address yet")]
    NotReady,

    /// Transport failure during setup
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
