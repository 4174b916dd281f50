//! Transport-level error types.

use core::fmt;

use super::Destination;

/// Error type for radio transport operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The frame was not acknowledged or could not be put on air.
    WriteFailed {
        /// Where the frame was going.
        dest: Destination,
    },
    /// Frame exceeds the transport's maximum frame size.
    FrameTooLarge {
        /// Length of the frame provided by the caller.
        len: usize,
        /// Maximum frame length supported by the transport.
        max: usize,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteFailed { dest } => write!(f, "write to {dest} failed"),
            Self::FrameTooLarge { len, max } => {
                write!(f, "frame too large: {len} bytes (max {max})")
            }
        }
    }
}

impl std::error::Error for TransportError {}
