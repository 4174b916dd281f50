//! Mesh protocol core implementation
//!
//! This module provides the wire format, discovery payload and fragmentation
//! codec.

mod codec;
mod discovery;
mod error;
mod header;
pub(crate) mod metrics;
mod types;

pub use codec::{Fragment, encode_frame, fragment_plan, max_payload_len, payload_per_frame};
pub use discovery::PeerDiscovery;
pub use error::{Error, Result};
pub use header::{Header, decode_header, encode_header};
pub use metrics::MetricsSnapshot;
pub use types::{Address, Capabilities, MessageType, UNASSIGNED};

/// Protocol version carried in every header and discovery payload
pub const PROTOCOL_VERSION: u8 = 1;

/// Header size in bytes
pub const HEADER_SIZE: usize = 8;

/// Discovery payload size in bytes
pub const DISCOVERY_PAYLOAD_SIZE: usize = 9;

/// Maximum fragments per message (7-bit `split_part`)
pub const MAX_FRAGMENTS: usize = 128;
