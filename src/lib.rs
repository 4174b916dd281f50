//! rfmesh - single-hop mesh protocol for short-range packet radios
//!
//! Nodes on one broadcast domain pick a collision-free address, announce
//! themselves periodically, track which peers are still alive, and exchange
//! application messages larger than a radio frame by splitting them into
//! fragments that the receiver reassembles.
//!
//! # Quick Start
//!
//! ```rust
//! use rfmesh::{MeshConfig, MeshEngine, MeshEvent, MessageType, RadioMedium};
//!
//! let medium = RadioMedium::default();
//! let mut node = MeshEngine::new(medium.attach(), MeshConfig::default())?;
//! node.begin()?;
//!
//! let mut events: Vec<MeshEvent> = Vec::new();
//! node.update(&mut events);
//! assert!(node.is_ready());
//!
//! node.send_message(rfmesh::DISCOVERY_GROUP, MessageType::USER, b"hello, mesh", true)?;
//! # Ok::<(), rfmesh::Error>(())
//! ```
//!
//! # Features
//!
//! - **Fixed 8-byte header** - version, TTL, message id, fragment index, type, sender
//! - **Fragmentation** - up to 128 fragments per message
//! - **Peer liveness** - tick-based timeouts driven by a cooperative `update` loop
//! - **Pluggable radio** - anything implementing [`Transport`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod mesh;
pub mod protocol;
pub mod transport;

pub use mesh::{
    DISCOVERY_GROUP, MeshConfig, MeshEngine, MeshEvent, MeshHandler, Peer, PeerTable, Publisher,
    ReassemblyStore,
};
pub use protocol::{
    Address, Capabilities, Error, HEADER_SIZE, Header, MessageType, PROTOCOL_VERSION, Result,
};
pub use transport::{Destination, MemoryTransport, RadioMedium, Transport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
