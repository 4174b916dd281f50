//! Mesh node: peer table, reassembly and the polling engine.

mod clock;
mod config;
mod engine;
mod handler;
mod peers;
pub mod publisher;
mod reassembly;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DISCOVERY_GROUP, MeshConfig};
pub use engine::{MAX_ADDRESS, MeshEngine, NodeState};
pub use handler::{MeshEvent, MeshHandler};
pub use peers::{Peer, PeerTable};
pub use publisher::Publisher;
pub use reassembly::{CompletedMessage, DroppedMessage, Reassembly, ReassemblyStore};
