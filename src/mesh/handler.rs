//! Application-facing event interface.

use bytes::Bytes;

use super::{DroppedMessage, Peer};
use crate::protocol::Header;

/// Receives events produced during [`MeshEngine::update`](super::MeshEngine::update).
///
/// Arguments are borrowed for the duration of the call only.
pub trait MeshHandler {
    /// A complete application message arrived.
    fn on_message(&mut self, header: &Header, payload: &Bytes);

    /// A node was heard for the first time.
    fn on_new_peer(&mut self, _peer: &Peer) {}

    /// A node stopped announcing itself and was removed.
    fn on_lost_peer(&mut self, _peer: &Peer) {}

    /// A partial message was abandoned. Diagnostic only.
    fn on_message_dropped(&mut self, _message: &DroppedMessage) {}
}

/// Owned copy of one handler callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshEvent {
    /// See [`MeshHandler::on_message`].
    Message {
        /// Header of the reassembled message.
        header: Header,
        /// Reassembled payload.
        payload: Bytes,
    },
    /// See [`MeshHandler::on_new_peer`].
    NewPeer(Peer),
    /// See [`MeshHandler::on_lost_peer`].
    LostPeer(Peer),
    /// See [`MeshHandler::on_message_dropped`].
    MessageDropped(DroppedMessage),
}

/// Queue-style consumption: every callback is appended in order.
impl MeshHandler for Vec<MeshEvent> {
    fn on_message(&mut self, header: &Header, payload: &Bytes) {
        self.push(MeshEvent::Message {
            header: *header,
            payload: payload.clone(),
        });
    }

    fn on_new_peer(&mut self, peer: &Peer) {
        self.push(MeshEvent::NewPeer(peer.clone()));
    }

    fn on_lost_peer(&mut self, peer: &Peer) {
        self.push(MeshEvent::LostPeer(peer.clone()));
    }

    fn on_message_dropped(&mut self, message: &DroppedMessage) {
        self.push(MeshEvent::MessageDropped(message.clone()));
    }
}
