//! Event publisher built on the mesh engine.
//!
//! A publisher announces [`Capabilities::PUBLISH_EVENTS`]. Nodes that want its
//! events send it a [`SUBSCRIBE`] message; each call to
//! [`Publisher::publish`] then unicasts a one-byte [`EVENT`] message to every
//! subscriber still present in the peer table.

use std::collections::BTreeSet;

use bytes::Bytes;
use tracing::debug;

use super::{Clock, DroppedMessage, MeshEngine, MeshHandler, Peer, SystemClock};
use crate::protocol::{Address, Capabilities, Header, MessageType, Result};
use crate::transport::Transport;

/// Event published to subscribers; payload is one byte.
pub const EVENT: MessageType = MessageType::USER;

/// Request to receive a publisher's events; empty payload.
pub const SUBSCRIBE: MessageType = MessageType(MessageType::USER.0 + 1);

/// Mesh node that fans events out to its subscribers.
#[derive(Debug)]
pub struct Publisher<T, C = SystemClock> {
    engine: MeshEngine<T, C>,
    subscribers: BTreeSet<Address>,
}

impl<T: Transport, C: Clock> Publisher<T, C> {
    /// Wrap an engine, adding the publish capability to its announcements.
    #[must_use]
    pub fn new(mut engine: MeshEngine<T, C>) -> Self {
        let capabilities = engine
            .application_capabilities()
            .with(Capabilities::PUBLISH_EVENTS);
        engine.set_application_capabilities(capabilities);
        Self {
            engine,
            subscribers: BTreeSet::new(),
        }
    }

    /// Run the engine, consuming subscribe requests and forwarding every
    /// other event to `handler`.
    pub fn update<H: MeshHandler + ?Sized>(&mut self, handler: &mut H) {
        let mut intercept = Intercept {
            subscribers: &mut self.subscribers,
            inner: handler,
        };
        self.engine.update(&mut intercept);
    }

    /// Send `event` to every subscriber. Returns how many were addressed.
    pub fn publish(&mut self, event: u8) -> Result<usize> {
        for &subscriber in &self.subscribers {
            self.engine.send_message(subscriber, EVENT, &[event], false)?;
        }
        Ok(self.subscribers.len())
    }

    /// Current subscribers.
    pub fn subscribers(&self) -> impl Iterator<Item = Address> + '_ {
        self.subscribers.iter().copied()
    }

    /// Wrapped engine.
    #[must_use]
    pub const fn engine(&self) -> &MeshEngine<T, C> {
        &self.engine
    }

    /// Wrapped engine, mutably.
    pub fn engine_mut(&mut self) -> &mut MeshEngine<T, C> {
        &mut self.engine
    }
}

/// Ask `publisher` to send its events to this node.
pub fn subscribe<T: Transport, C: Clock>(
    engine: &mut MeshEngine<T, C>,
    publisher: Address,
) -> Result<()> {
    engine.send_message(publisher, SUBSCRIBE, &[], false)
}

struct Intercept<'a, H: ?Sized> {
    subscribers: &'a mut BTreeSet<Address>,
    inner: &'a mut H,
}

impl<H: MeshHandler + ?Sized> MeshHandler for Intercept<'_, H> {
    fn on_message(&mut self, header: &Header, payload: &Bytes) {
        if header.message_type() == SUBSCRIBE {
            let from = header.address_from();
            if self.subscribers.insert(from) {
                debug!(subscriber = from, "new subscriber");
            }
            return;
        }
        self.inner.on_message(header, payload);
    }

    fn on_new_peer(&mut self, peer: &Peer) {
        self.inner.on_new_peer(peer);
    }

    fn on_lost_peer(&mut self, peer: &Peer) {
        if self.subscribers.remove(&peer.address()) {
            debug!(subscriber = peer.address(), "subscriber lost");
        }
        self.inner.on_lost_peer(peer);
    }

    fn on_message_dropped(&mut self, message: &DroppedMessage) {
        self.inner.on_message_dropped(message);
    }
}
