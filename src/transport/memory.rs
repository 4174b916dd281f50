//! In-memory shared radio medium.
//!
//! Every [`MemoryTransport`] attached to the same [`RadioMedium`] hears the
//! others the way radios in one broadcast domain would: unicast frames reach
//! whichever node listens on the addressed pipe and fail when nobody does,
//! broadcast frames reach every node that opened the group and never fail.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::trace;

use super::{Destination, Transport, TransportError};
use crate::protocol::Address;

/// Frame size of a typical 2.4 GHz packet radio.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 32;

/// Sent frames each radio keeps for inspection; older entries are discarded.
pub const SENT_LOG_CAPACITY: usize = 256;

/// Shared broadcast domain for in-memory transports.
#[derive(Clone, Debug)]
pub struct RadioMedium {
    inner: Arc<Mutex<MediumInner>>,
}

#[derive(Debug)]
struct MediumInner {
    max_frame_size: usize,
    radios: Vec<RadioState>,
}

#[derive(Debug, Default)]
struct RadioState {
    unicast: Option<Address>,
    groups: HashSet<u32>,
    inbox: VecDeque<Bytes>,
    sent: VecDeque<(Destination, Bytes)>,
    attempts: usize,
    fail_budget: usize,
}

impl RadioMedium {
    /// Create a medium whose radios accept frames up to `max_frame_size` bytes.
    #[must_use]
    pub fn new(max_frame_size: usize) -> Self {
        assert!(max_frame_size > 0, "max_frame_size must be positive");

        Self {
            inner: Arc::new(Mutex::new(MediumInner {
                max_frame_size,
                radios: Vec::new(),
            })),
        }
    }

    /// Attach a new radio to the medium.
    #[must_use]
    pub fn attach(&self) -> MemoryTransport {
        let mut guard = lock(&self.inner);
        guard.radios.push(RadioState::default());
        MemoryTransport {
            medium: Arc::clone(&self.inner),
            id: guard.radios.len() - 1,
            max_frame_size: guard.max_frame_size,
        }
    }

    /// Number of radios attached.
    #[must_use]
    pub fn radios(&self) -> usize {
        lock(&self.inner).radios.len()
    }
}

impl Default for RadioMedium {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

/// One radio on a [`RadioMedium`].
#[derive(Debug)]
pub struct MemoryTransport {
    medium: Arc<Mutex<MediumInner>>,
    id: usize,
    max_frame_size: usize,
}

impl MemoryTransport {
    /// Make the next `count` send attempts fail.
    pub fn fail_next_sends(&self, count: usize) {
        self.with_state(|state| state.fail_budget = count);
    }

    /// Queue a raw frame as if it had been received over the air.
    pub fn inject(&self, frame: impl Into<Bytes>) {
        let frame = frame.into();
        self.with_state(|state| state.inbox.push_back(frame));
    }

    /// The last [`SENT_LOG_CAPACITY`] frames this radio put on air, oldest
    /// first.
    #[must_use]
    pub fn sent_frames(&self) -> Vec<(Destination, Bytes)> {
        self.with_state(|state| state.sent.iter().cloned().collect())
    }

    /// Send attempts made, successful or not.
    #[must_use]
    pub fn send_attempts(&self) -> usize {
        self.with_state(|state| state.attempts)
    }

    /// Unicast pipe this radio listens on.
    #[must_use]
    pub fn unicast_address(&self) -> Option<Address> {
        self.with_state(|state| state.unicast)
    }

    /// Frames waiting to be read.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.with_state(|state| state.inbox.len())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut RadioState) -> R) -> R {
        let mut guard = lock(&self.medium);
        f(&mut guard.radios[self.id])
    }
}

impl Transport for MemoryTransport {
    fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    fn configure_unicast_address(&mut self, address: Address) -> Result<(), TransportError> {
        self.with_state(|state| state.unicast = Some(address));
        Ok(())
    }

    fn open_broadcast_group(&mut self, group: u32) -> Result<(), TransportError> {
        self.with_state(|state| {
            state.groups.insert(group);
        });
        Ok(())
    }

    fn send_frame(&mut self, dest: Destination, frame: &[u8]) -> Result<(), TransportError> {
        if frame.len() > self.max_frame_size {
            return Err(TransportError::FrameTooLarge {
                len: frame.len(),
                max: self.max_frame_size,
            });
        }

        let mut guard = lock(&self.medium);
        let sender = &mut guard.radios[self.id];
        sender.attempts += 1;
        if sender.fail_budget > 0 {
            sender.fail_budget -= 1;
            return Err(TransportError::WriteFailed { dest });
        }

        let frame = Bytes::copy_from_slice(frame);
        let mut delivered = 0;
        for (id, radio) in guard.radios.iter_mut().enumerate() {
            if id == self.id {
                continue;
            }
            let listening = match dest {
                Destination::Unicast(addr) => radio.unicast == Some(addr),
                Destination::Broadcast(group) => radio.groups.contains(&group),
            };
            if listening {
                radio.inbox.push_back(frame.clone());
                delivered += 1;
            }
        }
        trace!(radio = self.id, %dest, len = frame.len(), delivered, "frame on air");

        if delivered == 0 && !dest.is_broadcast() {
            return Err(TransportError::WriteFailed { dest });
        }
        let sent = &mut guard.radios[self.id].sent;
        if sent.len() == SENT_LOG_CAPACITY {
            sent.pop_front();
        }
        sent.push_back((dest, frame));
        Ok(())
    }

    fn frame_available(&mut self) -> bool {
        self.with_state(|state| !state.inbox.is_empty())
    }

    fn read_frame(&mut self) -> Option<Bytes> {
        self.with_state(|state| state.inbox.pop_front())
    }
}

fn lock(inner: &Mutex<MediumInner>) -> MutexGuard<'_, MediumInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}
