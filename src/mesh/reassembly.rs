//! Reassembly of fragmented messages.
//!
//! Fragments are placed at `split_part * payload_per_frame` in a buffer keyed
//! by `(address_from, message_id)`. A message is complete once its terminal
//! fragment has been seen and the number of fragments received exceeds the
//! final index that fragment declares.
//!
//! # Limitations
//!
//! Completion counts fragments; it does not track which indices arrived. A
//! duplicated fragment counts twice, so a message that lost a fragment but
//! received another one twice is reported complete with a zero-filled gap.
//! A unicast retry whose first attempt was heard but not acknowledged
//! produces exactly such a duplicate.

use std::collections::HashMap;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::protocol::{Address, Header};

/// A fully reassembled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedMessage {
    header: Header,
    payload: Bytes,
}

impl CompletedMessage {
    /// Header of the first fragment seen, marked terminal
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Assembled payload
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Split into header and payload
    #[must_use]
    pub fn into_parts(self) -> (Header, Bytes) {
        (self.header, self.payload)
    }
}

/// A partial message abandoned before completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedMessage {
    header: Header,
    bytes_received: usize,
    fragments_received: u16,
}

impl DroppedMessage {
    /// Header of the first fragment seen
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Highest byte offset written before the drop
    #[must_use]
    pub const fn bytes_received(&self) -> usize {
        self.bytes_received
    }

    /// Fragments received before the drop
    #[must_use]
    pub const fn fragments_received(&self) -> u16 {
        self.fragments_received
    }
}

/// Result of feeding one fragment to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reassembly {
    /// The message is complete and has left the store.
    Complete(CompletedMessage),
    /// More fragments are needed.
    Pending,
    /// The fragment would grow the message past the size limit; the partial
    /// message has been discarded.
    Rejected(DroppedMessage),
}

#[derive(Debug)]
struct PartialMessage {
    header: Header,
    data: Vec<u8>,
    blocks_received: u16,
    age: u16,
}

impl PartialMessage {
    fn new(header: Header) -> Self {
        Self {
            header,
            data: Vec::new(),
            blocks_received: 0,
            age: 0,
        }
    }

    fn add_part(&mut self, start: usize, payload: &[u8], split_part: u8, split_more: bool) {
        let end = start + payload.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(payload);
        self.blocks_received = self.blocks_received.saturating_add(1);
        self.age = 0;
        if !split_more {
            self.header.set_terminal(split_part);
        }
    }

    fn is_done(&self) -> bool {
        !self.header.split_more() && self.blocks_received > u16::from(self.header.split_part())
    }

    fn into_dropped(self) -> DroppedMessage {
        DroppedMessage {
            header: self.header,
            bytes_received: self.data.len(),
            fragments_received: self.blocks_received,
        }
    }
}

/// In-flight messages keyed by sender and message id.
#[derive(Debug)]
pub struct ReassemblyStore {
    payload_per_frame: usize,
    max_message_size: usize,
    messages: HashMap<(Address, u8), PartialMessage>,
}

impl ReassemblyStore {
    /// Create a store for fragments carrying up to `payload_per_frame` bytes,
    /// refusing to assemble messages larger than `max_message_size`.
    #[must_use]
    pub fn new(payload_per_frame: usize, max_message_size: usize) -> Self {
        assert!(payload_per_frame > 0, "payload_per_frame must be positive");

        Self {
            payload_per_frame,
            max_message_size,
            messages: HashMap::new(),
        }
    }

    /// Feed one fragment.
    ///
    /// A completed message leaves the store; a later fragment with the same
    /// sender and id starts a new message.
    pub fn accept_fragment(&mut self, header: &Header, payload: &[u8]) -> Reassembly {
        let key = (header.address_from(), header.message_id());
        let start = usize::from(header.split_part()) * self.payload_per_frame;
        let end = start + payload.len();

        if end > self.max_message_size {
            let dropped = self
                .messages
                .remove(&key)
                .unwrap_or_else(|| PartialMessage::new(*header))
                .into_dropped();
            debug!(
                from = header.address_from(),
                msg_id = header.message_id(),
                end,
                max = self.max_message_size,
                "fragment exceeds message size limit; discarding"
            );
            return Reassembly::Rejected(dropped);
        }

        let message = self
            .messages
            .entry(key)
            .or_insert_with(|| PartialMessage::new(*header));
        message.add_part(start, payload, header.split_part(), header.split_more());
        trace!(
            from = header.address_from(),
            msg_id = header.message_id(),
            split_part = header.split_part(),
            split_more = header.split_more(),
            blocks = message.blocks_received,
            "fragment added"
        );

        if !message.is_done() {
            return Reassembly::Pending;
        }

        match self.messages.remove(&key) {
            Some(message) => Reassembly::Complete(CompletedMessage {
                header: message.header,
                payload: Bytes::from(message.data),
            }),
            None => Reassembly::Pending,
        }
    }

    /// Age every partial message by one tick and drop those whose age
    /// reaches `timeout_ticks`. Dropped messages are ordered by key.
    pub fn tick_and_evict(&mut self, timeout_ticks: u16) -> Vec<DroppedMessage> {
        let mut expired = Vec::new();
        for (key, message) in &mut self.messages {
            message.age = message.age.saturating_add(1);
            if message.age >= timeout_ticks {
                expired.push(*key);
            }
        }
        expired.sort_unstable();

        expired
            .into_iter()
            .filter_map(|key| self.messages.remove(&key))
            .map(PartialMessage::into_dropped)
            .collect()
    }

    /// Number of messages being assembled.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing is being assembled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Payload bytes carried by each fragment.
    #[must_use]
    pub const fn payload_per_frame(&self) -> usize {
        self.payload_per_frame
    }
}
