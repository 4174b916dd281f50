//! Per-engine traffic counters

use super::MessageType;

/// Direction of frame flow for counting.
#[derive(Clone, Copy, Debug)]
pub(crate) enum FrameDirection {
    Sent,
    Received,
}

/// Counters owned by a single engine.
#[derive(Debug, Default, Clone)]
pub(crate) struct Metrics {
    snapshot: MetricsSnapshot,
}

impl Metrics {
    #[inline]
    pub(crate) fn record_frame(&mut self, direction: FrameDirection) {
        match direction {
            FrameDirection::Sent => self.snapshot.frames_sent += 1,
            FrameDirection::Received => self.snapshot.frames_received += 1,
        }
    }

    #[inline]
    pub(crate) fn record_send_failure(&mut self) {
        self.snapshot.send_failures += 1;
    }

    #[inline]
    pub(crate) fn record_retry(&mut self) {
        self.snapshot.send_retries += 1;
    }

    #[inline]
    pub(crate) fn record_malformed(&mut self) {
        self.snapshot.malformed_frames += 1;
    }

    #[inline]
    pub(crate) fn record_delivered(&mut self, msg_type: MessageType) {
        if msg_type.is_internal() {
            self.snapshot.discovery_received += 1;
        } else {
            self.snapshot.messages_delivered += 1;
        }
    }

    #[inline]
    pub(crate) fn record_reassembly_timeout(&mut self) {
        self.snapshot.reassembly_timeouts += 1;
    }

    #[inline]
    pub(crate) fn record_reassembly_rejected(&mut self) {
        self.snapshot.reassembly_rejected += 1;
    }

    #[inline]
    pub(crate) fn record_peer_joined(&mut self) {
        self.snapshot.peers_joined += 1;
    }

    #[inline]
    pub(crate) fn record_peer_lost(&mut self) {
        self.snapshot.peers_lost += 1;
    }

    #[inline]
    pub(crate) fn totals(&self) -> MetricsSnapshot {
        self.snapshot
    }
}

/// Lightweight snapshot of an engine's counters.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Frames written successfully
    pub frames_sent: u64,
    /// Frames read from the transport
    pub frames_received: u64,
    /// Frames abandoned after the retry budget
    pub send_failures: u64,
    /// Unicast retries performed
    pub send_retries: u64,
    /// Frames dropped for length or version
    pub malformed_frames: u64,
    /// Application messages handed to the handler
    pub messages_delivered: u64,
    /// Discovery messages fully received
    pub discovery_received: u64,
    /// Partial messages evicted by age
    pub reassembly_timeouts: u64,
    /// Partial messages dropped for exceeding the size limit
    pub reassembly_rejected: u64,
    /// Peers added to the table
    pub peers_joined: u64,
    /// Peers evicted from the table
    pub peers_lost: u64,
}

impl MetricsSnapshot {
    /// Fraction of attempted frames that were abandoned.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn send_failure_ratio(&self) -> Option<f64> {
        let attempted = self.frames_sent + self.send_failures;
        if attempted == 0 {
            return None;
        }
        Some(self.send_failures as f64 / attempted as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut metrics = Metrics::default();
        metrics.record_frame(FrameDirection::Sent);
        metrics.record_frame(FrameDirection::Sent);
        metrics.record_frame(FrameDirection::Sent);
        metrics.record_send_failure();
        metrics.record_delivered(MessageType::PEER_DISCOVERY);
        metrics.record_delivered(MessageType::USER);

        let totals = metrics.totals();
        assert_eq!(totals.frames_sent, 3);
        assert_eq!(totals.discovery_received, 1);
        assert_eq!(totals.messages_delivered, 1);
        assert_eq!(totals.send_failure_ratio(), Some(0.25));
    }

    #[test]
    fn test_ratio_without_traffic() {
        assert_eq!(MetricsSnapshot::default().send_failure_ratio(), None);
    }
}
