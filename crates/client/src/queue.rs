// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound queue for messages submitted while disconnected.
//!
//! Messages are flushed head-to-tail once a connection opens. A message is
//! removed only after it was handed to the transport, so a failed write
//! leaves it and everything behind it queued in the original order.

use std::collections::VecDeque;
use std::time::Duration;

use pulse_core::Envelope;
use tokio::time::Instant;
use tracing::warn;

/// An envelope waiting for a connection.
#[derive(Debug, Clone)]
pub struct PendingMessage {
    envelope: Envelope,
    enqueued_at: Instant,
}

impl PendingMessage {
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }
}

/// FIFO queue of pending outbound envelopes.
///
/// Unbounded and non-expiring unless limits are configured.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    pending: VecDeque<PendingMessage>,
    capacity: Option<usize>,
    max_age: Option<Duration>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue that holds at most `capacity` messages (dropping the
    /// oldest on overflow) and discards messages older than `max_age` at
    /// flush time.
    pub fn with_limits(capacity: Option<usize>, max_age: Option<Duration>) -> Self {
        OutboundQueue {
            pending: VecDeque::new(),
            capacity,
            max_age,
        }
    }

    /// Append an envelope to the tail.
    ///
    /// Returns the evicted head when the queue was at capacity.
    pub fn enqueue(&mut self, envelope: Envelope) -> Option<Envelope> {
        let evicted = match self.capacity {
            Some(capacity) if self.pending.len() >= capacity => {
                self.pending.pop_front().map(|m| m.envelope)
            }
            _ => None,
        };
        self.pending.push_back(PendingMessage {
            envelope,
            enqueued_at: Instant::now(),
        });
        evicted
    }

    /// Put envelopes that were handed to a transport but never written back
    /// at the head, in their original order.
    ///
    /// Returns how many were evicted to stay within capacity.
    pub fn requeue_front(&mut self, envelopes: Vec<Envelope>) -> usize {
        let now = Instant::now();
        for envelope in envelopes.into_iter().rev() {
            self.pending.push_front(PendingMessage {
                envelope,
                enqueued_at: now,
            });
        }
        let mut evicted = 0;
        if let Some(capacity) = self.capacity {
            while self.pending.len() > capacity {
                self.pending.pop_front();
                evicted += 1;
            }
        }
        evicted
    }

    /// Drain the queue head-to-tail through `send`.
    ///
    /// Stops at the first failed send, leaving that message at the head.
    /// Returns the number of messages sent.
    pub fn flush<F, E>(&mut self, mut send: F) -> Result<usize, E>
    where
        F: FnMut(&Envelope) -> Result<(), E>,
    {
        self.discard_expired();

        let mut sent = 0;
        while let Some(head) = self.pending.front() {
            send(&head.envelope)?;
            self.pending.pop_front();
            sent += 1;
        }
        Ok(sent)
    }

    /// Discard every pending message without sending. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Read all queued envelopes without removing them.
    #[cfg(test)]
    pub(crate) fn peek_all(&self) -> Vec<Envelope> {
        self.pending.iter().map(|m| m.envelope.clone()).collect()
    }

    fn discard_expired(&mut self) {
        let Some(max_age) = self.max_age else {
            return;
        };
        let now = Instant::now();
        let before = self.pending.len();
        self.pending
            .retain(|m| now.saturating_duration_since(m.enqueued_at) <= max_age);
        let expired = before - self.pending.len();
        if expired > 0 {
            let max_age_ms = u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX);
            warn!(expired, max_age_ms, "discarded stale outbound messages");
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
