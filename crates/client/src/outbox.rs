// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The outbound path shared by handles and the connection task.
//!
//! While a connection is open the outbox holds the live session's writer and
//! handles write through it directly, so `send` reports what actually
//! happened to the envelope. Otherwise envelopes land in the queue. Flushing
//! the queue and attaching the writer happen under one lock, so nothing
//! submitted during a flush can overtake queued envelopes.

use std::sync::{Mutex, MutexGuard};

use pulse_core::Envelope;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::queue::OutboundQueue;

/// Sending half of a session's outgoing channel.
pub(crate) type Writer = mpsc::UnboundedSender<Envelope>;

#[derive(Debug)]
struct Slot {
    queue: OutboundQueue,
    writer: Option<Writer>,
    /// Close requests made by handles that the connection task has not
    /// processed yet. No writer is attached while any are outstanding.
    holds: u32,
}

impl Slot {
    fn enqueue(&mut self, envelope: Envelope) {
        if let Some(evicted) = self.queue.enqueue(envelope) {
            warn!(kind = evicted.kind(), "outbound queue full, dropped oldest message");
        }
        trace!(queued = self.queue.len(), "envelope queued");
    }
}

#[derive(Debug)]
pub(crate) struct Outbox {
    slot: Mutex<Slot>,
}

impl Outbox {
    pub(crate) fn new(queue: OutboundQueue) -> Self {
        Outbox {
            slot: Mutex::new(Slot {
                queue,
                writer: None,
                holds: 0,
            }),
        }
    }

    // The lock is never held across a call that can panic.
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write through the live writer, or queue for the next open.
    ///
    /// Returns true only when the envelope went to an open connection.
    pub(crate) fn send(&self, envelope: Envelope) -> bool {
        let mut slot = self.slot();
        let envelope = match slot.writer.take() {
            Some(writer) => match writer.send(envelope) {
                Ok(()) => {
                    slot.writer = Some(writer);
                    return true;
                }
                Err(mpsc::error::SendError(envelope)) => envelope,
            },
            None => envelope,
        };
        slot.enqueue(envelope);
        false
    }

    /// Flush the queue into `writer`, then route handle writes through it
    /// unless a close request is outstanding.
    ///
    /// Returns the number of queued envelopes written.
    pub(crate) fn attach(&self, writer: Writer) -> Result<usize> {
        let mut slot = self.slot();
        let flushed = slot
            .queue
            .flush(|envelope| writer.send(envelope.clone()).map_err(|_| Error::ChannelClosed))?;
        if slot.holds == 0 {
            slot.writer = Some(writer);
        }
        Ok(flushed)
    }

    /// Stop routing handle writes to the current session.
    pub(crate) fn detach(&self) {
        self.slot().writer = None;
    }

    /// A handle requested a close: detach now, ahead of the connection task.
    pub(crate) fn hold(&self) {
        let mut slot = self.slot();
        slot.writer = None;
        slot.holds = slot.holds.saturating_add(1);
    }

    /// The connection task processed one close request.
    pub(crate) fn release(&self) {
        let mut slot = self.slot();
        slot.holds = slot.holds.saturating_sub(1);
    }

    /// Put envelopes a session never wrote back at the head of the queue.
    pub(crate) fn requeue(&self, envelopes: Vec<Envelope>) {
        let count = envelopes.len();
        let evicted = self.slot().queue.requeue_front(envelopes);
        if evicted > 0 {
            warn!(evicted, "outbound queue full, dropped oldest messages");
        }
        trace!(count, "requeued unwritten envelopes");
    }

    /// Discard queued envelopes. Returns how many were dropped.
    pub(crate) fn clear(&self) -> usize {
        self.slot().queue.clear()
    }

    pub(crate) fn len(&self) -> usize {
        self.slot().queue.len()
    }

    /// True while handle writes go straight to an open connection.
    pub(crate) fn is_writable(&self) -> bool {
        self.slot()
            .writer
            .as_ref()
            .is_some_and(|writer| !writer.is_closed())
    }
}

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;
