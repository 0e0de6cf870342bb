// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellable deadlines owned by the connection task.
//!
//! Every timer the connection uses lives in one [`Timers`] value. A timer is
//! a deadline polled by the connection loop rather than a detached callback,
//! so once it is cancelled it cannot fire. [`Timers::cancel_all`] clears
//! every outstanding timer in one step.

use std::future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{sleep, Sleep};

/// The timers used by the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Next heartbeat probe.
    HeartbeatProbe,
    /// Deadline for the pong answering the outstanding probe.
    HeartbeatTimeout,
    /// Delay before the next reconnect attempt.
    Reconnect,
}

/// A single-shot deadline slot.
#[derive(Debug, Default)]
struct Deadline {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl Deadline {
    fn arm(&mut self, after: Duration) {
        self.sleep = Some(Box::pin(sleep(after)));
    }

    fn cancel(&mut self) {
        self.sleep = None;
    }

    #[cfg(test)]
    fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    #[cfg(test)]
    fn deadline(&self) -> Option<tokio::time::Instant> {
        self.sleep.as_ref().map(|s| s.deadline())
    }

    /// Resolves when the deadline passes; never resolves while disarmed.
    async fn elapsed(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => sleep.as_mut().await,
            None => future::pending().await,
        }
    }
}

/// The set of connection timers.
#[derive(Debug, Default)]
pub struct Timers {
    probe: Deadline,
    timeout: Deadline,
    reconnect: Deadline,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: TimerKind) -> &mut Deadline {
        match kind {
            TimerKind::HeartbeatProbe => &mut self.probe,
            TimerKind::HeartbeatTimeout => &mut self.timeout,
            TimerKind::Reconnect => &mut self.reconnect,
        }
    }

    /// Arm `kind` to fire once after `after`, replacing any earlier deadline.
    pub fn arm(&mut self, kind: TimerKind, after: Duration) {
        self.slot(kind).arm(after);
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.slot(kind).cancel();
    }

    /// Cancel every outstanding timer.
    pub fn cancel_all(&mut self) {
        self.probe.cancel();
        self.timeout.cancel();
        self.reconnect.cancel();
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&mut self, kind: TimerKind) -> bool {
        self.slot(kind).is_armed()
    }

    /// Number of armed timers.
    #[cfg(test)]
    pub(crate) fn armed(&self) -> usize {
        [&self.probe, &self.timeout, &self.reconnect]
            .iter()
            .filter(|d| d.is_armed())
            .count()
    }

    /// When `kind` is due, if armed.
    #[cfg(test)]
    pub(crate) fn deadline(&mut self, kind: TimerKind) -> Option<tokio::time::Instant> {
        self.slot(kind).deadline()
    }

    /// Wait for the next armed timer to fire and disarm it.
    ///
    /// Pending forever while nothing is armed. Cancel safe: dropping the
    /// future leaves every deadline in place.
    pub async fn expired(&mut self) -> TimerKind {
        let kind = tokio::select! {
            _ = self.probe.elapsed() => TimerKind::HeartbeatProbe,
            _ = self.timeout.elapsed() => TimerKind::HeartbeatTimeout,
            _ = self.reconnect.elapsed() => TimerKind::Reconnect,
        };
        self.slot(kind).cancel();
        kind
    }
}

#[cfg(test)]
#[path = "timers_tests.rs"]
mod tests;
