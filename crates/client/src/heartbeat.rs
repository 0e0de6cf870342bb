// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat monitor for detecting half-open connections.
//!
//! While the connection is open a `ping` envelope is sent every interval and
//! a timeout is armed. The matching `pong` cancels the timeout; if the
//! timeout fires first the connection is declared dead. At most one probe is
//! outstanding at a time.

use std::time::Duration;

use pulse_core::Envelope;

use crate::timers::{TimerKind, Timers};

#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    interval: Duration,
    timeout: Duration,
    outstanding: bool,
}

impl HeartbeatMonitor {
    /// A zero `interval` disables probing.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        HeartbeatMonitor {
            interval,
            timeout,
            outstanding: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// True while a probe awaits its pong.
    #[cfg(test)]
    pub(crate) fn awaiting_pong(&self) -> bool {
        self.outstanding
    }

    /// Arm the repeating probe. Any previous cycle is discarded first.
    pub fn start(&mut self, timers: &mut Timers) {
        self.stop(timers);
        if self.is_enabled() {
            timers.arm(TimerKind::HeartbeatProbe, self.interval);
        }
    }

    /// Clear both the probe and any outstanding timeout.
    pub fn stop(&mut self, timers: &mut Timers) {
        timers.cancel(TimerKind::HeartbeatProbe);
        timers.cancel(TimerKind::HeartbeatTimeout);
        self.outstanding = false;
    }

    /// Handle a due probe. Re-arms the next probe and returns the `ping` to
    /// send, or `None` when the connection is not open or a probe is
    /// already outstanding.
    pub fn on_probe_due(&mut self, open: bool, timers: &mut Timers) -> Option<Envelope> {
        if self.is_enabled() {
            timers.arm(TimerKind::HeartbeatProbe, self.interval);
        }
        if !open || self.outstanding {
            return None;
        }
        self.outstanding = true;
        timers.arm(TimerKind::HeartbeatTimeout, self.timeout);
        Some(Envelope::ping())
    }

    /// Handle an inbound `pong`. Returns true if it answered an outstanding
    /// probe.
    pub fn on_pong(&mut self, timers: &mut Timers) -> bool {
        timers.cancel(TimerKind::HeartbeatTimeout);
        std::mem::replace(&mut self.outstanding, false)
    }

    /// Handle the timeout firing. Returns true when the connection must be
    /// treated as dead.
    pub fn on_timeout(&mut self) -> bool {
        std::mem::replace(&mut self.outstanding, false)
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
