// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnection scheduling with bounded exponential backoff.
//!
//! After each unexpected closure the attempt counter is incremented and the
//! next delay is `min(initial * 2^(attempt - 1), max)`. Once the counter
//! reaches the attempt limit the scheduler reports exhaustion instead. The
//! counter resets on every successful open.

use std::time::Duration;

/// Exponential backoff bounded by a cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Backoff { initial, max }
    }

    /// Delay before the given 1-based attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor).min(self.max)
    }
}

/// What to do after an unexpected closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Call `connect()` again after `delay`.
    Retry { attempt: u32, delay: Duration },
    /// The attempt limit was reached; stop retrying.
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct ReconnectScheduler {
    backoff: Backoff,
    max_attempts: u32,
    attempts: u32,
}

impl ReconnectScheduler {
    /// `max_attempts` of 0 retries forever.
    pub fn new(backoff: Backoff, max_attempts: u32) -> Self {
        ReconnectScheduler {
            backoff,
            max_attempts,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decide the next step, consuming an attempt when retrying.
    pub fn next(&mut self) -> ReconnectDecision {
        if self.max_attempts > 0 && self.attempts >= self.max_attempts {
            return ReconnectDecision::Exhausted {
                attempts: self.attempts,
            };
        }
        self.attempts = self.attempts.saturating_add(1);
        ReconnectDecision::Retry {
            attempt: self.attempts,
            delay: self.backoff.delay_for(self.attempts),
        }
    }

    /// Reset after a successful open.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

#[cfg(test)]
#[path = "reconnect_tests.rs"]
mod tests;
