// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection lifecycle state and the lock-free snapshot read by handles.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use serde::Serialize;

/// Lifecycle of the realtime connection. Exactly one value is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Never connected.
    Idle,
    /// Handshake in flight.
    Connecting,
    /// Handshake complete, heartbeats active.
    Open,
    /// Deliberate shutdown requested by the owner.
    Closing,
    /// Socket closed, deliberately or due to failure.
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        }
    }

    /// Returns true while a transport is being established or is established.
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }

    fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Idle => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Open => 2,
            ConnectionState::Closing => 3,
            ConnectionState::Closed => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Open,
            3 => ConnectionState::Closing,
            4 => ConnectionState::Closed,
            _ => ConnectionState::Idle,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection status visible to both the connection task and its handles.
///
/// The connection task owns every write except [`SharedState::begin_close`].
/// Handles read without locking.
#[derive(Debug)]
pub(crate) struct SharedState {
    state: AtomicU8,
    attempts: AtomicU32,
    online: AtomicBool,
}

impl SharedState {
    pub(crate) fn new(online: bool) -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Idle.to_u8()),
            attempts: AtomicU32::new(0),
            online: AtomicBool::new(online),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.state.store(state.to_u8(), Ordering::Release);
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    pub(crate) fn set_attempts(&self, attempts: u32) {
        self.attempts.store(attempts, Ordering::Release);
    }

    /// Move a connecting or open connection to `Closing` on behalf of a
    /// handle, before the connection task sees the request.
    pub(crate) fn begin_close(&self) {
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                ConnectionState::from_u8(current)
                    .is_active()
                    .then_some(ConnectionState::Closing.to_u8())
            });
    }

    pub(crate) fn online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
