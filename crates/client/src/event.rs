// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Events published on the hub.
//!
//! Lifecycle events use the fixed names below. Every inbound envelope is
//! published twice: under its own `type` and under [`MESSAGE`].

use std::fmt;

use pulse_core::Envelope;

pub const CONNECTED: &str = "connected";
pub const DISCONNECTED: &str = "disconnected";
pub const ERROR: &str = "error";
pub const RECONNECT_EXHAUSTED: &str = "reconnect-exhausted";
/// Catch-all name every inbound envelope is also published under.
pub const MESSAGE: &str = "message";

/// Why a transport went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The owner called `close()` or `reconnect()`.
    Requested,
    /// The server closed the socket or the stream ended.
    Remote { code: Option<u16>, reason: String },
    /// No pong arrived within the heartbeat timeout.
    HeartbeatTimeout,
    /// The platform reported the network as unreachable.
    Offline,
    /// Handshake or I/O failure.
    Failed(String),
}

impl CloseReason {
    pub fn is_requested(&self) -> bool {
        matches!(self, CloseReason::Requested)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Requested => f.write_str("requested"),
            CloseReason::Remote { code: Some(code), reason } => {
                write!(f, "remote close ({}): {}", code, reason)
            }
            CloseReason::Remote { code: None, reason } => write!(f, "remote close: {}", reason),
            CloseReason::HeartbeatTimeout => f.write_str("heartbeat timeout"),
            CloseReason::Offline => f.write_str("network offline"),
            CloseReason::Failed(detail) => write!(f, "failed: {}", detail),
        }
    }
}

/// Data delivered to event handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connected,
    Disconnected { reason: CloseReason },
    Error { detail: String },
    ReconnectExhausted { attempts: u32 },
    Message(Envelope),
}

impl Event {
    /// The hub key this event is primarily published under.
    pub fn name(&self) -> &str {
        match self {
            Event::Connected => CONNECTED,
            Event::Disconnected { .. } => DISCONNECTED,
            Event::Error { .. } => ERROR,
            Event::ReconnectExhausted { .. } => RECONNECT_EXHAUSTED,
            Event::Message(envelope) => envelope.kind(),
        }
    }

    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            Event::Message(envelope) => Some(envelope),
            _ => None,
        }
    }
}
