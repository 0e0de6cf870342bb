// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One-line rendering of hub events for the terminal.

use pulse::Event;

pub fn format_event(event: &Event) -> String {
    match event {
        Event::Connected => "* connected".to_string(),
        Event::Disconnected { reason } => format!("* disconnected ({})", reason),
        Event::Error { detail } => format!("! error: {}", detail),
        Event::ReconnectExhausted { attempts } => {
            format!("! gave up after {} reconnect attempts, use /connect to retry", attempts)
        }
        Event::Message(envelope) => {
            format!("< {} {}", envelope.kind(), envelope.payload())
        }
    }
}
