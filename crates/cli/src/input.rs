// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Parsing of interactive input lines.
//!
//! A line is either a slash command (`/close`, `/info`, ...) or an envelope
//! to send, written as its type optionally followed by a JSON payload:
//!
//! ```text
//! chat {"text": "hello"}
//! typing
//! ```

use pulse::NetworkStatus;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Send { kind: String, payload: Value },
    Connect,
    Close,
    Reconnect,
    ClearQueue,
    /// Report the network as reachable or unreachable.
    Network(NetworkStatus),
    Info,
    Help,
    Quit,
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command '/{0}', try /help")]
    UnknownCommand(String),

    #[error("payload must be JSON: {0}")]
    InvalidPayload(String),
}

pub const HELP: &str = "\
<type> [json]   send an envelope (payload defaults to {})
/connect        open the connection
/close          close the connection
/reconnect      close and connect again
/clear          discard queued messages
/offline        report the network as unreachable
/online         report the network as reachable
/info           show connection status
/quit           exit";

pub fn parse_line(line: &str) -> Result<Input, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Blank);
    }

    if let Some(command) = line.strip_prefix('/') {
        return match command.trim() {
            "connect" => Ok(Input::Connect),
            "close" => Ok(Input::Close),
            "reconnect" => Ok(Input::Reconnect),
            "clear" => Ok(Input::ClearQueue),
            "offline" => Ok(Input::Network(NetworkStatus::Offline)),
            "online" => Ok(Input::Network(NetworkStatus::Online)),
            "info" => Ok(Input::Info),
            "help" => Ok(Input::Help),
            "quit" | "exit" => Ok(Input::Quit),
            other => Err(ParseError::UnknownCommand(other.to_string())),
        };
    }

    let (kind, rest) = match line.split_once(char::is_whitespace) {
        Some((kind, rest)) => (kind, rest.trim()),
        None => (line, ""),
    };
    let payload = if rest.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(rest).map_err(|e| ParseError::InvalidPayload(e.to_string()))?
    };

    Ok(Input::Send {
        kind: kind.to_string(),
        payload,
    })
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
