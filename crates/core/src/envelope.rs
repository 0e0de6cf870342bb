// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wire envelope exchanged over the realtime channel.
//!
//! Every frame is a JSON text message with exactly three fields:
//!
//! ```text
//! { "type": "chat", "payload": { ... }, "timestamp": 1718000000000 }
//! ```
//!
//! `type` drives dispatch on the client, `payload` is opaque to the
//! connection layer and `timestamp` is milliseconds since the Unix epoch.
//! Any JSON number is accepted as a timestamp: fractions are truncated and
//! negative values read as `0`.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::error::{Error, Result};

/// Envelope type of the heartbeat probe sent by the client.
pub const PING: &str = "ping";

/// Envelope type of the heartbeat response sent by the server.
pub const PONG: &str = "pong";

/// The typed unit of wire traffic.
///
/// Envelopes are immutable once constructed; fields are only reachable
/// through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default = "empty_payload")]
    payload: Value,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    timestamp: u64,
}

fn empty_payload() -> Value {
    Value::Object(serde_json::Map::new())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = Option::<Number>::deserialize(deserializer)?;
    Ok(number.as_ref().map_or(0, timestamp_from_number))
}

fn timestamp_from_number(number: &Number) -> u64 {
    if let Some(ms) = number.as_u64() {
        return ms;
    }
    if number.is_i64() {
        return 0;
    }
    // Float to int casts truncate and saturate.
    number.as_f64().map_or(0, |ms| ms as u64)
}

impl Envelope {
    /// Creates an envelope stamped with the current wall clock time.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self::at(kind, payload, now_ms())
    }

    /// Creates an envelope with an explicit timestamp.
    pub fn at(kind: impl Into<String>, payload: Value, timestamp: u64) -> Self {
        Envelope {
            kind: kind.into(),
            payload,
            timestamp,
        }
    }

    /// Creates a heartbeat probe with an empty payload.
    pub fn ping() -> Self {
        Self::new(PING, empty_payload())
    }

    /// Creates a heartbeat response with an empty payload.
    pub fn pong() -> Self {
        Self::new(PONG, empty_payload())
    }

    /// The dispatch key of this envelope.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Milliseconds since the Unix epoch at construction.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Returns true for the heartbeat response sentinel.
    pub fn is_pong(&self) -> bool {
        self.kind == PONG
    }

    /// Serializes the envelope to a JSON text frame.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a JSON text frame.
    ///
    /// Only `type` is required; a missing `payload` becomes `{}` and a
    /// missing or null `timestamp` becomes `0`.
    pub fn from_json(s: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(s)?;
        if envelope.kind.is_empty() {
            return Err(Error::MalformedEnvelope("empty type".to_string()));
        }
        Ok(envelope)
    }
}

/// Current wall clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
