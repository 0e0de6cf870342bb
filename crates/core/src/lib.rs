// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! pulse-core: Shared wire types for the pulse realtime client
//!
//! This crate provides the envelope format and JSON codec used by the
//! connection manager and by anything that talks to it over the wire.

pub mod envelope;
pub mod error;

pub use envelope::{now_ms, Envelope, PING, PONG};
pub use error::{Error, Result};
