// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for the realtime client.

use crate::config::ConfigError;
use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Envelope(#[from] pulse_core::Error),

    /// The connection task has shut down.
    #[error("connection task is no longer running")]
    ChannelClosed,

    #[error("no tokio runtime available to run the connection")]
    NoRuntime,
}

/// Result type for realtime client operations.
pub type Result<T> = std::result::Result<T, Error>;
