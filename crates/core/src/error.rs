// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for pulse-core operations.

use thiserror::Error;

/// Errors raised while encoding or decoding wire envelopes.
#[derive(Debug, Error)]
pub enum Error {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

/// A specialized Result type for pulse-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
