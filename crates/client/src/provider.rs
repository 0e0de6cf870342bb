// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Collaborators injected by the application shell.
//!
//! - [`TokenProvider`]: read synchronously at every connect attempt.
//! - [`Notifier`]: receives short user-facing status messages.

use std::fmt;

use tracing::{error, info, warn};

/// Source of the auth token embedded in the connection target.
pub trait TokenProvider: Send + Sync + 'static {
    /// The current token, or `None` when the user is not signed in.
    fn token(&self) -> Option<String>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> Option<String> + Send + Sync + 'static,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// A token that never changes.
#[derive(Clone)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        StaticToken(Some(token.into()))
    }

    pub fn none() -> Self {
        StaticToken(None)
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = if self.0.is_some() { "<redacted>" } else { "<none>" };
        f.debug_tuple("StaticToken").field(&shown).finish()
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// How prominent a notification should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Success => "success",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-facing notification sink.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, message: &str, severity: Severity);
}

impl<F> Notifier for F
where
    F: Fn(&str, Severity) + Send + Sync + 'static,
{
    fn notify(&self, message: &str, severity: Severity) {
        self(message, severity)
    }
}

/// Notifier that writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info | Severity::Success => info!(%severity, "{}", message),
            Severity::Warning => warn!(%severity, "{}", message),
            Severity::Error => error!(%severity, "{}", message),
        }
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
