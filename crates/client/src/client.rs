// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Public handle to a realtime connection.
//!
//! [`RealtimeBuilder::spawn`] starts the connection task and returns a
//! [`Realtime`] handle. Handles are cheap to clone. Every method returns
//! immediately. Sends go straight to the open connection or the outbound
//! queue; everything else runs on the connection task in submission order.

use std::sync::Arc;

use pulse_core::Envelope;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::config::RealtimeConfig;
use crate::connection::{Collaborators, Command, Connection};
use crate::error::{Error, Result};
use crate::event::Event;
use crate::hub::{EventHub, SubscriptionId};
use crate::network::NetworkStatus;
use crate::outbox::Outbox;
use crate::provider::{Notifier, StaticToken, TokenProvider, TracingNotifier};
use crate::state::{ConnectionState, SharedState};
use crate::transport::{Connector, WebSocketConnector};

/// Point-in-time view of the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub state: ConnectionState,
    pub connected: bool,
    pub reconnect_attempts: u32,
    pub queued_messages: usize,
    pub online: bool,
    /// Configured endpoint, without the auth token.
    pub endpoint: String,
}

/// Handle to a running connection task.
#[derive(Clone)]
pub struct Realtime {
    commands: mpsc::UnboundedSender<Command>,
    hub: Arc<EventHub>,
    shared: Arc<SharedState>,
    outbox: Arc<Outbox>,
    endpoint: Arc<str>,
}

impl Realtime {
    pub fn builder(config: RealtimeConfig) -> RealtimeBuilder<WebSocketConnector> {
        RealtimeBuilder::new(config)
    }

    fn command(&self, command: Command) -> bool {
        match self.commands.send(command) {
            Ok(()) => true,
            Err(_) => {
                debug!("connection task is gone, command dropped");
                false
            }
        }
    }

    /// Open the connection. A no-op while connecting or open.
    pub fn connect(&self) {
        self.command(Command::Connect);
    }

    /// Close deliberately. Cancels every pending timer; never reconnects.
    ///
    /// Takes effect for this and every other handle at once: sends are
    /// queued from here on and the state reads `Closing`.
    pub fn close(&self) {
        self.begin_close();
        self.command(Command::Close);
    }

    /// Close and connect again with a freshly read token.
    pub fn reconnect(&self) {
        self.begin_close();
        self.command(Command::Reconnect);
    }

    fn begin_close(&self) {
        self.outbox.hold();
        self.shared.begin_close();
    }

    /// Send an envelope of `kind` carrying `payload`.
    ///
    /// Returns true when the connection is open and the envelope is written
    /// now. Otherwise it is queued for the next open and false is returned.
    pub fn send(&self, kind: impl Into<String>, payload: Value) -> bool {
        self.send_envelope(Envelope::new(kind, payload))
    }

    pub fn send_envelope(&self, envelope: Envelope) -> bool {
        self.outbox.send(envelope)
    }

    /// True while sends are written to an open connection.
    pub fn is_connected(&self) -> bool {
        self.outbox.is_writable()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Subscribe to `event`: a lifecycle name from [`crate::event`] or an
    /// envelope type.
    pub fn on<F>(&self, event: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.hub.on(event, handler)
    }

    pub fn off(&self, event: &str, id: SubscriptionId) -> bool {
        self.hub.off(event, id)
    }

    /// Discard queued outbound messages without sending them.
    pub fn clear_queue(&self) {
        let dropped = self.outbox.clear();
        info!(dropped, "outbound queue cleared");
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            state: self.shared.state(),
            connected: self.is_connected(),
            reconnect_attempts: self.shared.attempts(),
            queued_messages: self.outbox.len(),
            online: self.shared.online(),
            endpoint: self.endpoint.to_string(),
        }
    }

    /// Stop the connection task and wait for it to finish.
    pub async fn shutdown(&self) {
        self.outbox.hold();
        let (done_tx, done_rx) = oneshot::channel();
        if self.command(Command::Shutdown(done_tx)) {
            let _ = done_rx.await;
        }
    }
}

/// Configures and starts a connection task.
pub struct RealtimeBuilder<C = WebSocketConnector> {
    config: RealtimeConfig,
    connector: C,
    tokens: Box<dyn TokenProvider>,
    notifier: Box<dyn Notifier>,
    network: Option<watch::Receiver<NetworkStatus>>,
}

impl RealtimeBuilder<WebSocketConnector> {
    pub fn new(config: RealtimeConfig) -> Self {
        RealtimeBuilder {
            config,
            connector: WebSocketConnector,
            tokens: Box::new(StaticToken::none()),
            notifier: Box::new(TracingNotifier),
            network: None,
        }
    }
}

impl<C: Connector> RealtimeBuilder<C> {
    /// Replace the transport connector.
    pub fn connector<D: Connector>(self, connector: D) -> RealtimeBuilder<D> {
        RealtimeBuilder {
            config: self.config,
            connector,
            tokens: self.tokens,
            notifier: self.notifier,
            network: self.network,
        }
    }

    /// Read the auth token from `provider` at every connect.
    pub fn token_provider(mut self, provider: impl TokenProvider) -> Self {
        self.tokens = Box::new(provider);
        self
    }

    /// Use a fixed auth token.
    pub fn token(self, token: impl Into<String>) -> Self {
        self.token_provider(StaticToken::new(token))
    }

    pub fn notifier(mut self, notifier: impl Notifier) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    /// Follow platform reachability. Without a source the network is
    /// assumed to be online.
    pub fn network(mut self, status: watch::Receiver<NetworkStatus>) -> Self {
        self.network = Some(status);
        self
    }

    /// Validate the configuration and spawn the connection task on the
    /// current tokio runtime. The connection stays idle until `connect()`.
    pub fn spawn(self) -> Result<Realtime> {
        self.config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let hub = Arc::new(EventHub::new());
        let shared = Arc::new(SharedState::new(true));
        let outbox = Arc::new(Outbox::new(self.config.outbound_queue()));
        let endpoint: Arc<str> = Arc::from(self.config.endpoint.as_str());

        let connection = Connection::new(
            self.config,
            self.connector,
            Collaborators {
                tokens: self.tokens,
                notifier: self.notifier,
                network: self.network,
            },
            Arc::clone(&hub),
            Arc::clone(&shared),
            Arc::clone(&outbox),
            commands_rx,
        );
        runtime.spawn(connection.run());

        Ok(Realtime {
            commands: commands_tx,
            hub,
            shared,
            outbox,
            endpoint,
        })
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
