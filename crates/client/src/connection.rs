// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The connection task.
//!
//! One task owns the connection state, the heartbeat monitor, the
//! reconnection scheduler and every timer. It processes handle commands,
//! transport events, timer deadlines and network changes one at a time, so
//! transitions never interleave. The outbound queue lives in an [`Outbox`]
//! shared with handles; only this task attaches and detaches its writer.
//!
//! Each transport runs in its own session task that dials, reports
//! `Opened`, pumps frames and always finishes with exactly one `Closed`.
//! Envelopes the session accepted but never wrote are handed back first and
//! return to the head of the outbound queue. Events carry the session id;
//! once a session is replaced or force-closed its remaining events are
//! dropped.

use std::future;
use std::sync::Arc;

use pulse_core::{Envelope, PING};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::RealtimeConfig;
use crate::error::{Error, Result};
use crate::event::{CloseReason, Event, MESSAGE};
use crate::heartbeat::HeartbeatMonitor;
use crate::hub::EventHub;
use crate::network::NetworkStatus;
use crate::outbox::{Outbox, Writer};
use crate::provider::{Notifier, Severity, TokenProvider};
use crate::reconnect::{ReconnectDecision, ReconnectScheduler};
use crate::state::{ConnectionState, SharedState};
use crate::timers::{TimerKind, Timers};
use crate::transport::{BoxFuture, Connector, Incoming, Transport, TransportResult};

/// Requests from handles to the connection task.
#[derive(Debug)]
pub(crate) enum Command {
    Connect,
    Close,
    Reconnect,
    Shutdown(oneshot::Sender<()>),
}

/// Reports from a session task.
#[derive(Debug)]
pub(crate) enum TransportEvent {
    Opened,
    Message(String),
    Error(String),
    /// Envelopes taken from the outgoing channel but never written.
    Unsent(Vec<Envelope>),
    Closed(CloseReason),
}

type SessionId = u64;

/// Injected collaborators.
pub(crate) struct Collaborators {
    pub(crate) tokens: Box<dyn TokenProvider>,
    pub(crate) notifier: Box<dyn Notifier>,
    pub(crate) network: Option<watch::Receiver<NetworkStatus>>,
}

/// The live transport, seen from the connection task.
struct Session {
    id: SessionId,
    outgoing: Writer,
    cancel: CancellationToken,
}

impl Session {
    /// Hand one envelope to the session task for writing.
    fn write(&self, envelope: Envelope) -> Result<()> {
        self.outgoing.send(envelope).map_err(|_| Error::ChannelClosed)
    }
}

/// What woke the connection loop.
enum Wake {
    Command(Command),
    HandlesDropped,
    Transport(SessionId, TransportEvent),
    Timer(TimerKind),
    Network(NetworkStatus),
}

pub(crate) struct Connection<C: Connector> {
    config: RealtimeConfig,
    connector: C,
    tokens: Box<dyn TokenProvider>,
    notifier: Box<dyn Notifier>,
    network: Option<watch::Receiver<NetworkStatus>>,
    hub: Arc<EventHub>,
    shared: Arc<SharedState>,
    outbox: Arc<Outbox>,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<(SessionId, TransportEvent)>,
    events_rx: mpsc::UnboundedReceiver<(SessionId, TransportEvent)>,

    state: ConnectionState,
    session: Option<Session>,
    last_session: SessionId,
    heartbeat: HeartbeatMonitor,
    reconnect: ReconnectScheduler,
    timers: Timers,
    online: bool,
    /// Set by `close()`; the next close report must not reconnect.
    deliberate: bool,
    /// The owner asked for a connection and has not closed it since.
    wants_connection: bool,
    /// Retries ran out; cleared only by an explicit connect.
    exhausted: bool,
    /// The "connection lost" notification was shown for this outage.
    outage_notified: bool,
    /// Connect once the in-flight deliberate close completes.
    pending_connect: bool,
}

impl<C: Connector> Connection<C> {
    pub(crate) fn new(
        config: RealtimeConfig,
        connector: C,
        collaborators: Collaborators,
        hub: Arc<EventHub>,
        shared: Arc<SharedState>,
        outbox: Arc<Outbox>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let online = collaborators
            .network
            .as_ref()
            .is_none_or(|rx| rx.borrow().is_online());
        shared.set_online(online);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Connection {
            heartbeat: config.heartbeat_monitor(),
            reconnect: config.reconnect_scheduler(),
            config,
            connector,
            tokens: collaborators.tokens,
            notifier: collaborators.notifier,
            network: collaborators.network,
            hub,
            shared,
            outbox,
            commands,
            events_tx,
            events_rx,
            state: ConnectionState::Idle,
            session: None,
            last_session: 0,
            timers: Timers::new(),
            online,
            deliberate: false,
            wants_connection: false,
            exhausted: false,
            outage_notified: false,
            pending_connect: false,
        }
    }

    /// Process inputs until shutdown or until every handle is dropped.
    pub(crate) async fn run(mut self) {
        debug!(endpoint = %self.config.endpoint, "connection task started");
        loop {
            let wake = tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(command) => Wake::Command(command),
                    None => Wake::HandlesDropped,
                },
                Some((session, event)) = self.events_rx.recv() => Wake::Transport(session, event),
                kind = self.timers.expired() => Wake::Timer(kind),
                status = network_changed(&mut self.network) => Wake::Network(status),
            };

            match wake {
                Wake::Command(Command::Shutdown(done)) => {
                    self.shutdown();
                    let _ = done.send(());
                    break;
                }
                Wake::HandlesDropped => {
                    self.shutdown();
                    break;
                }
                Wake::Command(command) => self.handle_command(command),
                Wake::Transport(session, event) => self.handle_transport(session, event),
                Wake::Timer(kind) => self.handle_timer(kind),
                Wake::Network(status) => self.handle_network(status),
            }
        }
        debug!("connection task stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => {
                self.wants_connection = true;
                self.clear_exhaustion();
                self.connect();
            }
            Command::Close => {
                self.outbox.release();
                self.close();
            }
            Command::Reconnect => {
                self.outbox.release();
                self.reconnect();
            }
            // Handled by the run loop.
            Command::Shutdown(_) => {}
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            trace!(from = %self.state, to = %state, "state transition");
        }
        if state != ConnectionState::Open {
            self.outbox.detach();
        }
        self.state = state;
        self.shared.set_state(state);
    }

    fn sync_attempts(&self) {
        self.shared.set_attempts(self.reconnect.attempts());
    }

    fn emit(&self, event: Event) {
        self.hub.emit(event.name(), &event);
    }

    fn clear_exhaustion(&mut self) {
        if self.exhausted {
            self.exhausted = false;
            self.reconnect.reset();
            self.sync_attempts();
        }
    }

    fn connect(&mut self) {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open => {
                debug!(state = %self.state, "connect ignored, transport already live");
                return;
            }
            ConnectionState::Closing => {
                debug!("connect deferred until close completes");
                self.pending_connect = true;
                return;
            }
            ConnectionState::Idle | ConnectionState::Closed => {}
        }

        let Some(token) = self.tokens.token() else {
            warn!("no auth token available, not connecting");
            return;
        };
        let url = match self.config.connection_url(&token) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "cannot build connection target");
                return;
            }
        };

        self.timers.cancel(TimerKind::Reconnect);
        self.deliberate = false;
        self.last_session += 1;
        let id = self.last_session;
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let dial = self.connector.connect(&url);
        tokio::spawn(run_session(
            id,
            dial,
            outgoing_rx,
            cancel.clone(),
            self.events_tx.clone(),
        ));

        self.session = Some(Session {
            id,
            outgoing: outgoing_tx,
            cancel,
        });
        self.set_state(ConnectionState::Connecting);
        info!(
            session = id,
            endpoint = %self.config.endpoint,
            attempt = self.reconnect.attempts(),
            "connecting"
        );
    }

    fn close(&mut self) {
        self.wants_connection = false;
        self.pending_connect = false;
        self.heartbeat.stop(&mut self.timers);
        self.timers.cancel_all();

        match self.session.as_ref() {
            Some(session) => {
                info!(session = session.id, "closing connection");
                session.cancel.cancel();
                self.deliberate = true;
                self.set_state(ConnectionState::Closing);
            }
            None => debug!(state = %self.state, "close requested with no live transport"),
        }
    }

    fn reconnect(&mut self) {
        self.close();
        self.wants_connection = true;
        self.clear_exhaustion();
        if self.session.is_some() {
            self.pending_connect = true;
        } else {
            self.connect();
        }
    }

    fn handle_transport(&mut self, session: SessionId, event: TransportEvent) {
        // Accepted from stale sessions too: these envelopes are owed.
        if let TransportEvent::Unsent(envelopes) = event {
            debug!(session, count = envelopes.len(), "session returned unwritten envelopes");
            self.outbox.requeue(envelopes);
            return;
        }

        if self.session.as_ref().map(|s| s.id) != Some(session) {
            trace!(session, ?event, "ignoring event from stale session");
            return;
        }

        match event {
            TransportEvent::Opened => self.on_open(),
            TransportEvent::Message(text) => self.on_message(&text),
            TransportEvent::Error(detail) => {
                warn!(session, %detail, "transport error");
                self.emit(Event::Error { detail });
            }
            TransportEvent::Unsent(_) => {}
            TransportEvent::Closed(reason) => {
                self.session = None;
                self.on_closed(reason);
            }
        }
    }

    fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            debug!(state = %self.state, "ignoring open outside connecting");
            return;
        }

        self.set_state(ConnectionState::Open);
        self.reconnect.reset();
        self.sync_attempts();
        self.outage_notified = false;
        self.heartbeat.start(&mut self.timers);
        if let Some(session) = self.session.as_ref() {
            match self.outbox.attach(session.outgoing.clone()) {
                Ok(0) => {}
                Ok(flushed) => info!(flushed, "flushed queued messages"),
                Err(e) => {
                    warn!(error = %e, remaining = self.outbox.len(), "queue flush interrupted");
                }
            }
        }

        info!(endpoint = %self.config.endpoint, "connection open");
        self.notifier
            .notify("Realtime connection established", Severity::Success);
        self.emit(Event::Connected);
    }

    fn on_message(&mut self, text: &str) {
        let envelope = match Envelope::from_json(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, len = text.len(), "dropping malformed inbound frame");
                return;
            }
        };

        if envelope.is_pong() {
            if !self.heartbeat.on_pong(&mut self.timers) {
                trace!("pong without outstanding probe");
            }
            return;
        }

        trace!(kind = envelope.kind(), "inbound envelope");
        let event = Event::Message(envelope);
        self.hub.emit(event.name(), &event);
        if event.name() != MESSAGE {
            self.hub.emit(MESSAGE, &event);
        }
    }

    fn on_closed(&mut self, reason: CloseReason) {
        let was_open = self.state == ConnectionState::Open;
        let deliberate = std::mem::take(&mut self.deliberate) || reason.is_requested();

        self.heartbeat.stop(&mut self.timers);
        self.set_state(ConnectionState::Closed);
        info!(%reason, was_open, "connection closed");
        self.emit(Event::Disconnected { reason });

        if deliberate {
            if std::mem::take(&mut self.pending_connect) {
                if self.online {
                    self.connect();
                } else {
                    info!("network offline, connect deferred until online");
                }
            }
            return;
        }

        if was_open && !self.outage_notified {
            self.outage_notified = true;
            self.notifier
                .notify("Connection lost, reconnecting...", Severity::Warning);
        }
        self.schedule_reconnect();
    }

    /// Drop the current transport without waiting for its close report and
    /// run close handling now.
    fn force_close(&mut self, reason: CloseReason) {
        let Some(session) = self.session.take() else {
            return;
        };
        debug!(session = session.id, %reason, "force-closing transport");
        session.cancel.cancel();
        self.on_closed(reason);
    }

    fn schedule_reconnect(&mut self) {
        if self.exhausted {
            return;
        }
        if !self.online {
            info!("network offline, reconnect deferred until online");
            return;
        }

        match self.reconnect.next() {
            ReconnectDecision::Retry { attempt, delay } => {
                self.sync_attempts();
                self.timers.arm(TimerKind::Reconnect, delay);
                info!(
                    attempt,
                    max_attempts = self.reconnect.max_attempts(),
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "reconnect scheduled"
                );
            }
            ReconnectDecision::Exhausted { attempts } => {
                self.exhausted = true;
                warn!(attempts, "reconnect attempts exhausted, giving up");
                self.notifier.notify(
                    "Unable to establish a connection, check your network",
                    Severity::Error,
                );
                self.emit(Event::ReconnectExhausted { attempts });
            }
        }
    }

    fn handle_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::HeartbeatProbe => {
                let open = self.state == ConnectionState::Open;
                let Some(ping) = self.heartbeat.on_probe_due(open, &mut self.timers) else {
                    return;
                };
                let written = self.session.as_ref().map(|s| s.write(ping));
                match written {
                    Some(Ok(())) => trace!("heartbeat probe sent"),
                    Some(Err(e)) => debug!(error = %e, "heartbeat probe not written"),
                    None => {}
                }
            }
            TimerKind::HeartbeatTimeout => {
                if self.heartbeat.on_timeout() {
                    warn!(
                        timeout_ms = self.config.heartbeat_timeout_ms,
                        "no pong within heartbeat timeout, closing connection"
                    );
                    self.force_close(CloseReason::HeartbeatTimeout);
                }
            }
            TimerKind::Reconnect => {
                debug!(attempt = self.reconnect.attempts(), "reconnect timer fired");
                self.connect();
            }
        }
    }

    fn handle_network(&mut self, status: NetworkStatus) {
        let online = status.is_online();
        if online == self.online {
            return;
        }
        self.online = online;
        self.shared.set_online(online);

        if !online {
            info!("network offline");
            self.timers.cancel(TimerKind::Reconnect);
            self.force_close(CloseReason::Offline);
            return;
        }

        info!("network online");
        let idle = matches!(
            self.state,
            ConnectionState::Idle | ConnectionState::Closed
        );
        if self.wants_connection && !self.exhausted && idle {
            self.timers.cancel(TimerKind::Reconnect);
            self.connect();
        }
    }

    fn shutdown(&mut self) {
        self.wants_connection = false;
        self.pending_connect = false;
        self.timers.cancel_all();
        self.outbox.detach();
        if let Some(session) = self.session.take() {
            session.cancel.cancel();
            self.heartbeat.stop(&mut self.timers);
            self.set_state(ConnectionState::Closed);
            self.emit(Event::Disconnected {
                reason: CloseReason::Requested,
            });
        }
        info!(queued = self.outbox.len(), "connection shut down");
    }
}

/// Wait for the next network status change.
///
/// Never resolves without a network source, or once its sender is gone.
async fn network_changed(network: &mut Option<watch::Receiver<NetworkStatus>>) -> NetworkStatus {
    let Some(rx) = network.as_mut() else {
        return future::pending().await;
    };
    if rx.changed().await.is_ok() {
        return *rx.borrow_and_update();
    }
    *network = None;
    future::pending().await
}

/// What woke a session task.
enum Step {
    Cancelled,
    Write(Option<Envelope>),
    Read(TransportResult<Incoming>),
}

/// Drive one transport from dial to close.
async fn run_session<T: Transport>(
    id: SessionId,
    dial: BoxFuture<'static, TransportResult<T>>,
    mut outgoing: mpsc::UnboundedReceiver<Envelope>,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<(SessionId, TransportEvent)>,
) {
    let report = |event: TransportEvent| {
        let _ = events.send((id, event));
    };

    let dialed = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = dial => Some(result),
    };
    let mut transport = match dialed {
        None => {
            report(TransportEvent::Closed(CloseReason::Requested));
            return;
        }
        Some(Err(e)) => {
            let detail = e.to_string();
            report(TransportEvent::Error(detail.clone()));
            report(TransportEvent::Closed(CloseReason::Failed(detail)));
            return;
        }
        Some(Ok(transport)) => transport,
    };
    report(TransportEvent::Opened);

    let mut unsent = Vec::new();
    let (reason, close_transport) = loop {
        let step = tokio::select! {
            biased;
            _ = cancel.cancelled() => Step::Cancelled,
            envelope = outgoing.recv() => Step::Write(envelope),
            incoming = transport.recv() => Step::Read(incoming),
        };

        match step {
            Step::Cancelled | Step::Write(None) => break (CloseReason::Requested, true),
            Step::Write(Some(envelope)) => {
                let text = match envelope.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        report(TransportEvent::Error(e.to_string()));
                        continue;
                    }
                };
                if let Err(e) = transport.send(text).await {
                    let detail = e.to_string();
                    report(TransportEvent::Error(detail.clone()));
                    unsent.push(envelope);
                    break (CloseReason::Failed(detail), false);
                }
            }
            Step::Read(Ok(Incoming::Text(text))) => report(TransportEvent::Message(text)),
            Step::Read(Ok(Incoming::Closed { code, reason })) => {
                break (CloseReason::Remote { code, reason }, false);
            }
            Step::Read(Err(e)) => {
                let detail = e.to_string();
                report(TransportEvent::Error(detail.clone()));
                break (CloseReason::Failed(detail), false);
            }
        }
    };

    // Handles fall back to the queue from here on.
    outgoing.close();
    while let Ok(envelope) = outgoing.try_recv() {
        unsent.push(envelope);
    }
    unsent.retain(|envelope| envelope.kind() != PING);
    if !unsent.is_empty() {
        report(TransportEvent::Unsent(unsent));
    }

    if close_transport {
        transport.close().await;
    }
    trace!(session = id, %reason, "session finished");
    report(TransportEvent::Closed(reason));
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
