// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! pulse: a client-side realtime connection manager.
//!
//! Keeps one WebSocket channel to a server open, detects half-open sockets
//! with heartbeats, reconnects with bounded exponential backoff, queues
//! outbound envelopes while disconnected and publishes everything through
//! an event hub.
//!
//! # Architecture
//!
//! ```text
//! Realtime (handle, Clone) ──commands──▶ connection task ──frames──▶ session task ──▶ Transport
//!        │   │                              │    ▲                 ▲     │
//!        │   └──── send ──▶ Outbox ◀─attach─┤    │                 │     │
//!        │                    └─────────────┼────┼────── frames ───┘     │
//!        └──── on/off ──▶ EventHub ◀──emit──┘    └──── session events ◀──┘
//! ```
//!
//! The connection task owns the state machine, the heartbeat monitor, the
//! reconnection scheduler and all timers. Sends go through the outbox:
//! straight to the open session, or into the outbound queue. Handles read
//! state through a lock-free snapshot.
//!
//! # Example
//!
//! ```no_run
//! use pulse::{event, Realtime, RealtimeConfig};
//! use serde_json::json;
//!
//! # async fn run() -> pulse::Result<()> {
//! let realtime = Realtime::builder(RealtimeConfig::new("wss://chat.example.com/ws"))
//!     .token("secret")
//!     .spawn()?;
//!
//! realtime.on(event::CONNECTED, |_| println!("online"));
//! realtime.on("chat", |event| println!("{:?}", event.envelope()));
//! realtime.connect();
//! realtime.send("chat", json!({ "text": "hello" }));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
mod connection;
pub mod error;
pub mod event;
pub mod heartbeat;
pub mod hub;
pub mod network;
mod outbox;
pub mod provider;
pub mod queue;
pub mod reconnect;
pub mod state;
pub mod timers;
pub mod transport;

pub use client::{ConnectionInfo, Realtime, RealtimeBuilder};
pub use config::{ConfigError, RealtimeConfig};
pub use error::{Error, Result};
pub use event::{CloseReason, Event};
pub use hub::SubscriptionId;
pub use network::{NetworkMonitor, NetworkStatus};
pub use provider::{Notifier, Severity, StaticToken, TokenProvider, TracingNotifier};
pub use pulse_core::Envelope;
pub use state::ConnectionState;
pub use transport::{Connector, Transport, TransportError, WebSocketConnector};
