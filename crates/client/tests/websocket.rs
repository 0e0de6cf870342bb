// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests against a real WebSocket server on a loopback port.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pulse::event::{CONNECTED, DISCONNECTED};
use pulse::{ConnectionState, Event, Realtime, RealtimeConfig};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

/// Echo server: answers `ping` with `pong`, closes on `kick`, and echoes
/// every other payload back as an `echo` envelope. Reports each handshake
/// URI on `uris`.
async fn serve(listener: TcpListener, uris: mpsc::UnboundedSender<String>) {
    while let Ok((stream, _)) = listener.accept().await {
        let uris = uris.clone();
        tokio::spawn(async move {
            let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                let _ = uris.send(req.uri().to_string());
                Ok(resp)
            };
            let Ok(mut ws) = accept_hdr_async(stream, callback).await else {
                return;
            };

            while let Some(Ok(msg)) = ws.next().await {
                let Message::Text(text) = msg else {
                    continue;
                };
                let envelope: Value = serde_json::from_str(text.as_str()).unwrap();
                let reply = match envelope["type"].as_str() {
                    Some("ping") => json!({ "type": "pong", "payload": {}, "timestamp": 0 }),
                    Some("kick") => {
                        let _ = ws.close(None).await;
                        break;
                    }
                    _ => json!({
                        "type": "echo",
                        "payload": envelope["payload"].clone(),
                        "timestamp": 0
                    }),
                };
                if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
                    break;
                }
            }
        });
    }
}

struct Fixture {
    realtime: Realtime,
    uris: mpsc::UnboundedReceiver<String>,
    connected: mpsc::UnboundedReceiver<Event>,
    disconnected: mpsc::UnboundedReceiver<Event>,
    echoes: mpsc::UnboundedReceiver<Event>,
}

fn forward(realtime: &Realtime, name: &str) -> mpsc::UnboundedReceiver<Event> {
    let (tx, rx) = mpsc::unbounded_channel();
    realtime.on(name, move |event| {
        let _ = tx.send(event.clone());
    });
    rx
}

async fn fixture() -> Fixture {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (uris_tx, uris) = mpsc::unbounded_channel();
    tokio::spawn(serve(listener, uris_tx));

    let mut config = RealtimeConfig::new(format!("ws://127.0.0.1:{}/ws", port));
    config.heartbeat_interval_ms = 100;
    config.heartbeat_timeout_ms = 1_000;
    config.reconnect_initial_delay_ms = 50;
    config.reconnect_max_delay_ms = 200;

    let realtime = Realtime::builder(config)
        .token("it-token")
        .spawn()
        .unwrap();
    let connected = forward(&realtime, CONNECTED);
    let disconnected = forward(&realtime, DISCONNECTED);
    let echoes = forward(&realtime, "echo");

    Fixture {
        realtime,
        uris,
        connected,
        disconnected,
        echoes,
    }
}

async fn next(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[tokio::test]
async fn queued_message_is_delivered_after_connect() {
    let mut f = fixture().await;

    assert!(!f.realtime.send("chat", json!({ "text": "queued" })));
    f.realtime.connect();
    next(&mut f.connected).await;

    let uri = timeout(WAIT, f.uris.recv()).await.unwrap().unwrap();
    assert_eq!(uri, "/ws?token=it-token");

    let echo = next(&mut f.echoes).await;
    assert_eq!(
        echo.envelope().unwrap().payload(),
        &json!({ "text": "queued" })
    );

    assert!(f.realtime.send("chat", json!({ "text": "live" })));
    let echo = next(&mut f.echoes).await;
    assert_eq!(echo.envelope().unwrap().payload(), &json!({ "text": "live" }));
}

#[tokio::test]
async fn heartbeats_keep_the_connection_open() {
    let mut f = fixture().await;
    f.realtime.connect();
    next(&mut f.connected).await;

    // Several heartbeat intervals, each answered by the server.
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(f.realtime.is_connected());
    assert!(f.disconnected.try_recv().is_err());
}

#[tokio::test]
async fn server_close_triggers_reconnect() {
    let mut f = fixture().await;
    f.realtime.connect();
    next(&mut f.connected).await;

    f.realtime.send("kick", json!({}));

    let Event::Disconnected { reason } = next(&mut f.disconnected).await else {
        panic!("expected a disconnected event");
    };
    assert!(!reason.is_requested());

    next(&mut f.connected).await;
    assert!(f.realtime.is_connected());
    assert_eq!(f.realtime.connection_info().reconnect_attempts, 0);
}

#[tokio::test]
async fn deliberate_close_stays_closed() {
    let mut f = fixture().await;
    f.realtime.connect();
    next(&mut f.connected).await;

    f.realtime.close();
    let Event::Disconnected { reason } = next(&mut f.disconnected).await else {
        panic!("expected a disconnected event");
    };
    assert!(reason.is_requested());
    assert_eq!(f.realtime.state(), ConnectionState::Closed);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(f.connected.try_recv().is_err());
    assert_eq!(f.realtime.state(), ConnectionState::Closed);
}
