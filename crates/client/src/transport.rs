// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for WebSocket communication.
//!
//! A [`Connector`] dials the connection target and yields a live
//! [`Transport`]. The connection task owns exactly one transport at a time.
//! Mock connectors stand in for the network in tests.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Boxed future returned by transport operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Handshake failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The transport is no longer usable.
    #[error("connection closed")]
    ConnectionClosed,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// A frame delivered by [`Transport::recv`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A text frame carrying one envelope.
    Text(String),
    /// The peer closed the connection or the stream ended.
    Closed { code: Option<u16>, reason: String },
}

/// An established bidirectional text channel.
pub trait Transport: Send + 'static {
    /// Write one text frame.
    fn send(&mut self, text: String) -> BoxFuture<'_, TransportResult<()>>;

    /// Wait for the next frame.
    ///
    /// Must be cancel safe: the connection drops a pending `recv` whenever
    /// it has something to write.
    fn recv(&mut self) -> BoxFuture<'_, TransportResult<Incoming>>;

    /// Close the channel. Errors are ignored; the transport is discarded
    /// afterwards either way.
    fn close(&mut self) -> BoxFuture<'_, ()>;
}

/// Dials connection targets.
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    fn connect(&self, url: &str) -> BoxFuture<'static, TransportResult<Self::Transport>>;
}

/// Connector for real WebSocket endpoints using tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    fn connect(&self, url: &str) -> BoxFuture<'static, TransportResult<WebSocketTransport>> {
        let url = url.to_string();
        Box::pin(async move {
            let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            let (sink, stream) = ws_stream.split();
            Ok(WebSocketTransport { sink, stream })
        })
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport split into its write and read halves.
pub struct WebSocketTransport {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

impl Transport for WebSocketTransport {
    fn send(&mut self, text: String) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            self.sink
                .send(Message::Text(text.into()))
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))
        })
    }

    fn recv(&mut self) -> BoxFuture<'_, TransportResult<Incoming>> {
        Box::pin(async move {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return Ok(Incoming::Text(text.as_str().to_string()));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = match frame {
                            Some(frame) => {
                                (Some(u16::from(frame.code)), frame.reason.as_str().to_string())
                            }
                            None => (None, String::new()),
                        };
                        return Ok(Incoming::Closed { code, reason });
                    }
                    // Protocol-level ping/pong is answered by tungstenite;
                    // binary frames carry no envelopes.
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(TransportError::ReceiveFailed(e.to_string())),
                    None => {
                        return Ok(Incoming::Closed {
                            code: None,
                            reason: "stream ended".to_string(),
                        });
                    }
                }
            }
        })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let _ = self.sink.close().await;
        })
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
pub(crate) mod tests;
