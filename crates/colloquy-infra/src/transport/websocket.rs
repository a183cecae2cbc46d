//! WebSocket transport over `tokio-tungstenite`.
//!
//! Each `open` spawns one task that owns the socket: it performs the
//! handshake (bounded by the connect timeout), forwards inbound messages to
//! the [`EventSink`] in arrival order and writes queued outbound text.
//! Prompts go out as JSON text, control tokens as their literal text.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use colloquy_core::transport::{EventSink, Link, Transport};
use colloquy_types::config::{ChannelConfig, ReconnectConfig};
use colloquy_types::error::ConnectionError;
use colloquy_types::frame::RawInput;
use colloquy_types::message::OutboundMessage;

#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for WebSocketTransport {
    fn open(
        &self,
        channel: &ChannelConfig,
        reconnect: &ReconnectConfig,
        sink: EventSink,
    ) -> Result<Box<dyn Link>, ConnectionError> {
        let endpoint = channel.endpoint.clone();
        if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
            return Err(ConnectionError::InvalidEndpoint {
                endpoint,
                reason: "expected a ws:// or wss:// URL".to_string(),
            });
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ConnectionError::Socket(e.to_string()))?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        runtime.spawn(run_socket(
            endpoint,
            reconnect.connect_timeout(),
            sink,
            outbound_rx,
            cancel.clone(),
        ));

        Ok(Box::new(WebSocketLink {
            outbound: outbound_tx,
            cancel,
        }))
    }
}

struct WebSocketLink {
    outbound: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

impl Link for WebSocketLink {
    fn send(&self, message: &OutboundMessage) -> Result<(), ConnectionError> {
        let text = message
            .to_wire_text()
            .map_err(|e| ConnectionError::Socket(format!("failed to encode message: {e}")))?;
        self.outbound
            .send(text)
            .map_err(|_| ConnectionError::Socket("socket task has exited".to_string()))
    }

    fn close(&mut self) {
        self.cancel.cancel();
    }
}

impl Drop for WebSocketLink {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_socket(
    endpoint: String,
    connect_timeout: Duration,
    sink: EventSink,
    mut outbound: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
) {
    let handshake = tokio::time::timeout(connect_timeout, connect_async(endpoint.as_str()));
    let stream = tokio::select! {
        _ = cancel.cancelled() => return,
        result = handshake => match result {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => {
                tracing::warn!(channel = %sink.channel(), %endpoint, error = %e, "websocket handshake failed");
                sink.closed(false);
                return;
            }
            Err(_) => {
                tracing::warn!(
                    channel = %sink.channel(),
                    %endpoint,
                    timeout_secs = connect_timeout.as_secs(),
                    "websocket handshake timed out"
                );
                sink.closed(false);
                return;
            }
        },
    };

    tracing::debug!(channel = %sink.channel(), %endpoint, "websocket connected");
    sink.opened();

    let (mut write, mut read) = stream.split();
    let was_clean = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                return;
            }
            queued = outbound.recv() => match queued {
                Some(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        tracing::warn!(channel = %sink.channel(), error = %e, "websocket send failed");
                        break false;
                    }
                }
                // Link dropped without close().
                None => {
                    let _ = write.close().await;
                    return;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => sink.frame(RawInput::Text(text)),
                Some(Ok(Message::Binary(bytes))) => sink.frame(RawInput::Binary(bytes)),
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(channel = %sink.channel(), ?frame, "server closed websocket");
                    break true;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(channel = %sink.channel(), error = %e, "websocket read failed");
                    break false;
                }
                None => break false,
            },
        }
    };

    sink.closed(was_clean);
}
