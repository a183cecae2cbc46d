//! Network bindings for the core [`Transport`] port.

pub mod http_stream;
pub mod websocket;

pub use http_stream::HttpStreamTransport;
pub use websocket::WebSocketTransport;

use colloquy_core::transport::{EventSink, Link, Transport};
use colloquy_types::config::{ChannelConfig, ReconnectConfig, TransportKind};
use colloquy_types::error::ConnectionError;

/// Picks the WebSocket or streaming HTTP binding per channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkTransport {
    websocket: WebSocketTransport,
    http_stream: HttpStreamTransport,
}

impl NetworkTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for NetworkTransport {
    fn open(
        &self,
        channel: &ChannelConfig,
        reconnect: &ReconnectConfig,
        sink: EventSink,
    ) -> Result<Box<dyn Link>, ConnectionError> {
        match channel.transport {
            TransportKind::Websocket => self.websocket.open(channel, reconnect, sink),
            TransportKind::HttpStream => self.http_stream.open(channel, reconnect, sink),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use std::net::SocketAddr;

    use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
    use axum::http::StatusCode;
    use axum::response::Response;
    use axum::routing::{get, post};
    use axum::Router;

    use colloquy_core::SessionCoordinator;
    use colloquy_types::config::SessionConfig;
    use colloquy_types::message::PromptPayload;
    use colloquy_types::turn::Turn;

    use super::*;

    async fn pro_ws(ws: WebSocketUpgrade) -> Response {
        ws.on_upgrade(|mut socket: WebSocket| async move {
            while let Some(Ok(msg)) = socket.recv().await {
                if !matches!(msg, Message::Text(_)) {
                    continue;
                }
                for reply in [r#"{"name":"Pro","chunk":"Yes"}"#, r#"{"name":"Pro","chunk":"!"}"#, "[DONE]"] {
                    if socket.send(Message::Text(reply.into())).await.is_err() {
                        return;
                    }
                }
            }
        })
    }

    async fn con_stream() -> &'static str {
        "data: {\"name\":\"Con\",\"response\":\"No\"}\n\ndata: [DONE]\n\n"
    }

    async fn always_500() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Answers every prompt with half a turn, then hangs up.
    async fn hang_up_ws(ws: WebSocketUpgrade) -> Response {
        ws.on_upgrade(|mut socket: WebSocket| async move {
            if let Some(Ok(Message::Text(_))) = socket.recv().await {
                let _ = socket
                    .send(Message::Text(r#"{"name":"Pro","chunk":"Ye"}"#.into()))
                    .await;
            }
        })
    }

    async fn serve(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn single(endpoint: String, transport: TransportKind) -> SessionConfig {
        let mut config = SessionConfig {
            channels: vec![ChannelConfig::new(endpoint, transport)],
            ..Default::default()
        };
        config.reconnect.delay_ms = 50;
        config
    }

    #[tokio::test]
    async fn failing_stream_backend_settles_each_exchange_then_gives_up() {
        let addr = serve(Router::new().route("/chat", post(always_500))).await;
        let config = single(format!("http://{addr}/chat"), TransportKind::HttpStream);
        let mut session = SessionCoordinator::new(config, NetworkTransport::new()).unwrap();
        session.open();

        for exchange in 1..=3 {
            let connected =
                tokio::time::timeout(Duration::from_secs(5), session.wait_until_connected())
                    .await
                    .expect("ready link");
            assert!(connected);
            session.submit(PromptPayload::new("q")).unwrap();

            let snapshot =
                tokio::time::timeout(Duration::from_secs(5), session.run_until_settled())
                    .await
                    .expect("an HTTP 500 settles the exchange");
            assert!(!snapshot.loading);
            assert!(snapshot.interrupted);
            assert!(!snapshot.done);
            assert_eq!(session.channels()[0].retries(), exchange);
            assert_eq!(snapshot.disconnected, exchange == 3);
        }

        let snapshot = session.snapshot();
        assert!(snapshot.channels[0].failed);
        assert!(!session.channels()[0].has_pending_reconnect());
        session.close();
    }

    #[tokio::test]
    async fn websocket_drop_mid_reply_settles_as_interrupted() {
        let addr = serve(Router::new().route("/ws", get(hang_up_ws))).await;
        let config = single(format!("ws://{addr}/ws"), TransportKind::Websocket);
        let mut session = SessionCoordinator::new(config, NetworkTransport::new()).unwrap();
        session.open();
        assert!(
            tokio::time::timeout(Duration::from_secs(5), session.wait_until_connected())
                .await
                .unwrap()
        );

        session.submit(PromptPayload::new("q")).unwrap();
        let snapshot = tokio::time::timeout(Duration::from_secs(5), session.run_until_settled())
            .await
            .expect("a dropped socket settles the exchange");
        assert!(snapshot.interrupted);
        assert!(!snapshot.done);
        assert!(!snapshot.disconnected);
        assert_eq!(
            snapshot.channels[0].turns,
            vec![Turn::new(Some("Pro".into()), "Ye")]
        );

        // The reconnect succeeds and the lost reply is not replayed.
        assert!(
            tokio::time::timeout(Duration::from_secs(5), session.wait_until_connected())
                .await
                .unwrap()
        );
        assert!(session.snapshot().interrupted);
        session.close();
    }

    #[tokio::test]
    async fn dual_channel_session_over_network() {
        let router = Router::new()
            .route("/ws", get(pro_ws))
            .route("/chat", post(con_stream));
        let addr = serve(router).await;

        let config = SessionConfig {
            channels: vec![
                ChannelConfig::new(format!("ws://{addr}/ws"), TransportKind::Websocket),
                ChannelConfig::new(format!("http://{addr}/chat"), TransportKind::HttpStream),
            ],
            ..Default::default()
        };
        let mut session = SessionCoordinator::new(config, NetworkTransport::new()).unwrap();
        session.open();

        let connected = tokio::time::timeout(Duration::from_secs(5), session.wait_until_connected())
            .await
            .unwrap();
        assert!(connected);

        session.submit(PromptPayload::new("Is AI conscious?")).unwrap();
        let snapshot = tokio::time::timeout(Duration::from_secs(5), session.run_until_settled())
            .await
            .unwrap();

        assert!(snapshot.done);
        assert!(!snapshot.disconnected);
        assert_eq!(
            snapshot.turns(),
            vec![
                vec![Turn::new(Some("Pro".into()), "Yes!")],
                vec![Turn::new(Some("Con".into()), "No")],
            ]
        );
        session.close();
    }
}
