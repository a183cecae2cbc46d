//! Streaming HTTP transport over `reqwest`.
//!
//! There is no persistent connection: `open` validates the endpoint and
//! reports `Ready` right away, so the channel accepts sends. Every send
//! POSTs the message as JSON. A 2xx status reports `Opened` (the backend
//! answered, which restores the retry budget) and the body is forwarded
//! chunk by chunk, followed by an end-of-stream marker. Any other status or
//! a transport error reports an unclean `Closed`. A new send cancels the
//! request still in flight, if any.

use std::sync::Mutex;

use futures_util::StreamExt;
use reqwest::Url;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use colloquy_core::transport::{EventSink, Link, Transport};
use colloquy_types::config::{ChannelConfig, ReconnectConfig};
use colloquy_types::error::ConnectionError;
use colloquy_types::frame::RawInput;
use colloquy_types::message::OutboundMessage;

#[derive(Debug, Clone, Copy, Default)]
pub struct HttpStreamTransport;

impl HttpStreamTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for HttpStreamTransport {
    fn open(
        &self,
        channel: &ChannelConfig,
        reconnect: &ReconnectConfig,
        sink: EventSink,
    ) -> Result<Box<dyn Link>, ConnectionError> {
        let endpoint = parse_endpoint(&channel.endpoint)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ConnectionError::Socket(e.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(reconnect.connect_timeout())
            .build()
            .map_err(|e| ConnectionError::Handshake {
                endpoint: channel.endpoint.clone(),
                reason: e.to_string(),
            })?;

        sink.ready();
        Ok(Box::new(HttpStreamLink {
            client,
            endpoint,
            sink,
            runtime,
            in_flight: Mutex::new(None),
        }))
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ConnectionError> {
    let url = Url::parse(endpoint).map_err(|e| ConnectionError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConnectionError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

struct HttpStreamLink {
    client: reqwest::Client,
    endpoint: Url,
    sink: EventSink,
    runtime: tokio::runtime::Handle,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl HttpStreamLink {
    fn replace_in_flight(&self, next: Option<CancellationToken>) {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = in_flight.take() {
            previous.cancel();
        }
        *in_flight = next;
    }
}

impl Link for HttpStreamLink {
    fn send(&self, message: &OutboundMessage) -> Result<(), ConnectionError> {
        let cancel = CancellationToken::new();
        self.replace_in_flight(Some(cancel.clone()));
        self.runtime.spawn(stream_response(
            self.client.clone(),
            self.endpoint.clone(),
            message.to_json_body(),
            self.sink.clone(),
            cancel,
        ));
        Ok(())
    }

    fn close(&mut self) {
        self.replace_in_flight(None);
    }
}

impl Drop for HttpStreamLink {
    fn drop(&mut self) {
        self.replace_in_flight(None);
    }
}

async fn stream_response(
    client: reqwest::Client,
    endpoint: Url,
    body: Value,
    sink: EventSink,
    cancel: CancellationToken,
) {
    let request = client.post(endpoint.clone()).json(&body).send();
    let response = tokio::select! {
        _ = cancel.cancelled() => return,
        result = request => result,
    };

    let response = match response {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            let err = ConnectionError::Http {
                status: response.status().as_u16(),
            };
            tracing::warn!(channel = %sink.channel(), %endpoint, "{err}");
            sink.closed(false);
            return;
        }
        Err(e) => {
            tracing::warn!(channel = %sink.channel(), %endpoint, error = %e, "stream request failed");
            sink.closed(false);
            return;
        }
    };

    // Repeats on later requests are ignored by the lifecycle.
    sink.opened();
    let mut chunks = response.bytes_stream();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            chunk = chunks.next() => match chunk {
                Some(Ok(bytes)) => sink.frame(RawInput::Chunk(bytes.to_vec())),
                Some(Err(e)) => {
                    tracing::warn!(channel = %sink.channel(), error = %e, "response body read failed");
                    sink.closed(false);
                    return;
                }
                None => {
                    sink.frame(RawInput::EndOfStream);
                    return;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use axum::http::{StatusCode, header};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::sync::mpsc;

    use colloquy_core::transport::{SessionEvent, SessionEventKind, TransportEvent};
    use colloquy_types::channel::ChannelId;
    use colloquy_types::config::TransportKind;
    use colloquy_types::message::{ControlToken, PromptPayload};

    use super::*;

    async fn serve(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    async fn chat(Json(body): Json<Value>) -> impl IntoResponse {
        let prompt = body["prompt"].as_str().unwrap_or("none").to_string();
        let stream = format!("data: {prompt}\n\n: keep-alive\ndata: [DONE]\n\n");
        ([(header::CONTENT_TYPE, "text/event-stream")], stream)
    }

    async fn broken() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn channel(endpoint: String) -> ChannelConfig {
        ChannelConfig::new(endpoint, TransportKind::HttpStream)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> TransportEvent {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for transport event")
            .expect("event channel closed");
        match event.kind {
            SessionEventKind::Transport(event) => event,
            other => panic!("unexpected event: {other:?}"),
        }
    }

    /// Collect chunk bytes until the end-of-stream marker.
    async fn body(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> String {
        let mut bytes = Vec::new();
        loop {
            match next(rx).await {
                TransportEvent::Frame(RawInput::Chunk(chunk)) => bytes.extend(chunk),
                TransportEvent::Frame(RawInput::EndOfStream) => break,
                other => panic!("unexpected event: {other:?}"),
            }
        }
        String::from_utf8(bytes).unwrap()
    }

    #[tokio::test]
    async fn ready_at_once_and_opened_on_success() {
        let addr = serve(Router::new().route("/chat", post(chat))).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let link = HttpStreamTransport::new()
            .open(
                &channel(format!("http://{addr}/chat")),
                &ReconnectConfig::default(),
                EventSink::new(ChannelId(0), 1, tx),
            )
            .unwrap();
        assert_eq!(next(&mut rx).await, TransportEvent::Ready);

        link.send(&OutboundMessage::Prompt(PromptPayload::new("Explain AI")))
            .unwrap();
        assert_eq!(next(&mut rx).await, TransportEvent::Opened);
        assert_eq!(
            body(&mut rx).await,
            "data: Explain AI\n\n: keep-alive\ndata: [DONE]\n\n"
        );
    }

    #[tokio::test]
    async fn control_tokens_are_posted_as_json() {
        let addr = serve(Router::new().route("/chat", post(chat))).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let link = HttpStreamTransport::new()
            .open(
                &channel(format!("http://{addr}/chat")),
                &ReconnectConfig::default(),
                EventSink::new(ChannelId(0), 1, tx),
            )
            .unwrap();
        next(&mut rx).await;

        link.send(&OutboundMessage::Control(ControlToken::Next)).unwrap();
        assert_eq!(next(&mut rx).await, TransportEvent::Opened);
        assert!(body(&mut rx).await.starts_with("data: none\n"));
    }

    #[tokio::test]
    async fn error_status_reports_unclean_closure() {
        let addr = serve(Router::new().route("/chat", post(broken))).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let link = HttpStreamTransport::new()
            .open(
                &channel(format!("http://{addr}/chat")),
                &ReconnectConfig::default(),
                EventSink::new(ChannelId(0), 1, tx),
            )
            .unwrap();
        assert_eq!(next(&mut rx).await, TransportEvent::Ready);

        // Never confirmed: no `Opened` before the closure.
        link.send(&OutboundMessage::Prompt(PromptPayload::new("q"))).unwrap();
        assert_eq!(next(&mut rx).await, TransportEvent::Closed { was_clean: false });
    }

    #[test]
    fn rejects_non_http_endpoint() {
        assert!(matches!(
            parse_endpoint("ws://localhost:8000/ws"),
            Err(ConnectionError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            parse_endpoint("not a url"),
            Err(ConnectionError::InvalidEndpoint { .. })
        ));
        assert!(parse_endpoint("https://example.com/stream").is_ok());
    }
}
