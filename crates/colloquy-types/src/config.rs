//! Session configuration types for Colloquy.
//!
//! `SessionConfig` represents the top-level `colloquy.toml`: the channels to
//! open, the wire protocol details (sentinels, field names) and the reconnect
//! policy. All fields have defaults matching the observed backends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Top-level configuration for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub protocol: ProtocolConfig,

    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// One entry per backend endpoint. A session binds one or two.
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

/// Wire details shared by every channel of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Literal payloads that mark the end of a generation.
    ///
    /// Backend revisions disagree on the literal, so every observed variant
    /// is accepted by default.
    #[serde(default = "default_sentinels")]
    pub sentinels: Vec<String>,

    /// Line prefix carrying a payload in stream mode.
    #[serde(default = "default_data_prefix")]
    pub data_prefix: String,

    /// JSON keys tried, in order, for the speaker identity.
    #[serde(default = "default_speaker_fields")]
    pub speaker_fields: Vec<String>,

    /// JSON keys tried, in order, for the text fragment.
    #[serde(default = "default_text_fields")]
    pub text_fields: Vec<String>,
}

fn default_sentinels() -> Vec<String> {
    vec![
        "[DONE]".to_string(),
        "<END_TOKEN_WEBSOCKET>".to_string(),
        "<END_WEBSOCKET_TOKEN>".to_string(),
    ]
}

fn default_data_prefix() -> String {
    "data: ".to_string()
}

fn default_speaker_fields() -> Vec<String> {
    vec!["name".to_string(), "speaker".to_string()]
}

fn default_text_fields() -> Vec<String> {
    vec![
        "chunk".to_string(),
        "response".to_string(),
        "text".to_string(),
    ]
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            sentinels: default_sentinels(),
            data_prefix: default_data_prefix(),
            speaker_fields: default_speaker_fields(),
            text_fields: default_text_fields(),
        }
    }
}

/// Bounded automatic-reconnect policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Give up after this many consecutive unexpected closures; a reconnect
    /// is scheduled only while the count is below this bound.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay before each reconnect attempt.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Handshake timeout for a single connection attempt.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    1_000
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl ReconnectConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_ms: default_delay_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// How a channel talks to its backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Persistent socket; one inbound message per frame.
    #[default]
    Websocket,
    /// Chunked HTTP response carrying `data: ` lines.
    HttpStream,
}

impl TransportKind {
    /// Whether inbound data arrives as an unframed byte stream.
    pub fn is_stream(self) -> bool {
        self == TransportKind::HttpStream
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Websocket => write!(f, "websocket"),
            TransportKind::HttpStream => write!(f, "http_stream"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "websocket" | "ws" => Ok(TransportKind::Websocket),
            "http_stream" | "http" | "sse" => Ok(TransportKind::HttpStream),
            other => Err(format!("invalid transport: '{other}'")),
        }
    }
}

/// One backend endpoint bound to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub endpoint: String,

    #[serde(default)]
    pub transport: TransportKind,

    /// Send `start` after every successful open.
    #[serde(default)]
    pub auto_start: bool,

    /// Send `continue` after every sentinel.
    #[serde(default)]
    pub auto_continue: bool,
}

impl ChannelConfig {
    pub fn new(endpoint: impl Into<String>, transport: TransportKind) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
            auto_start: false,
            auto_continue: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_default_values() {
        let config = SessionConfig::default();
        assert!(config.channels.is_empty());
        assert_eq!(config.reconnect.max_retries, 3);
        assert_eq!(config.reconnect.delay(), Duration::from_secs(1));
        assert_eq!(config.protocol.data_prefix, "data: ");
        assert_eq!(config.protocol.sentinels.len(), 3);
    }

    #[test]
    fn session_config_deserialize_with_defaults() {
        let config: SessionConfig = toml::from_str("").unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn session_config_deserialize_with_values() {
        let toml_str = r#"
[protocol]
sentinels = ["<END_TOKEN_WEBSOCKET>"]

[reconnect]
max_retries = 5
delay_ms = 250

[[channels]]
endpoint = "ws://localhost:8000/ws"
auto_start = true

[[channels]]
endpoint = "http://localhost:8000/stream"
transport = "http_stream"
"#;
        let config: SessionConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.protocol.sentinels, vec!["<END_TOKEN_WEBSOCKET>"]);
        // Unset protocol fields keep their defaults.
        assert_eq!(config.protocol.text_fields, default_text_fields());
        assert_eq!(config.reconnect.max_retries, 5);
        assert_eq!(config.reconnect.delay(), Duration::from_millis(250));
        assert_eq!(config.reconnect.connect_timeout_secs, 10);
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.channels[0].transport, TransportKind::Websocket);
        assert!(config.channels[0].auto_start);
        assert!(!config.channels[0].auto_continue);
        assert_eq!(config.channels[1].transport, TransportKind::HttpStream);
    }

    #[test]
    fn transport_kind_from_str_aliases() {
        assert_eq!("ws".parse::<TransportKind>().unwrap(), TransportKind::Websocket);
        assert_eq!(
            "http-stream".parse::<TransportKind>().unwrap(),
            TransportKind::HttpStream
        );
        assert_eq!("SSE".parse::<TransportKind>().unwrap(), TransportKind::HttpStream);
        assert!("grpc".parse::<TransportKind>().is_err());
    }

    #[test]
    fn transport_kind_is_stream() {
        assert!(TransportKind::HttpStream.is_stream());
        assert!(!TransportKind::Websocket.is_stream());
    }
}
