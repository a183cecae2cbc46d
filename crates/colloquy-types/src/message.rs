//! Outbound messages the coordinator may send to a backend.
//!
//! Socket backends accept either a bare control token (`start`, `continue`,
//! `next`) or a JSON-encoded prompt object. Streaming HTTP backends receive
//! the same content as a JSON request body.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Bare control token that drives a socket backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlToken {
    /// Request the first result after connecting.
    Start,
    /// Request the next message after a sentinel.
    Continue,
    /// Run one more debate turn.
    Next,
}

impl ControlToken {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlToken::Start => "start",
            ControlToken::Continue => "continue",
            ControlToken::Next => "next",
        }
    }
}

impl fmt::Display for ControlToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "start" => Ok(ControlToken::Start),
            "continue" => Ok(ControlToken::Continue),
            "next" => Ok(ControlToken::Next),
            other => Err(format!("invalid control token: '{other}'")),
        }
    }
}

/// A user prompt plus optional structured fields.
///
/// Serializes as a flat JSON object: `{"prompt": "...", "topic": "...", ...}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptPayload {
    pub prompt: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PromptPayload {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            fields: Map::new(),
        }
    }

    /// Attach a structured field (e.g. `topic`, `name1`, `answer_length`).
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// A message the coordinator sends to every bound channel.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Prompt(PromptPayload),
    Control(ControlToken),
}

impl OutboundMessage {
    /// Wire text for message-oriented transports.
    ///
    /// Control tokens go out as bare literals, prompts as JSON.
    pub fn to_wire_text(&self) -> Result<String, serde_json::Error> {
        match self {
            OutboundMessage::Prompt(payload) => serde_json::to_string(payload),
            OutboundMessage::Control(token) => Ok(token.as_str().to_string()),
        }
    }

    /// JSON body for request/response transports.
    pub fn to_json_body(&self) -> Value {
        match self {
            OutboundMessage::Prompt(payload) => {
                serde_json::to_value(payload).unwrap_or_else(|_| Value::Object(Map::new()))
            }
            OutboundMessage::Control(token) => serde_json::json!({ "control": token.as_str() }),
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Prompt(_) => "prompt",
            OutboundMessage::Control(token) => token.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_payload_flattens_fields() {
        let payload = PromptPayload::new("Is free will real?")
            .with_field("topic", "free will")
            .with_field("answer_length", 200);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["prompt"], "Is free will real?");
        assert_eq!(json["topic"], "free will");
        assert_eq!(json["answer_length"], 200);
    }

    #[test]
    fn control_tokens_go_out_as_bare_literals() {
        let msg = OutboundMessage::Control(ControlToken::Next);
        assert_eq!(msg.to_wire_text().unwrap(), "next");
        assert_eq!(msg.kind(), "next");
    }

    #[test]
    fn prompt_goes_out_as_json_text() {
        let msg = OutboundMessage::Prompt(PromptPayload::new("hi"));
        assert_eq!(msg.to_wire_text().unwrap(), r#"{"prompt":"hi"}"#);
    }

    #[test]
    fn control_json_body() {
        let body = OutboundMessage::Control(ControlToken::Continue).to_json_body();
        assert_eq!(body["control"], "continue");
    }

    #[test]
    fn control_token_from_str() {
        assert_eq!("START".parse::<ControlToken>().unwrap(), ControlToken::Start);
        assert!("stop".parse::<ControlToken>().is_err());
    }
}
