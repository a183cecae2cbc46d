//! Raw payload classification.
//!
//! Normalises every backend payload shape into a [`Frame`]:
//!
//! | Payload | Frame |
//! |---|---|
//! | exactly a configured sentinel literal | `Sentinel { Done }` |
//! | JSON object with speaker + text fields (`{name, chunk}`, `{name, response}`) | `Content { Some(speaker), text }` |
//! | anything starting with `{` that is not such an object | `Malformed` |
//! | any other text | `Content { None, text }` |

use serde_json::{Map, Value};

use colloquy_types::config::ProtocolConfig;
use colloquy_types::error::FrameParseError;
use colloquy_types::frame::Frame;

/// Stateless payload classifier built from the protocol configuration.
#[derive(Debug, Clone)]
pub struct FrameClassifier {
    sentinels: Vec<String>,
    speaker_fields: Vec<String>,
    text_fields: Vec<String>,
}

impl FrameClassifier {
    pub fn new(protocol: &ProtocolConfig) -> Self {
        Self {
            sentinels: protocol.sentinels.clone(),
            speaker_fields: protocol.speaker_fields.clone(),
            text_fields: protocol.text_fields.clone(),
        }
    }

    /// Classify one raw payload.
    pub fn classify(&self, payload: &str) -> Frame {
        if self.sentinels.iter().any(|s| s == payload) {
            return Frame::done();
        }

        if !payload.trim_start().starts_with('{') {
            return Frame::Content {
                speaker: None,
                text: payload.to_string(),
            };
        }

        match self.parse_structured(payload) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!(error = %err, "dropping malformed payload");
                Frame::Malformed {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn parse_structured(&self, payload: &str) -> Result<Frame, FrameParseError> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| FrameParseError::InvalidJson(e.to_string()))?;
        let Value::Object(object) = value else {
            return Err(FrameParseError::NotAnObject);
        };

        let speaker = first_string(&object, &self.speaker_fields)
            .ok_or(FrameParseError::MissingField("speaker"))?;
        let text = first_string(&object, &self.text_fields)
            .ok_or(FrameParseError::MissingField("text"))?;

        Ok(Frame::Content {
            speaker: Some(speaker.to_string()),
            text: text.to_string(),
        })
    }
}

impl Default for FrameClassifier {
    fn default() -> Self {
        Self::new(&ProtocolConfig::default())
    }
}

/// First key in `keys` whose value is a JSON string.
fn first_string<'a>(object: &'a Map<String, Value>, keys: &[String]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| object.get(key.as_str()).and_then(Value::as_str))
}
