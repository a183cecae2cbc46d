//! Speaker-attributed turns.

use serde::{Deserialize, Serialize};

/// One contiguous, speaker-attributed block of generated text.
///
/// `speaker` is `None` when the backend streams plain text without
/// attribution; consecutive unattributed frames belong to the same turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Option<String>,
    pub text: String,
}

impl Turn {
    pub fn new(speaker: Option<String>, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }

    /// Display label for the speaker (`"?"` when unattributed).
    pub fn speaker_label(&self) -> &str {
        self.speaker.as_deref().unwrap_or("?")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speaker_label_falls_back_for_unattributed_turns() {
        assert_eq!(Turn::new(None, "x").speaker_label(), "?");
        assert_eq!(Turn::new(Some("Socrates".into()), "x").speaker_label(), "Socrates");
    }

    #[test]
    fn turn_roundtrips_through_json() {
        let turn = Turn::new(Some("Plato".into()), "forms ");
        let json = serde_json::to_string(&turn).unwrap();
        let back: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, turn);
        assert!(back.text.ends_with(' '));
    }
}
