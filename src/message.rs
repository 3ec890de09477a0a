//! Chat messages as stored in the session and sent over the wire.

use serde::{Deserialize, Serialize};

use crate::emotion::EmotionVector;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Character,
}

/// A single entry of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message text.
    pub content: String,
    /// Author of the message.
    pub author: Author,
    /// Emotion scores; only character messages carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<EmotionVector>,
    /// Position in the conversation, starting at 0.
    pub sequence: u64,
}

impl Message {
    /// A user-authored message.
    pub fn user(content: impl Into<String>, sequence: u64) -> Self {
        Self {
            content: content.into(),
            author: Author::User,
            emotion: None,
            sequence,
        }
    }

    /// A character-authored message; the emotion is clamped into range.
    pub fn character(content: impl Into<String>, emotion: EmotionVector, sequence: u64) -> Self {
        Self {
            content: content.into(),
            author: Author::Character,
            emotion: Some(emotion.clamped()),
            sequence,
        }
    }

    pub fn is_user(&self) -> bool {
        self.author == Author::User
    }
}

/// History entry as sent with every `/chat` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub content: String,
    pub is_user: bool,
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self {
            content: message.content.clone(),
            is_user: message.is_user(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_serializes_without_emotion() {
        let json = serde_json::to_value(Message::user("Hello", 0)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"content": "Hello", "author": "user", "sequence": 0})
        );
    }

    #[test]
    fn test_character_message_clamps_emotion() {
        let m = Message::character("Grr", EmotionVector { anger: 9.0, sadness: 0.0, joy: 0.0 }, 3);
        assert_eq!(m.emotion, Some(EmotionVector::new(5.0, 0.0, 0.0)));
        assert!(!m.is_user());
    }

    #[test]
    fn test_history_entry_from_message() {
        let entry = HistoryEntry::from(&Message::user("Hi", 0));
        assert_eq!(entry, HistoryEntry { content: "Hi".into(), is_user: true });
    }
}
