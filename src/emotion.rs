//! Emotion vectors and the current-emotion projection.
//!
//! Character replies carry `{anger, sadness, joy}` on a 0–5 scale. The
//! "current emotion" shown next to the chat is whatever the most recent
//! character message carried.

use serde::{Deserialize, Serialize};

use crate::message::{Author, Message};
use crate::session::ConversationSession;

/// Upper bound of every emotion component.
pub const EMOTION_MAX: f64 = 5.0;

/// Components above this value are rendered highlighted.
pub const EMOTION_HIGHLIGHT_THRESHOLD: f64 = 3.0;

/// One of the three tracked emotions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmotionKind {
    Anger,
    Sadness,
    Joy,
}

impl EmotionKind {
    pub const ALL: [EmotionKind; 3] = [Self::Anger, Self::Sadness, Self::Joy];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Anger => "Anger",
            Self::Sadness => "Sadness",
            Self::Joy => "Joy",
        }
    }
}

/// Clamp a raw component into `[0, EMOTION_MAX]`; NaN becomes 0.
pub fn clamp_emotion(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, EMOTION_MAX)
    }
}

/// `{anger, sadness, joy}` attached to a character message.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmotionVector {
    #[serde(default)]
    pub anger: f64,
    #[serde(default)]
    pub sadness: f64,
    #[serde(default)]
    pub joy: f64,
}

impl EmotionVector {
    /// Build a vector, clamping every component into range.
    pub fn new(anger: f64, sadness: f64, joy: f64) -> Self {
        Self {
            anger: clamp_emotion(anger),
            sadness: clamp_emotion(sadness),
            joy: clamp_emotion(joy),
        }
    }

    /// `{0, 0, 0}`.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Copy of `self` with every component clamped.
    pub fn clamped(&self) -> Self {
        Self::new(self.anger, self.sadness, self.joy)
    }

    /// Whether every component already lies in `[0, EMOTION_MAX]`.
    pub fn is_within_bounds(&self) -> bool {
        [self.anger, self.sadness, self.joy]
            .iter()
            .all(|v| (0.0..=EMOTION_MAX).contains(v))
    }

    pub fn get(&self, kind: EmotionKind) -> f64 {
        match kind {
            EmotionKind::Anger => self.anger,
            EmotionKind::Sadness => self.sadness,
            EmotionKind::Joy => self.joy,
        }
    }
}

/// Derives the display emotion from a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmotionStateProjector;

impl EmotionStateProjector {
    pub fn new() -> Self {
        Self
    }

    /// Emotion of the latest character message, or the zero vector.
    pub fn project(&self, session: &ConversationSession) -> EmotionVector {
        project_messages(&session.messages)
    }
}

/// Backward scan for the most recent character-authored message.
pub fn project_messages(messages: &[Message]) -> EmotionVector {
    messages
        .iter()
        .rev()
        .find(|m| m.author == Author::Character)
        .map(|m| m.emotion.unwrap_or_default().clamped())
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_components() {
        let v = EmotionVector::new(-1.0, 7.5, f64::NAN);
        assert_eq!(v, EmotionVector::new(0.0, 5.0, 0.0));
        assert!(v.is_within_bounds());
        assert!(!EmotionVector { anger: 6.0, sadness: 0.0, joy: 0.0 }.is_within_bounds());
    }

    #[test]
    fn test_project_empty_history_is_zero() {
        assert_eq!(project_messages(&[]), EmotionVector::zero());
    }

    #[test]
    fn test_project_skips_trailing_user_messages() {
        let messages = vec![
            Message::user("Hello", 0),
            Message::character("Hi!", EmotionVector::new(1.0, 0.0, 2.5), 1),
            Message::user("How are you?", 2),
        ];
        assert_eq!(project_messages(&messages), EmotionVector::new(1.0, 0.0, 2.5));
    }

    #[test]
    fn test_project_uses_latest_character_message() {
        let messages = vec![
            Message::character("First", EmotionVector::new(5.0, 5.0, 5.0), 0),
            Message::user("...", 1),
            Message::character("Second", EmotionVector::new(0.0, 1.0, 0.0), 2),
        ];
        assert_eq!(project_messages(&messages), EmotionVector::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_project_only_user_messages_is_zero() {
        let mut session = ConversationSession::default();
        session.messages.push(Message::user("anyone there?", 0));
        assert_eq!(EmotionStateProjector::new().project(&session), EmotionVector::zero());
    }

    #[test]
    fn test_missing_components_deserialize_as_zero() {
        let v: EmotionVector = serde_json::from_str(r#"{"joy": 3}"#).unwrap();
        assert_eq!(v, EmotionVector::new(0.0, 0.0, 3.0));
    }
}
