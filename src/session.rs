//! The conversation session, the unit of persistence.

use serde::{Deserialize, Serialize};

use crate::character::Character;
use crate::message::{Author, HistoryEntry, Message};
use crate::parameters::PersonalityParameters;

/// Messages, characters, selection and sliders of one chat.
///
/// Invariants (checked by [`ConversationSession::validate`]):
/// - `messages[i].sequence == i`
/// - character emotions lie in `[0, 5]`; user messages carry none
/// - character ids are unique
/// - `selected_character_id`, if set, names one of `characters`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub messages: Vec<Message>,
    pub characters: Vec<Character>,
    pub selected_character_id: Option<String>,
    pub parameters: PersonalityParameters,
}

impl ConversationSession {
    /// An empty session with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next appended message receives.
    pub fn next_sequence(&self) -> u64 {
        self.messages.len() as u64
    }

    pub fn find_character(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    /// Message with the given sequence number.
    pub fn message_at(&self, sequence: u64) -> Option<&Message> {
        usize::try_from(sequence)
            .ok()
            .and_then(|i| self.messages.get(i))
    }

    /// History in the shape the inference service expects.
    pub fn history_entries(&self) -> Vec<HistoryEntry> {
        self.messages.iter().map(HistoryEntry::from).collect()
    }

    /// Check every session invariant, describing the first violation.
    pub fn validate(&self) -> Result<(), String> {
        for (i, message) in self.messages.iter().enumerate() {
            if message.sequence != i as u64 {
                return Err(format!(
                    "message at position {} has sequence {}",
                    i, message.sequence
                ));
            }
            match (message.author, message.emotion) {
                (Author::Character, Some(emotion)) if !emotion.is_within_bounds() => {
                    return Err(format!("message {} has out-of-range emotion", i));
                }
                (Author::User, Some(_)) => {
                    return Err(format!("user message {} carries an emotion", i));
                }
                _ => {}
            }
        }

        let mut ids: Vec<&str> = self.characters.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        if ids.windows(2).any(|w| w[0] == w[1]) {
            return Err("duplicate character id".to_string());
        }

        if let Some(id) = &self.selected_character_id {
            if self.find_character(id).is_none() {
                return Err(format!("selected character '{}' does not exist", id));
            }
        }
        Ok(())
    }
}
