//! Extracted characters and the active selection.
//!
//! Characters come from the extraction service once per book and are never
//! edited afterwards. Exactly one of them may be selected; sending is gated
//! on that selection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChatError;
use crate::session::ConversationSession;

/// A persona the user can chat with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Opaque identifier, echoed as `character_id` in chat requests.
    pub id: String,
    pub name: String,
    pub traits: String,
}

impl Character {
    pub fn new(id: impl Into<String>, name: impl Into<String>, traits: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            traits: traits.into(),
        }
    }

    /// First comma-separated trait, used as a short tag.
    pub fn primary_trait(&self) -> &str {
        self.traits.split(',').next().unwrap_or_default().trim()
    }
}

/// One entry of an `/extract_characters` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractedCharacter {
    pub name: String,
    #[serde(default)]
    pub traits: String,
    /// Server-side id, when the service reports one (string or number).
    #[serde(default)]
    pub id: Option<Value>,
}

impl ExtractedCharacter {
    fn server_id(&self) -> Option<String> {
        match &self.id {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Turn an extraction result into characters.
///
/// With `discard_header` the first entry is dropped (the multipart flow
/// reports the book title as its first "character"). Server ids are kept
/// when every remaining entry carries a distinct one; otherwise ids `"1"`,
/// `"2"`, ... are assigned in list order.
pub fn assign_ids(extracted: Vec<ExtractedCharacter>, discard_header: bool) -> Vec<Character> {
    let skip = usize::from(discard_header);
    let entries: Vec<ExtractedCharacter> = extracted.into_iter().skip(skip).collect();

    let server_ids: Vec<String> = entries.iter().filter_map(|c| c.server_id()).collect();
    let mut unique = server_ids.clone();
    unique.sort();
    unique.dedup();
    let use_server_ids = server_ids.len() == entries.len() && unique.len() == server_ids.len();

    entries
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let id = if use_server_ids {
                c.server_id().unwrap_or_else(|| (i + 1).to_string())
            } else {
                (i + 1).to_string()
            };
            Character::new(id, c.name.trim(), c.traits.trim())
        })
        .collect()
}

/// Validates and applies character selection on a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharacterSelectionManager;

impl CharacterSelectionManager {
    pub fn new() -> Self {
        Self
    }

    /// Select `id`, or fail with `UnknownCharacterId` leaving the session untouched.
    pub fn select(&self, session: &mut ConversationSession, id: &str) -> Result<(), ChatError> {
        let id = id.trim();
        if session.find_character(id).is_none() {
            return Err(ChatError::UnknownCharacterId { id: id.to_string() });
        }
        session.selected_character_id = Some(id.to_string());
        Ok(())
    }

    /// The selected character; `NoCharacterSelected` when nothing resolves.
    pub fn require_selection<'a>(
        &self,
        session: &'a ConversationSession,
    ) -> Result<&'a Character, ChatError> {
        session
            .selected_character_id
            .as_deref()
            .and_then(|id| session.find_character(id))
            .ok_or(ChatError::NoCharacterSelected)
    }

    /// Replace the character list, keeping the selection only if it still resolves.
    pub fn replace_characters(&self, session: &mut ConversationSession, characters: Vec<Character>) {
        session.characters = characters;
        let still_present = session
            .selected_character_id
            .as_deref()
            .is_some_and(|id| session.find_character(id).is_some());
        if !still_present {
            session.selected_character_id = None;
        }
    }

    /// Display name of the selection.
    pub fn selected_name(&self, session: &ConversationSession) -> String {
        match session.selected_character_id.as_deref() {
            None => "No character selected".to_string(),
            Some(id) => session
                .find_character(id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "Unknown character".to_string()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted(name: &str, traits: &str, id: Option<Value>) -> ExtractedCharacter {
        ExtractedCharacter {
            name: name.into(),
            traits: traits.into(),
            id,
        }
    }

    fn session_with_cast() -> ConversationSession {
        let mut session = ConversationSession::default();
        session.characters = vec![
            Character::new("1", "Elizabeth Bennet", "witty, proud"),
            Character::new("3", "Mr. Darcy", "reserved, honest"),
        ];
        session
    }

    #[test]
    fn test_select_known_character() {
        let mut session = session_with_cast();
        let manager = CharacterSelectionManager::new();
        manager.select(&mut session, "3").unwrap();
        assert_eq!(session.selected_character_id.as_deref(), Some("3"));
        assert_eq!(manager.require_selection(&session).unwrap().name, "Mr. Darcy");
    }

    #[test]
    fn test_select_unknown_character_leaves_state() {
        let mut session = session_with_cast();
        let manager = CharacterSelectionManager::new();
        manager.select(&mut session, "1").unwrap();

        let err = manager.select(&mut session, "99").unwrap_err();
        assert!(matches!(err, ChatError::UnknownCharacterId { ref id } if id == "99"));
        assert_eq!(session.selected_character_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_require_selection_without_selection() {
        let session = session_with_cast();
        let err = CharacterSelectionManager::new()
            .require_selection(&session)
            .unwrap_err();
        assert!(matches!(err, ChatError::NoCharacterSelected));
    }

    #[test]
    fn test_replace_characters_clears_dangling_selection() {
        let mut session = session_with_cast();
        let manager = CharacterSelectionManager::new();
        manager.select(&mut session, "3").unwrap();

        manager.replace_characters(&mut session, vec![Character::new("3", "Darcy", "proud")]);
        assert_eq!(session.selected_character_id.as_deref(), Some("3"));

        manager.replace_characters(&mut session, vec![Character::new("1", "Jane", "kind")]);
        assert!(session.selected_character_id.is_none());
    }

    #[test]
    fn test_assign_ids_discards_header_and_numbers_locally() {
        let list = vec![
            extracted("Pride and Prejudice", "a novel", None),
            extracted("Elizabeth", "witty", None),
            extracted("Darcy", "proud", None),
        ];
        let characters = assign_ids(list, true);
        assert_eq!(characters.len(), 2);
        assert_eq!(characters[0], Character::new("1", "Elizabeth", "witty"));
        assert_eq!(characters[1], Character::new("2", "Darcy", "proud"));
    }

    #[test]
    fn test_assign_ids_keeps_server_ids() {
        let list = vec![
            extracted("Elizabeth", "witty", Some(serde_json::json!(17))),
            extracted("Darcy", "proud", Some(serde_json::json!("18"))),
        ];
        let characters = assign_ids(list, false);
        assert_eq!(characters[0].id, "17");
        assert_eq!(characters[1].id, "18");
    }

    #[test]
    fn test_assign_ids_falls_back_on_duplicate_server_ids() {
        let list = vec![
            extracted("A", "", Some(serde_json::json!(5))),
            extracted("B", "", Some(serde_json::json!(5))),
        ];
        let ids: Vec<String> = assign_ids(list, false).into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_selected_name_fallbacks() {
        let mut session = session_with_cast();
        let manager = CharacterSelectionManager::new();
        assert_eq!(manager.selected_name(&session), "No character selected");
        session.selected_character_id = Some("42".into());
        assert_eq!(manager.selected_name(&session), "Unknown character");
        manager.select(&mut session, "1").unwrap();
        assert_eq!(manager.selected_name(&session), "Elizabeth Bennet");
    }

    #[test]
    fn test_primary_trait() {
        let c = Character::new("1", "Darcy", " reserved , honest");
        assert_eq!(c.primary_trait(), "reserved");
    }
}
