//! Durable snapshot/restore of the conversation session.
//!
//! The session is written under a fixed namespace of keys:
//!
//! | key                     | value                                   |
//! |-------------------------|-----------------------------------------|
//! | `chatHistory`           | JSON array of messages                  |
//! | `characters`            | JSON array of characters                |
//! | `selectedCharacter`     | raw id string, empty string for "none"  |
//! | `personalityParameters` | JSON object with the six sliders        |
//!
//! [`PersistenceStore`] is the only type that touches a [`KeyValueStore`].
//! A save serializes every value before the backend is touched, and the
//! backend writes the whole batch or nothing.

pub mod file;
pub mod memory;
pub mod sqlite;

use std::fmt;

use crate::character::Character;
use crate::error::{ChatError, StorageError};
use crate::message::Message;
use crate::parameters::PersonalityParameters;
use crate::session::ConversationSession;

pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;

/// Key holding the serialized message list.
pub const CHAT_HISTORY_KEY: &str = "chatHistory";
/// Key holding the serialized character list.
pub const CHARACTERS_KEY: &str = "characters";
/// Key holding the selected character id.
pub const SELECTED_CHARACTER_KEY: &str = "selectedCharacter";
/// Key holding the slider snapshot.
pub const PARAMETERS_KEY: &str = "personalityParameters";

/// A durable string-to-string store.
///
/// Implementations must make `write_batch` all-or-nothing: after a failed
/// call the previously stored values are still readable.
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store every `(key, value)` pair atomically.
    fn write_batch(&self, entries: &[(&str, String)]) -> Result<(), StorageError>;
}

/// Serialize a session into its key namespace.
///
/// Fails before producing any entry if a value cannot be serialized.
pub fn snapshot_entries(
    session: &ConversationSession,
) -> Result<Vec<(&'static str, String)>, StorageError> {
    let messages = serde_json::to_string(&session.messages)?;
    let characters = serde_json::to_string(&session.characters)?;
    let parameters = serde_json::to_string(&session.parameters)?;
    let selected = session.selected_character_id.clone().unwrap_or_default();

    Ok(vec![
        (CHAT_HISTORY_KEY, messages),
        (CHARACTERS_KEY, characters),
        (SELECTED_CHARACTER_KEY, selected),
        (PARAMETERS_KEY, parameters),
    ])
}

/// Saves and restores [`ConversationSession`] snapshots.
#[derive(Debug)]
pub struct PersistenceStore {
    backend: Box<dyn KeyValueStore>,
}

impl PersistenceStore {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Persist the full session.
    pub fn save(&self, session: &ConversationSession) -> Result<(), StorageError> {
        let entries = snapshot_entries(session)?;
        self.backend.write_batch(&entries)?;
        log::debug!(
            "session saved: {} messages, {} characters",
            session.messages.len(),
            session.characters.len()
        );
        Ok(())
    }

    /// Restore the session, degrading to an empty one on any failure.
    pub fn load(&self) -> ConversationSession {
        match self.try_load() {
            Ok(session) => session,
            Err(e) => {
                log::warn!("discarding persisted session: {}", e);
                ConversationSession::default()
            }
        }
    }

    /// Restore the session, reporting why a stored snapshot was rejected.
    ///
    /// Absent keys fall back to their empty defaults.
    pub fn try_load(&self) -> Result<ConversationSession, ChatError> {
        let messages: Vec<Message> = self.read_json(CHAT_HISTORY_KEY)?.unwrap_or_default();
        let characters: Vec<Character> = self.read_json(CHARACTERS_KEY)?.unwrap_or_default();
        let parameters: PersonalityParameters = self.read_json(PARAMETERS_KEY)?.unwrap_or_default();
        let selected_character_id = self
            .backend
            .get(SELECTED_CHARACTER_KEY)?
            .filter(|id| !id.is_empty());

        let session = ConversationSession {
            messages,
            characters,
            selected_character_id,
            parameters,
        };
        session
            .validate()
            .map_err(|detail| ChatError::CorruptPersistedState { detail })?;
        Ok(session)
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ChatError> {
        let Some(raw) = self.backend.get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| ChatError::CorruptPersistedState {
                detail: format!("{}: {}", key, e),
            })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::EmotionVector;
    use crate::parameters::ParameterName;

    fn populated_session() -> ConversationSession {
        let mut session = ConversationSession::new();
        session.characters = vec![
            Character::new("1", "Elizabeth", "witty, proud"),
            Character::new("3", "Darcy", "reserved"),
        ];
        session.selected_character_id = Some("3".into());
        session.messages = vec![
            Message::user("Hello", 0),
            Message::character("Hi!", EmotionVector::new(0.0, 0.0, 2.5), 1),
            Message::user("Unanswered", 2),
        ];
        session.parameters = PersonalityParameters::default()
            .with(ParameterName::Valence, 6.2)
            .with(ParameterName::SecuringRate, 1.1);
        session
    }

    fn memory_store() -> (PersistenceStore, MemoryKeyValueStore) {
        let backend = MemoryKeyValueStore::new();
        (PersistenceStore::new(Box::new(backend.clone())), backend)
    }

    #[test]
    fn test_round_trip() {
        let (store, _) = memory_store();
        let session = populated_session();
        store.save(&session).unwrap();
        assert_eq!(store.load(), session);
    }

    #[test]
    fn test_round_trip_is_byte_stable() {
        let (store, backend) = memory_store();
        store.save(&populated_session()).unwrap();
        let first = backend.entries();

        let reloaded = store.load();
        store.save(&reloaded).unwrap();
        assert_eq!(backend.entries(), first);
    }

    #[test]
    fn test_empty_store_loads_empty_session() {
        let (store, _) = memory_store();
        assert_eq!(store.load(), ConversationSession::default());
    }

    #[test]
    fn test_storage_layout() {
        let (store, backend) = memory_store();
        let mut session = populated_session();
        session.selected_character_id = None;
        store.save(&session).unwrap();

        assert_eq!(backend.get(SELECTED_CHARACTER_KEY).unwrap().as_deref(), Some(""));
        let history: serde_json::Value =
            serde_json::from_str(&backend.get(CHAT_HISTORY_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(history[0]["content"], "Hello");
        assert_eq!(history[1]["emotion"]["joy"], 2.5);
    }

    #[test]
    fn test_non_json_value_degrades_to_empty_session() {
        let (store, backend) = memory_store();
        store.save(&populated_session()).unwrap();
        backend
            .write_batch(&[(CHAT_HISTORY_KEY, "not json {".to_string())])
            .unwrap();

        let err = store.try_load().unwrap_err();
        assert!(matches!(err, ChatError::CorruptPersistedState { .. }));
        assert_eq!(store.load(), ConversationSession::default());
    }

    #[test]
    fn test_invariant_violation_degrades_to_empty_session() {
        let (store, backend) = memory_store();
        store.save(&populated_session()).unwrap();
        backend
            .write_batch(&[(SELECTED_CHARACTER_KEY, "99".to_string())])
            .unwrap();
        assert_eq!(store.load(), ConversationSession::default());
    }

    #[test]
    fn test_missing_parameters_key_uses_defaults() {
        let (store, backend) = memory_store();
        backend
            .write_batch(&[
                (CHAT_HISTORY_KEY, "[]".to_string()),
                (CHARACTERS_KEY, r#"[{"id":"1","name":"Jane","traits":"kind"}]"#.to_string()),
                (SELECTED_CHARACTER_KEY, "1".to_string()),
            ])
            .unwrap();

        let session = store.try_load().unwrap();
        assert_eq!(session.parameters, PersonalityParameters::default());
        assert_eq!(session.selected_character_id.as_deref(), Some("1"));
    }
}
