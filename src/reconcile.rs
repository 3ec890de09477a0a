//! Reconciliation of `/chat` replies into the session history.
//!
//! The inference service answers in one of two shapes:
//!
//! ```text
//! Incremental   { "message": "...", "emotions": {anger, sadness, joy},
//!                 "parameters"?: {...}, "traits"?: "..." }
//! Authoritative { "history": [{content, is_user, anger?, sadness?, joy?}, ...],
//!                 "anger", "sadness", "joy" }
//! ```
//!
//! The shape is decided once, in [`ChatReply::from_value`]. A `history` list
//! always selects the authoritative contract; otherwise a `message` string
//! selects the incremental one. Nothing past that boundary inspects raw JSON.

use serde::Deserialize;
use serde_json::Value;

use crate::emotion::EmotionVector;
use crate::error::ChatError;
use crate::message::{Author, Message};
use crate::parameters::PersonalityParameters;
use crate::queue::PendingHandle;
use crate::session::ConversationSession;

/// A single new character message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IncrementalReply {
    pub message: String,
    pub emotions: EmotionVector,
    /// Parameters the service derived for this turn.
    #[serde(default)]
    pub parameters: Option<PersonalityParameters>,
    /// Traits of the character that answered.
    #[serde(default)]
    pub traits: Option<String>,
}

/// One entry of an authoritative history.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthoritativeEntry {
    pub content: String,
    pub is_user: bool,
    #[serde(default)]
    pub anger: Option<f64>,
    #[serde(default)]
    pub sadness: Option<f64>,
    #[serde(default)]
    pub joy: Option<f64>,
}

impl AuthoritativeEntry {
    fn into_message(self, sequence: u64) -> Message {
        if self.is_user {
            Message::user(self.content, sequence)
        } else {
            let emotion = EmotionVector::new(
                self.anger.unwrap_or_default(),
                self.sadness.unwrap_or_default(),
                self.joy.unwrap_or_default(),
            );
            Message::character(self.content, emotion, sequence)
        }
    }
}

/// The complete history, replacing the local one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthoritativeReply {
    pub history: Vec<AuthoritativeEntry>,
    #[serde(default)]
    pub anger: f64,
    #[serde(default)]
    pub sadness: f64,
    #[serde(default)]
    pub joy: f64,
}

/// A `/chat` reply with its contract resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatReply {
    Incremental(IncrementalReply),
    Authoritative(AuthoritativeReply),
}

impl ChatReply {
    /// Resolve the reply contract from a raw JSON body.
    pub fn from_value(value: Value) -> Result<Self, ChatError> {
        let Some(obj) = value.as_object() else {
            return Err(ChatError::unrecognized("reply is not a JSON object"));
        };

        if obj.get("history").is_some_and(Value::is_array) {
            return serde_json::from_value(value)
                .map(Self::Authoritative)
                .map_err(|e| ChatError::unrecognized(format!("authoritative reply: {}", e)));
        }

        if obj.get("message").is_some_and(Value::is_string) {
            return serde_json::from_value(value)
                .map(Self::Incremental)
                .map_err(|e| ChatError::unrecognized(format!("incremental reply: {}", e)));
        }

        Err(ChatError::unrecognized(
            "expected a `history` list or a `message` reply",
        ))
    }
}

/// What a reconciliation did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A character message was appended at `sequence`.
    Appended { sequence: u64 },
    /// The history was replaced with `len` messages.
    Replaced { len: usize },
    /// The reply had already been applied; nothing changed.
    AlreadyApplied,
}

/// Merges replies into the session history.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryReconciler;

impl HistoryReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Apply `reply` for the request identified by `handle`.
    ///
    /// Incremental replies are keyed on the pending user message: if the slot
    /// right after it already holds a character message, the reply was
    /// applied before and the session is left alone. Authoritative replies
    /// replace the list wholesale, which is idempotent on its own.
    pub fn reconcile(
        &self,
        session: &mut ConversationSession,
        handle: &PendingHandle,
        reply: &ChatReply,
    ) -> ReconcileOutcome {
        match reply {
            ChatReply::Incremental(reply) => {
                let reply_slot = handle.sequence + 1;
                let answered = session
                    .message_at(reply_slot)
                    .is_some_and(|m| m.author == Author::Character);
                if answered {
                    return ReconcileOutcome::AlreadyApplied;
                }
                let sequence = session.next_sequence();
                session
                    .messages
                    .push(Message::character(reply.message.clone(), reply.emotions, sequence));
                ReconcileOutcome::Appended { sequence }
            }
            ChatReply::Authoritative(reply) => {
                let messages: Vec<Message> = reply
                    .history
                    .iter()
                    .cloned()
                    .enumerate()
                    .map(|(i, entry)| entry.into_message(i as u64))
                    .collect();
                if messages == session.messages {
                    return ReconcileOutcome::AlreadyApplied;
                }
                let len = messages.len();
                session.messages = messages;
                ReconcileOutcome::Replaced { len }
            }
        }
    }

    /// Resolve the contract of `body` and apply it.
    ///
    /// On an unrecognized shape the session is left unchanged.
    pub fn reconcile_value(
        &self,
        session: &mut ConversationSession,
        handle: &PendingHandle,
        body: Value,
    ) -> Result<(ChatReply, ReconcileOutcome), ChatError> {
        let reply = ChatReply::from_value(body)?;
        let outcome = self.reconcile(session, handle, &reply);
        Ok((reply, outcome))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Character;
    use crate::emotion::project_messages;
    use crate::queue::OptimisticMessageQueue;
    use serde_json::json;

    fn pending_session(text: &str) -> (ConversationSession, OptimisticMessageQueue, PendingHandle) {
        let mut session = ConversationSession::new();
        session.characters.push(Character::new("3", "Darcy", "proud"));
        session.selected_character_id = Some("3".into());
        let mut queue = OptimisticMessageQueue::new();
        let handle = queue.submit(&mut session, text).unwrap();
        (session, queue, handle)
    }

    #[test]
    fn test_detects_incremental_shape() {
        let reply = ChatReply::from_value(json!({
            "message": "Hi!",
            "emotions": {"anger": 0, "sadness": 0, "joy": 2.5},
            "parameters": {"valence": 5, "arousal": 3, "selection_threshold": 2,
                           "resolution": 6, "goal_directedness": 4, "securing_rate": 1},
            "traits": "proud"
        }))
        .unwrap();
        let ChatReply::Incremental(inc) = reply else {
            panic!("expected incremental reply");
        };
        assert_eq!(inc.emotions, EmotionVector::new(0.0, 0.0, 2.5));
        assert_eq!(inc.parameters.unwrap().valence(), 5.0);
        assert_eq!(inc.traits.as_deref(), Some("proud"));
    }

    #[test]
    fn test_history_field_selects_authoritative() {
        let reply = ChatReply::from_value(json!({
            "message": "ignored",
            "history": [{"content": "Hello", "is_user": true}],
            "anger": 1, "sadness": 0, "joy": 0
        }))
        .unwrap();
        assert!(matches!(reply, ChatReply::Authoritative(_)));
    }

    #[test]
    fn test_unrecognized_shapes() {
        for body in [
            json!({"error": "boom"}),
            json!(["not", "an", "object"]),
            json!({"message": 42}),
            json!({"message": "Hi!"}),
            json!({"history": [{"content": "x"}]}),
        ] {
            let err = ChatReply::from_value(body.clone()).unwrap_err();
            assert!(
                matches!(err, ChatError::UnrecognizedResponseShape { .. }),
                "body {} should be unrecognized",
                body
            );
        }
    }

    #[test]
    fn test_incremental_reply_appends_character_message() {
        let (mut session, _queue, handle) = pending_session("Hello");
        let reply = ChatReply::from_value(json!({
            "message": "Hi!",
            "emotions": {"anger": 0, "sadness": 0, "joy": 2.5}
        }))
        .unwrap();

        let outcome = HistoryReconciler::new().reconcile(&mut session, &handle, &reply);
        assert_eq!(outcome, ReconcileOutcome::Appended { sequence: 1 });
        assert_eq!(
            session.messages,
            vec![
                Message::user("Hello", 0),
                Message::character("Hi!", EmotionVector::new(0.0, 0.0, 2.5), 1),
            ]
        );
        assert_eq!(project_messages(&session.messages), EmotionVector::new(0.0, 0.0, 2.5));
    }

    #[test]
    fn test_incremental_reconcile_is_idempotent() {
        let (mut session, _queue, handle) = pending_session("Hello");
        let reply = ChatReply::from_value(json!({
            "message": "Hi!",
            "emotions": {"anger": 1, "sadness": 2, "joy": 3}
        }))
        .unwrap();
        let reconciler = HistoryReconciler::new();

        reconciler.reconcile(&mut session, &handle, &reply);
        let once = session.clone();
        let outcome = reconciler.reconcile(&mut session, &handle, &reply);

        assert_eq!(outcome, ReconcileOutcome::AlreadyApplied);
        assert_eq!(session, once);
        assert_eq!(session.messages.len(), 2);
    }

    #[test]
    fn test_authoritative_reply_replaces_history() {
        let mut session = ConversationSession::new();
        let handle = PendingHandle {
            request_id: uuid::Uuid::new_v4(),
            sequence: 0,
            character_id: "3".into(),
        };
        let reply = ChatReply::from_value(json!({
            "history": [
                {"content": "Hello", "is_user": true},
                {"content": "Hi!", "is_user": false, "anger": 1, "sadness": 0, "joy": 2}
            ],
            "anger": 1, "sadness": 0, "joy": 2
        }))
        .unwrap();

        let reconciler = HistoryReconciler::new();
        let outcome = reconciler.reconcile(&mut session, &handle, &reply);
        assert_eq!(outcome, ReconcileOutcome::Replaced { len: 2 });
        assert_eq!(
            session.messages,
            vec![
                Message::user("Hello", 0),
                Message::character("Hi!", EmotionVector::new(1.0, 0.0, 2.0), 1),
            ]
        );

        let again = reconciler.reconcile(&mut session, &handle, &reply);
        assert_eq!(again, ReconcileOutcome::AlreadyApplied);
        assert_eq!(session.messages.len(), 2);
    }

    #[test]
    fn test_authoritative_defaults_missing_emotions_and_clamps() {
        let (mut session, _queue, handle) = pending_session("Hello");
        let reply = ChatReply::from_value(json!({
            "history": [
                {"content": "Hello", "is_user": true, "anger": 4},
                {"content": "Hmph.", "is_user": false},
                {"content": "Rage!", "is_user": false, "anger": 11, "joy": -2}
            ]
        }))
        .unwrap();

        HistoryReconciler::new().reconcile(&mut session, &handle, &reply);
        assert_eq!(session.messages[0].emotion, None);
        assert_eq!(session.messages[1].emotion, Some(EmotionVector::zero()));
        assert_eq!(session.messages[2].emotion, Some(EmotionVector::new(5.0, 0.0, 0.0)));
        assert!(session.validate().is_ok());
    }

    #[test]
    fn test_reconcile_value_leaves_session_on_bad_shape() {
        let (mut session, _queue, handle) = pending_session("Hello");
        let before = session.clone();
        let err = HistoryReconciler::new()
            .reconcile_value(&mut session, &handle, json!({"status": "ok"}))
            .unwrap_err();
        assert!(matches!(err, ChatError::UnrecognizedResponseShape { .. }));
        assert_eq!(session, before);
    }
}
