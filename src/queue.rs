//! Optimistic append of user messages with a single in-flight request.

use uuid::Uuid;

use crate::character::CharacterSelectionManager;
use crate::error::ChatError;
use crate::message::Message;
use crate::session::ConversationSession;

/// Identity of the request awaiting a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingHandle {
    /// Unique id of this send attempt.
    pub request_id: Uuid,
    /// Sequence of the optimistically appended user message.
    pub sequence: u64,
    /// Character the message was addressed to.
    pub character_id: String,
}

/// Appends user messages before the server answers and blocks further
/// submissions until the reply (or failure) is resolved.
#[derive(Debug, Default)]
pub struct OptimisticMessageQueue {
    selection: CharacterSelectionManager,
    pending: Option<PendingHandle>,
}

impl OptimisticMessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` as a pending user message.
    ///
    /// Checks run in order: empty text, an outstanding request, missing
    /// selection. Any failure leaves `session` and the queue untouched.
    pub fn submit(
        &mut self,
        session: &mut ConversationSession,
        text: &str,
    ) -> Result<PendingHandle, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self.pending.is_some() {
            return Err(ChatError::RequestInFlight);
        }
        let character_id = self.selection.require_selection(session)?.id.clone();

        let sequence = session.next_sequence();
        session.messages.push(Message::user(text, sequence));

        let handle = PendingHandle {
            request_id: Uuid::new_v4(),
            sequence,
            character_id,
        };
        log::debug!(
            "queued user message seq={} request={}",
            handle.sequence,
            handle.request_id
        );
        self.pending = Some(handle.clone());
        Ok(handle)
    }

    /// Whether a request is outstanding.
    pub fn is_awaiting_reply(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingHandle> {
        self.pending.as_ref()
    }

    /// Clear the pending marker if it belongs to `handle`.
    ///
    /// Returns `false` when `handle` is stale (already resolved or never issued).
    pub fn resolve(&mut self, handle: &PendingHandle) -> bool {
        match &self.pending {
            Some(p) if p.request_id == handle.request_id => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
