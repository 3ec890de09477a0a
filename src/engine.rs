//! The conversation-state engine.
//!
//! `ChatEngine` owns the session and runs every transition in a fixed order:
//!
//! ```text
//! submit(text)   → selection check → optimistic append → persist
//! chat request   → transport (the only suspension point)
//! complete(body) → reconcile → project emotion → persist
//! ```
//!
//! Each accepted transition ends in [`ChatEngine::after_transition`], which
//! logs it and writes the snapshot. Rejected preconditions return before
//! anything is touched.

use std::sync::Arc;

use serde_json::Value;

use crate::character::{assign_ids, Character, CharacterSelectionManager};
use crate::config::ClientConfig;
use crate::emotion::{EmotionStateProjector, EmotionVector};
use crate::error::ChatError;
use crate::parameters::{ParameterName, PersonalityParameters};
use crate::persistence::PersistenceStore;
use crate::queue::{OptimisticMessageQueue, PendingHandle};
use crate::reconcile::{ChatReply, HistoryReconciler, ReconcileOutcome};
use crate::session::ConversationSession;
use crate::transport::{ChatRequest, ChatTransport, ExtractionSource, HttpTransport};

/// Extra details the service reported with its latest incremental reply.
///
/// Shown next to the chat; never persisted and never copied into the
/// user's own parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplyInsight {
    pub parameters: Option<PersonalityParameters>,
    pub traits: Option<String>,
}

/// Accepted state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    UserMessageQueued,
    ReplyReconciled,
    RequestFailed,
    CharacterSelected,
    CharactersReplaced,
    ParametersChanged,
}

/// Session owner driving queue, reconciler, projector and persistence.
pub struct ChatEngine {
    session: ConversationSession,
    queue: OptimisticMessageQueue,
    selection: CharacterSelectionManager,
    reconciler: HistoryReconciler,
    projector: EmotionStateProjector,
    store: PersistenceStore,
    transport: Arc<dyn ChatTransport>,
    user_id: String,
    current_emotion: EmotionVector,
    insight: Option<ReplyInsight>,
}

impl std::fmt::Debug for ChatEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatEngine")
            .field("session", &self.session)
            .field("pending", &self.queue.pending())
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl ChatEngine {
    /// Restore the session from `store` and wire the collaborators.
    pub fn new(
        user_id: impl Into<String>,
        transport: Arc<dyn ChatTransport>,
        store: PersistenceStore,
    ) -> Self {
        let session = store.load();
        let projector = EmotionStateProjector::new();
        let current_emotion = projector.project(&session);
        log::info!(
            "session restored: {} messages, {} characters",
            session.messages.len(),
            session.characters.len()
        );
        Self {
            session,
            queue: OptimisticMessageQueue::new(),
            selection: CharacterSelectionManager::new(),
            reconciler: HistoryReconciler::new(),
            projector,
            store,
            transport,
            user_id: user_id.into(),
            current_emotion,
            insight: None,
        }
    }

    /// Engine with an HTTP transport and the configured store.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ChatError> {
        let transport = Arc::new(HttpTransport::from_config(config)?);
        let store = PersistenceStore::new(config.open_store()?);
        Ok(Self::new(config.user_id.clone(), transport, store))
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    /// Emotion of the latest character reply.
    pub fn current_emotion(&self) -> EmotionVector {
        self.current_emotion
    }

    pub fn insight(&self) -> Option<&ReplyInsight> {
        self.insight.as_ref()
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.queue.is_awaiting_reply()
    }

    pub fn selected_character(&self) -> Option<&Character> {
        self.selection.require_selection(&self.session).ok()
    }

    pub fn selected_character_name(&self) -> String {
        self.selection.selected_name(&self.session)
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Select the character to chat with.
    pub fn select_character(&mut self, id: &str) -> Result<(), ChatError> {
        self.selection.select(&mut self.session, id)?;
        self.after_transition(Transition::CharacterSelected);
        Ok(())
    }

    /// Replace all six sliders.
    ///
    /// A request already in flight keeps the snapshot it was built with.
    pub fn set_parameters(&mut self, parameters: PersonalityParameters) {
        self.session.parameters = parameters;
        self.after_transition(Transition::ParametersChanged);
    }

    /// Change one slider; returns the value after clamping.
    pub fn set_parameter(&mut self, name: ParameterName, value: f64) -> f64 {
        let parameters = self.session.parameters.with(name, value);
        self.set_parameters(parameters);
        parameters.get(name)
    }

    /// Optimistically append `text` and build the request for it.
    pub fn submit(&mut self, text: &str) -> Result<(PendingHandle, ChatRequest), ChatError> {
        let handle = match self.queue.submit(&mut self.session, text) {
            Ok(handle) => handle,
            Err(e) => {
                log::debug!("submit rejected: {}", e);
                return Err(e);
            }
        };
        let request = ChatRequest::for_pending(&self.session, &handle, &self.user_id)?;
        self.after_transition(Transition::UserMessageQueued);
        Ok((handle, request))
    }

    /// Apply the outcome of the request identified by `handle`.
    ///
    /// Only the pending request is applied; a stale handle is reported as
    /// `AlreadyApplied` and leaves the session untouched. On any failure the
    /// pending marker is cleared and the optimistic user message stays in the
    /// history without a reply.
    pub fn complete(
        &mut self,
        handle: &PendingHandle,
        result: Result<Value, ChatError>,
    ) -> Result<ReconcileOutcome, ChatError> {
        if self.queue.pending().map(|p| p.request_id) != Some(handle.request_id) {
            log::debug!("ignoring reply for stale request {}", handle.request_id);
            return Ok(ReconcileOutcome::AlreadyApplied);
        }

        let reconciled = result.and_then(|body| {
            self.reconciler
                .reconcile_value(&mut self.session, handle, body)
        });

        match reconciled {
            Ok((reply, outcome)) => {
                self.queue.resolve(handle);
                if let ChatReply::Incremental(inc) = &reply {
                    self.insight = Some(ReplyInsight {
                        parameters: inc.parameters,
                        traits: inc.traits.clone(),
                    });
                }
                self.current_emotion = self.projector.project(&self.session);
                log::debug!("reply reconciled: {:?}", outcome);
                self.after_transition(Transition::ReplyReconciled);
                Ok(outcome)
            }
            Err(e) => {
                self.queue.resolve(handle);
                log::warn!(
                    "request {} failed, message {} left unanswered: {}",
                    handle.request_id,
                    handle.sequence,
                    e
                );
                self.after_transition(Transition::RequestFailed);
                Err(e)
            }
        }
    }

    /// Submit `text`, wait for the reply and reconcile it.
    pub async fn send(&mut self, text: &str) -> Result<ReconcileOutcome, ChatError> {
        let (handle, request) = self.submit(text)?;
        let result = self.transport.chat(&request).await;
        self.complete(&handle, result)
    }

    /// Extract characters from a book and make them the selectable cast.
    ///
    /// Returns the number of characters now available.
    pub async fn extract_characters(
        &mut self,
        source: &ExtractionSource,
    ) -> Result<usize, ChatError> {
        let extracted = self.transport.extract_characters(source).await?;
        let characters = assign_ids(extracted, source.has_header_entry());
        let count = characters.len();
        self.selection
            .replace_characters(&mut self.session, characters);
        log::info!("extracted {} characters from '{}'", count, source.book_title());
        self.after_transition(Transition::CharactersReplaced);
        Ok(count)
    }

    /// Post-mutation hook: log the transition and persist the snapshot.
    ///
    /// A failed save keeps the previous durable snapshot; the in-memory
    /// session stays authoritative until the next successful save.
    fn after_transition(&mut self, transition: Transition) {
        log::debug!("transition {:?}", transition);
        if let Err(e) = self.store.save(&self.session) {
            log::error!("failed to persist session after {:?}: {}", transition, e);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
