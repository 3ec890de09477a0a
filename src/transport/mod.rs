//! Requests to the remote inference and extraction services.
//!
//! The engine only sees [`ChatTransport`]; [`HttpTransport`] is the
//! production implementation, tests substitute their own.

pub mod http;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::character::ExtractedCharacter;
use crate::error::ChatError;
use crate::message::HistoryEntry;
use crate::parameters::PersonalityParameters;
use crate::queue::PendingHandle;
use crate::session::ConversationSession;

pub use http::HttpTransport;

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<HistoryEntry>,
    #[serde(flatten)]
    pub parameters: PersonalityParameters,
    pub user_id: String,
    pub character_id: String,
}

impl ChatRequest {
    /// Build the request for the pending message identified by `handle`.
    ///
    /// `history` holds every message up to and including the pending one.
    pub fn for_pending(
        session: &ConversationSession,
        handle: &PendingHandle,
        user_id: &str,
    ) -> Result<Self, ChatError> {
        let pending = session
            .message_at(handle.sequence)
            .filter(|m| m.is_user())
            .ok_or_else(|| {
                ChatError::transport(format!(
                    "pending message {} is missing from the session",
                    handle.sequence
                ))
            })?;
        let history = session
            .messages
            .iter()
            .take_while(|m| m.sequence <= handle.sequence)
            .map(HistoryEntry::from)
            .collect();

        Ok(Self {
            message: pending.content.clone(),
            history,
            parameters: session.parameters,
            user_id: user_id.to_string(),
            character_id: handle.character_id.clone(),
        })
    }
}

/// Input of `POST /extract_characters`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionSource {
    /// A PDF uploaded as multipart form data.
    Pdf {
        file_name: String,
        bytes: Vec<u8>,
        book_title: String,
    },
    /// Plain text sent as JSON.
    Text { text: String, book_title: String },
}

impl ExtractionSource {
    /// PDF source whose title defaults to the file name up to its first `.`.
    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>, book_title: Option<String>) -> Self {
        let file_name = file_name.into();
        let book_title = book_title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| default_book_title(&file_name));
        Self::Pdf {
            file_name,
            bytes,
            book_title,
        }
    }

    /// Whether the service reports a title/header artifact as the first entry.
    pub fn has_header_entry(&self) -> bool {
        matches!(self, Self::Pdf { .. })
    }

    pub fn book_title(&self) -> &str {
        match self {
            Self::Pdf { book_title, .. } | Self::Text { book_title, .. } => book_title,
        }
    }
}

/// File name without directories, cut at the first `.`.
pub fn default_book_title(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    base.split('.').next().unwrap_or(base).to_string()
}

/// Remote collaborators of the session.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a chat turn; returns the raw reply body for the reconciler.
    async fn chat(&self, request: &ChatRequest) -> Result<Value, ChatError>;

    /// Extract the characters of a book.
    async fn extract_characters(
        &self,
        source: &ExtractionSource,
    ) -> Result<Vec<ExtractedCharacter>, ChatError>;
}
