//! Error types for the conversation-state engine.
//!
//! Precondition failures (`EmptyMessage`, `NoCharacterSelected`,
//! `UnknownCharacterId`, `RequestInFlight`) are raised before any mutation
//! and are meant to be shown to the user as guidance. The remaining variants
//! describe failures of the collaborators around the session.

use thiserror::Error;

/// Errors surfaced by the chat session and its collaborators.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The submitted text was empty after trimming.
    #[error("Message is empty")]
    EmptyMessage,

    /// A send was attempted while no character is selected.
    #[error("Please select a character to chat with")]
    NoCharacterSelected,

    /// `select` was called with an id that is not among the extracted characters.
    #[error("Unknown character id: {id}")]
    UnknownCharacterId { id: String },

    /// A reply is still outstanding for an earlier message.
    #[error("A message is already awaiting a reply")]
    RequestInFlight,

    /// The reply body matched neither the incremental nor the authoritative shape.
    #[error("Unrecognized response shape: {detail}")]
    UnrecognizedResponseShape { detail: String },

    /// Network or server error while talking to the inference service.
    #[error("Transport failure: {message}")]
    TransportFailure { message: String },

    /// Persisted state could not be parsed or violated a session invariant.
    #[error("Corrupt persisted state: {detail}")]
    CorruptPersistedState { detail: String },

    /// Writing the session snapshot failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ChatError {
    /// Whether this error is a rejected precondition rather than a system fault.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::EmptyMessage
                | Self::NoCharacterSelected
                | Self::UnknownCharacterId { .. }
                | Self::RequestInFlight
        )
    }

    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::TransportFailure {
            message: message.into(),
        }
    }

    pub(crate) fn unrecognized(detail: impl Into<String>) -> Self {
        Self::UnrecognizedResponseShape {
            detail: detail.into(),
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        Self::transport(e.to_string())
    }
}

/// Errors from the durable key-value backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Serializing the snapshot failed; nothing was written.
    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File-system error.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error.
    #[error("Storage database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The backend lock was poisoned by a panicking writer.
    #[error("Storage lock poisoned: {message}")]
    LockPoisoned { message: String },
}
