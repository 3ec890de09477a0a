//! # character-chat
//!
//! Client-side conversation state for chatting with characters extracted
//! from a book.
//!
//! The session (messages, characters, selection, personality parameters) is
//! owned by [`ChatEngine`]. A message is appended optimistically, sent to the
//! inference service with the full history, and reconciled with whichever
//! reply shape the service returns: a single new character message
//! (incremental) or the whole conversation (authoritative). The emotion of
//! the latest character reply is projected for display and the session is
//! persisted after every accepted transition.

pub mod character;
pub mod cli;
pub mod config;
pub mod emotion;
pub mod engine;
pub mod error;
pub mod message;
pub mod parameters;
pub mod persistence;
pub mod queue;
pub mod reconcile;
pub mod session;
pub mod transport;
pub mod utilities;

pub use character::{Character, CharacterSelectionManager};
pub use config::ClientConfig;
pub use emotion::{EmotionStateProjector, EmotionVector};
pub use engine::ChatEngine;
pub use error::{ChatError, StorageError};
pub use message::{Author, Message};
pub use parameters::{ParameterName, PersonalityParameters};
pub use persistence::{KeyValueStore, PersistenceStore};
pub use queue::{OptimisticMessageQueue, PendingHandle};
pub use reconcile::{ChatReply, HistoryReconciler, ReconcileOutcome};
pub use session::ConversationSession;
pub use transport::{ChatRequest, ChatTransport, ExtractionSource, HttpTransport};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
