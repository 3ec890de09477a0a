//! Client configuration read from the environment.
//!
//! | variable                    | default                         |
//! |-----------------------------|---------------------------------|
//! | `CHAT_API_BASE_URL`         | `http://127.0.0.1:5000`         |
//! | `CHAT_USER_ID`              | `1`                             |
//! | `CHAT_STORE`                | `file` (`sqlite`, `memory`)     |
//! | `CHAT_STORE_PATH`           | `<data dir>/session.json` or `.db` |
//! | `CHAT_REQUEST_TIMEOUT_SECS` | `120`                           |

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::StorageError;
use crate::persistence::{
    FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore,
};
use crate::utilities::paths::data_dir;

/// Which key-value backend holds the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    File,
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" | "json" => Ok(Self::File),
            "sqlite" | "db" => Ok(Self::Sqlite),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Configuration of the chat client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the inference service.
    pub api_base_url: String,
    /// `user_id` sent with every chat request.
    pub user_id: String,
    /// Session store backend.
    pub store: StoreBackend,
    /// Location of the file or database backend.
    pub store_path: PathBuf,
    /// Timeout applied to each HTTP request.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_vars(&HashMap::new())
    }
}

impl ClientConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        let vars: HashMap<String, String> = std::env::vars()
            .filter(|(k, _)| k.starts_with("CHAT_"))
            .collect();
        Self::from_vars(&vars)
    }

    /// Build from an explicit variable map; unknown or invalid values fall
    /// back to defaults with a warning.
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let store = match get("CHAT_STORE") {
            Some(raw) => raw.parse().unwrap_or_else(|e: String| {
                log::warn!("{}, using file store", e);
                StoreBackend::File
            }),
            None => StoreBackend::File,
        };

        let store_path = get("CHAT_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_store_path(store));

        let request_timeout_secs: u64 = match get("CHAT_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                log::warn!("invalid CHAT_REQUEST_TIMEOUT_SECS '{}', using 120", raw);
                120
            }),
            None => 120,
        };

        Self {
            api_base_url: get("CHAT_API_BASE_URL")
                .unwrap_or("http://127.0.0.1:5000")
                .to_string(),
            user_id: get("CHAT_USER_ID").unwrap_or("1").to_string(),
            store,
            store_path,
            request_timeout_secs,
        }
    }

    /// Open the configured key-value backend.
    pub fn open_store(&self) -> Result<Box<dyn KeyValueStore>, StorageError> {
        Ok(match self.store {
            StoreBackend::File => Box::new(FileKeyValueStore::new(self.store_path.clone())),
            StoreBackend::Sqlite => Box::new(SqliteKeyValueStore::open(&self.store_path)?),
            StoreBackend::Memory => Box::new(MemoryKeyValueStore::new()),
        })
    }
}

fn default_store_path(store: StoreBackend) -> PathBuf {
    match store {
        StoreBackend::Sqlite => data_dir().join("session.db"),
        _ => data_dir().join("session.json"),
    }
}
