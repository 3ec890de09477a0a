//! Where the client keeps its session store.

use std::env;
use std::path::PathBuf;

/// Directory name under the platform data directory.
const APP_DIR: &str = "character-chat";

/// Returns the directory for persisted session state.
///
/// `CHAT_STORAGE_DIR` overrides the location; otherwise a platform-specific
/// data directory is used. The directory is not created here.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = env::var("CHAT_STORAGE_DIR") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }

    // On Linux: ~/.local/share/character-chat
    // On macOS: ~/Library/Application Support/character-chat
    // On Windows: %LOCALAPPDATA%\character-chat
    if cfg!(target_os = "linux") {
        let home = env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home).join(".local").join("share").join(APP_DIR)
    } else if cfg!(target_os = "macos") {
        let home = env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home)
            .join("Library")
            .join("Application Support")
            .join(APP_DIR)
    } else if cfg!(target_os = "windows") {
        let local_app_data = env::var("LOCALAPPDATA")
            .unwrap_or_else(|_| env::var("APPDATA").unwrap_or_else(|_| "C:\\tmp".to_string()));
        PathBuf::from(local_app_data).join(APP_DIR)
    } else {
        PathBuf::from("/tmp").join(APP_DIR)
    }
}
