//! Local key-value persistence for the session.
//!
//! The production store is a flat JSON map at `<heat-home>/session.json`,
//! written with 0600 permissions on Unix. Writes to the two session keys
//! are independent; there is no transaction across them.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::PoisonError;

use super::SessionError;

/// Store key for the serialized user profile.
pub const USER_KEY: &str = "user";

/// Store key for the raw session token.
pub const TOKEN_KEY: &str = "token";

/// Storage file name inside the heat home directory.
const SESSION_FILE: &str = "session.json";

/// String key-value persistence consumed by the session manager.
pub trait SessionStore: Send + Sync {
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

/// File-backed store rooted at the heat home directory.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(heat_home: &Path) -> Self {
        Self {
            path: heat_home.join(SESSION_FILE),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_err(&self, source: std::io::Error) -> SessionError {
        SessionError::Storage {
            path: self.path.clone(),
            source,
        }
    }

    fn read_map(&self) -> Result<HashMap<String, String>, SessionError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| self.storage_err(e))?;
        serde_json::from_str(&contents).map_err(SessionError::Json)
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.storage_err(e))?;
        }

        // The token lands in this file; keep it unreadable to other users.
        #[cfg(unix)]
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&self.path)
            .map_err(|e| self.storage_err(e))?;

        #[cfg(not(unix))]
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| self.storage_err(e))?;

        let json = serde_json::to_string_pretty(map)?;
        file.write_all(json.as_bytes())
            .map_err(|e| self.storage_err(e))
    }
}

impl SessionStore for FileSessionStore {
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// In-memory store for tests and embedders that persist elsewhere.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
