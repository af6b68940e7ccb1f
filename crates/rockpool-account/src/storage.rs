//! Key→string storage seam.
//!
//! The host application owns durable storage (its platform's key/value
//! store); the account layer only needs whole-string reads and writes, with
//! no encryption at the store level. The [`Storage`] trait is that seam.
//!
//! Two implementations ship with the crate: [`MemoryStorage`] for tests and
//! ephemeral profiles, and [`JsonFileStorage`], a durable single-file store
//! with atomic writes.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StorageError;

// ── Key namespace ──────────────────────────────────────────────────

/// Persisted key namespace. All values are strings.
pub mod keys {
    /// Account record JSON (`accountId`, `createdAt`, `version`).
    pub const ACCOUNT: &str = "@rockpool_account_data";
    /// One-way PIN hash (64 hex chars).
    pub const PIN_HASH: &str = "@rockpool_pin_hash";
    /// One-way export-password hash (64 hex chars).
    pub const PASSWORD_HASH: &str = "@rockpool_password_hash";
    /// Profile record JSON, owned by the game/profile collaborator.
    pub const PROFILE: &str = "@rockpool_user_profile";
    /// Display username.
    pub const USERNAME: &str = "@rockpool_username";
    /// Session flag, `"true"` or `"false"`. Signals that an unlocked session
    /// existed; never grants access by itself.
    pub const SESSION: &str = "@rockpool_session_active";
    /// Game points as a decimal string. Owned by the game collaborator;
    /// written here only on import.
    pub const GAME_POINTS: &str = "@rockpool_game_points";
    /// Scanned-item counters JSON. Owned by the game collaborator.
    pub const GAME_ITEMS: &str = "@rockpool_game_items";
    /// NFT list JSON. Owned by the game collaborator.
    pub const GAME_NFTS: &str = "@rockpool_game_nfts";
    /// Game-side copy of the profile record. Owned by the game collaborator.
    pub const GAME_USER_META: &str = "@rockpool_game_user_meta";
}

// ── Trait ──────────────────────────────────────────────────────────

/// Durable key→string store.
pub trait Storage {
    /// Read the value under `key`, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key` if present.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

// ── In-memory store ────────────────────────────────────────────────

/// Mutexed in-memory map — test double and ephemeral profile store.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy out every entry, for state assertions in tests.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store mutex is poisoned.
    pub fn snapshot(&self) -> Result<HashMap<String, String>, StorageError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::new("storage mutex poisoned"))
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

// ── File-backed store ──────────────────────────────────────────────

/// Single-file JSON map store with atomic writes.
///
/// Layout: one JSON object of string→string pairs. Writes go to a hidden
/// `.tmp` sibling and are renamed into place, so a crash never leaves a
/// half-written store. A corrupt store file surfaces as [`StorageError`]
/// rather than being silently reset — resetting would present a credential
/// store as "no account yet".
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Create a store backed by the file at `path`. The file is created on
    /// first write; a missing file reads as an empty store.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_map(&self) -> Result<HashMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| StorageError::new(format!("corrupt store file: {e}"))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(StorageError::new(e.to_string())),
        }
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<(), StorageError> {
        let name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::new("store path has no file name"))?;
        let tmp = self.path.with_file_name(format!(".{name}.tmp"));

        let json = serde_json::to_string_pretty(map)
            .map_err(|e| StorageError::new(format!("store serialization: {e}")))?;
        fs::write(&tmp, &json).map_err(|e| StorageError::new(e.to_string()))?;

        // Restrict file permissions to owner-only on Unix — the store holds
        // credential hashes.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))
                .map_err(|e| StorageError::new(e.to_string()))?;
        }

        fs::rename(&tmp, &self.path).map_err(|e| StorageError::new(e.to_string()))
    }
}

impl Storage for JsonFileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────
