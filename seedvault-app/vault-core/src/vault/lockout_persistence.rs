//! Lockout state persistence.
//!
//! The failed-attempt counter and lockout deadline live in a plain local
//! store, outside the secure store. They are not secret, and they must
//! survive deletion of the secret itself.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::error::{VaultError, VaultResult};
use super::lockout::LockoutState;

/// File name for the lockout state inside the data directory.
pub const LOCKOUT_FILE: &str = "lockout.json";

/// Plain local store for [`LockoutState`].
pub trait LockoutStore {
    /// Load the stored state, or the reset state when nothing was stored.
    fn load(&self) -> VaultResult<LockoutState>;

    fn save(&self, state: &LockoutState) -> VaultResult<()>;
}

impl<S: LockoutStore + ?Sized> LockoutStore for Arc<S> {
    fn load(&self) -> VaultResult<LockoutState> {
        (**self).load()
    }

    fn save(&self, state: &LockoutState) -> VaultResult<()> {
        (**self).save(state)
    }
}

/// Lockout state kept as a small JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileLockoutStore {
    path: PathBuf,
}

impl JsonFileLockoutStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data_dir>/lockout.json`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(LOCKOUT_FILE))
    }
}

impl LockoutStore for JsonFileLockoutStore {
    fn load(&self) -> VaultResult<LockoutState> {
        if !self.path.exists() {
            return Ok(LockoutState::default());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            VaultError::LockoutPersistence(format!("Failed to read lockout file: {}", e))
        })?;

        let state: LockoutState = serde_json::from_str(&content)?;
        Ok(state)
    }

    fn save(&self, state: &LockoutState) -> VaultResult<()> {
        let content = serde_json::to_string_pretty(state)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VaultError::LockoutPersistence(format!("Failed to create data dir: {}", e))
            })?;
        }

        // Write atomically (write to temp file, then rename)
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, content)
            .and_then(|()| std::fs::rename(&temp_path, &self.path))
            .map_err(|e| {
                VaultError::LockoutPersistence(format!("Failed to write lockout file: {}", e))
            })?;

        debug!("Persisted {} failed attempts", state.failed_attempts);
        Ok(())
    }
}

/// Lockout state kept only for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryLockoutStore {
    state: Mutex<LockoutState>,
}

impl MemoryLockoutStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockoutStore for MemoryLockoutStore {
    fn load(&self) -> VaultResult<LockoutState> {
        self.state
            .lock()
            .map(|state| *state)
            .map_err(|_| VaultError::LockoutPersistence("lockout lock poisoned".into()))
    }

    fn save(&self, state: &LockoutState) -> VaultResult<()> {
        let mut stored = self
            .state
            .lock()
            .map_err(|_| VaultError::LockoutPersistence("lockout lock poisoned".into()))?;
        *stored = *state;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_missing_file_loads_reset_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileLockoutStore::in_dir(dir.path());
        assert_eq!(store.load().unwrap(), LockoutState::default());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileLockoutStore::in_dir(&dir.path().join("nested"));
        let state = LockoutState {
            failed_attempts: 7,
            lockout_until: DateTime::from_timestamp(1_700_000_240, 0).unwrap(),
        };
        store.save(&state).unwrap();

        let reopened = JsonFileLockoutStore::in_dir(&dir.path().join("nested"));
        assert_eq!(reopened.load().unwrap(), state);
        assert!(!dir.path().join("nested").join("lockout.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LOCKOUT_FILE), "not json").unwrap();
        let store = JsonFileLockoutStore::in_dir(dir.path());
        assert!(matches!(store.load(), Err(VaultError::Serialization(_))));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryLockoutStore::new();
        let state = LockoutState {
            failed_attempts: 2,
            ..LockoutState::default()
        };
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), state);
    }
}
