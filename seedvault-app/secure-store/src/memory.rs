//! In-memory secure store.
//!
//! Nothing is persisted. The biometric challenge is scripted with
//! [`MemoryStore::set_biometric_outcome`], and enrollment changes are
//! simulated with [`MemoryStore::change_enrollment`], which drops every
//! policy-bound entry the way a platform keystore invalidates its keys.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::models::*;
use crate::SecureStore;

struct StoredEntry {
    value: Zeroizing<Vec<u8>>,
    policy: AccessPolicy,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, StoredEntry>,
    biometric_outcome: BiometricOutcome,
    enrollment_changed: bool,
    fail_writes_after: Option<usize>,
    prompts_shown: usize,
}

/// Process-local [`SecureStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::Internal("memory store lock poisoned".into()))
    }

    /// Decide how the next biometric challenges end.
    pub fn set_biometric_outcome(&self, outcome: BiometricOutcome) -> Result<()> {
        self.lock()?.biometric_outcome = outcome;
        Ok(())
    }

    /// Simulate a change of the enrolled biometric set. Policy-bound entries
    /// become unreadable and the next prompted read reports the change.
    pub fn change_enrollment(&self) -> Result<()> {
        let mut inner = self.lock()?;
        inner
            .entries
            .retain(|_, entry| entry.policy != AccessPolicy::BiometryCurrentSet);
        inner.enrollment_changed = true;
        Ok(())
    }

    /// Let `count` more writes succeed, then reject every write after that.
    /// `None` accepts writes again.
    pub fn fail_writes_after(&self, count: Option<usize>) -> Result<()> {
        self.lock()?.fail_writes_after = count;
        Ok(())
    }

    /// Number of biometric prompts shown so far.
    pub fn prompts_shown(&self) -> Result<usize> {
        Ok(self.lock()?.prompts_shown)
    }

    /// Policy the entry under `key` was written with.
    pub fn policy_of(&self, key: &str) -> Result<Option<AccessPolicy>> {
        Ok(self.lock()?.entries.get(key).map(|entry| entry.policy))
    }

    fn write(&self, key: &str, value: &[u8], policy: AccessPolicy) -> Result<()> {
        let mut inner = self.lock()?;
        if let Some(remaining) = inner.fail_writes_after.as_mut() {
            if *remaining == 0 {
                return Err(Error::Io(format!("write to {} rejected", key)));
            }
            *remaining -= 1;
        }
        inner.entries.insert(
            key.to_string(),
            StoredEntry {
                value: Zeroizing::new(value.to_vec()),
                policy,
            },
        );
        debug!("Stored {} byte entry under {}", value.len(), key);
        Ok(())
    }
}

impl SecureStore for MemoryStore {
    fn check_availability(&self) -> Result<SecretStorageStatus> {
        Ok(SecretStorageStatus::available(SecretStorageMethod::Memory, true))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.write(key, value, AccessPolicy::WhenUnlocked)
    }

    fn put_with_policy(&self, key: &str, value: &[u8], policy: AccessPolicy) -> Result<()> {
        self.write(key, value, policy)?;
        if policy == AccessPolicy::BiometryCurrentSet {
            // A fresh entry is bound to the enrollment as it is now
            self.lock()?.enrollment_changed = false;
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let inner = self.lock()?;
        match inner.entries.get(key) {
            Some(entry) if entry.policy == AccessPolicy::BiometryCurrentSet => {
                Err(Error::AccessDenied)
            }
            Some(entry) => Ok(Some(entry.value.to_vec())),
            None => Ok(None),
        }
    }

    fn get_with_prompt(&self, key: &str, reason: &str) -> Result<Option<Vec<u8>>> {
        let mut inner = self.lock()?;
        inner.prompts_shown += 1;
        debug!("Biometric prompt: {}", reason);

        if inner.enrollment_changed {
            return Err(Error::BiometricEnrollmentChanged);
        }
        match inner.biometric_outcome {
            BiometricOutcome::Approve => {}
            BiometricOutcome::Cancel => return Err(Error::UserCancelled),
            BiometricOutcome::Reject => {
                return Err(Error::AuthenticationFailed("biometric not recognized".into()))
            }
        }
        Ok(inner.entries.get(key).map(|entry| entry.value.to_vec()))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.lock()?.entries.remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.lock()?.entries.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        assert!(!store.exists("k").unwrap());

        store.put("k", b"value").unwrap();
        assert!(store.exists("k").unwrap());
        assert_eq!(store.get("k").unwrap().as_deref(), Some(&b"value"[..]));

        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert!(!store.exists("k").unwrap());
    }

    #[test]
    fn test_policy_entry_requires_prompt() {
        let store = MemoryStore::new();
        store
            .put_with_policy("pin", b"1234", AccessPolicy::BiometryCurrentSet)
            .unwrap();

        assert_eq!(store.get("pin"), Err(Error::AccessDenied));
        let value = store.get_with_prompt("pin", "unlock").unwrap();
        assert_eq!(value.as_deref(), Some(&b"1234"[..]));
        assert_eq!(store.prompts_shown().unwrap(), 1);
    }

    #[test]
    fn test_scripted_biometric_outcomes() {
        let store = MemoryStore::new();
        store
            .put_with_policy("pin", b"1234", AccessPolicy::BiometryCurrentSet)
            .unwrap();

        store.set_biometric_outcome(BiometricOutcome::Cancel).unwrap();
        assert_eq!(store.get_with_prompt("pin", "unlock"), Err(Error::UserCancelled));

        store.set_biometric_outcome(BiometricOutcome::Reject).unwrap();
        assert!(matches!(
            store.get_with_prompt("pin", "unlock"),
            Err(Error::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_enrollment_change_invalidates_policy_entries() {
        let store = MemoryStore::new();
        store.put("seed", b"blob").unwrap();
        store
            .put_with_policy("pin", b"1234", AccessPolicy::BiometryCurrentSet)
            .unwrap();

        store.change_enrollment().unwrap();

        assert!(store.exists("seed").unwrap());
        assert!(!store.exists("pin").unwrap());
        assert_eq!(
            store.get_with_prompt("pin", "unlock"),
            Err(Error::BiometricEnrollmentChanged)
        );

        // Re-enrolling with the new set works again
        store
            .put_with_policy("pin", b"1234", AccessPolicy::BiometryCurrentSet)
            .unwrap();
        assert!(store.get_with_prompt("pin", "unlock").unwrap().is_some());
    }

    #[test]
    fn test_fail_writes_after() {
        let store = MemoryStore::new();
        store.fail_writes_after(Some(1)).unwrap();
        store.put("a", b"1").unwrap();
        assert!(matches!(store.put("b", b"2"), Err(Error::Io(_))));
        assert!(!store.exists("b").unwrap());

        store.fail_writes_after(None).unwrap();
        store.put("b", b"2").unwrap();
    }
}
