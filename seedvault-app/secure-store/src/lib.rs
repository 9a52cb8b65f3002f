//! Secure key-value storage for SeedVault.
//!
//! The vault never talks to a platform store directly. It goes through the
//! [`SecureStore`] trait, which offers put/get/delete/exists plus a
//! biometric-gated variant of put and get:
//! - **Desktop**: OS keyring (Keychain, Credential Manager, Secret Service)
//! - **Memory**: process-local store with a scriptable biometric prompt

use std::sync::Arc;

pub use models::*;

#[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
mod desktop;
mod error;
mod memory;
mod models;

#[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
pub use desktop::KeyringStore;
pub use error::{Error, Result};
pub use memory::MemoryStore;

/// Capability interface over an at-rest encrypted store addressed by string keys.
///
/// Implementations use interior mutability so a single store can be shared
/// between the vault and whoever created it.
pub trait SecureStore {
    /// Report whether the backend can be used and which method it maps to.
    fn check_availability(&self) -> Result<SecretStorageStatus>;

    /// Write `value` under `key`, replacing any previous entry.
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Write `value` under `key`, bound to an access-control policy.
    ///
    /// Entries written with [`AccessPolicy::BiometryCurrentSet`] are
    /// invalidated by the backend when biometric enrollment changes.
    fn put_with_policy(&self, key: &str, value: &[u8], policy: AccessPolicy) -> Result<()>;

    /// Read the entry under `key`. `Ok(None)` when nothing is stored.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Read a policy-bound entry, showing the platform prompt with `reason`.
    ///
    /// Returns [`Error::UserCancelled`], [`Error::AuthenticationFailed`] or
    /// [`Error::BiometricEnrollmentChanged`] when the challenge does not pass.
    fn get_with_prompt(&self, key: &str, reason: &str) -> Result<Option<Vec<u8>>>;

    /// Remove the entry under `key`. Deleting a missing entry is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Check for an entry under `key` without triggering any prompt.
    fn exists(&self, key: &str) -> Result<bool>;
}

impl<S: SecureStore + ?Sized> SecureStore for Arc<S> {
    fn check_availability(&self) -> Result<SecretStorageStatus> {
        (**self).check_availability()
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).put(key, value)
    }

    fn put_with_policy(&self, key: &str, value: &[u8], policy: AccessPolicy) -> Result<()> {
        (**self).put_with_policy(key, value, policy)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn get_with_prompt(&self, key: &str, reason: &str) -> Result<Option<Vec<u8>>> {
        (**self).get_with_prompt(key, reason)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key)
    }
}
