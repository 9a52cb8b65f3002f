//! Desktop implementation using OS keyring.
//!
//! This module provides secure secret storage using platform-native keyrings:
//! - **macOS**: Keychain Access
//! - **Windows**: Credential Manager
//! - **Linux**: Secret Service API (GNOME Keyring, KWallet)
//!
//! Desktop keyrings have no biometric prompt. Policy-bound entries are stored
//! like any other entry and read back without a challenge (session-based).

use base64::Engine;
use keyring::Entry;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::models::*;
use crate::SecureStore;

/// Default service name used for keyring entries.
const DEFAULT_SERVICE_NAME: &str = "com.seedvault.vault";

/// Secure store backed by the OS keyring. Each store key becomes an account
/// under one service name.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> crate::Result<Entry> {
        Entry::new(&self.service, key).map_err(|e| {
            error!("Failed to create keyring entry for {}: {}", key, e);
            Self::map_keyring_error(e)
        })
    }

    /// Get the appropriate storage method for the current platform.
    fn get_platform_method() -> SecretStorageMethod {
        #[cfg(target_os = "macos")]
        {
            SecretStorageMethod::MacOSKeychain
        }
        #[cfg(target_os = "windows")]
        {
            SecretStorageMethod::WindowsCredentialManager
        }
        #[cfg(target_os = "linux")]
        {
            SecretStorageMethod::LinuxSecretService
        }
    }

    /// Map keyring errors to our error type.
    fn map_keyring_error(err: keyring::Error) -> Error {
        match err {
            keyring::Error::NoEntry => Error::SecretNotFound,
            keyring::Error::Ambiguous(_) => {
                Error::Internal("Multiple keyring entries found".into())
            }
            keyring::Error::NoStorageAccess(e) => {
                Error::NotAvailable(format!("Keyring access denied: {:?}", e))
            }
            keyring::Error::PlatformFailure(e) => {
                Error::NotAvailable(format!("System keyring failure: {:?}", e))
            }
            keyring::Error::BadEncoding(_) => {
                Error::Internal("Keyring entry is not valid UTF-8".into())
            }
            _ => Error::Internal(format!("Keyring error: {}", err)),
        }
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

impl SecureStore for KeyringStore {
    fn check_availability(&self) -> crate::Result<SecretStorageStatus> {
        debug!("Checking keyring availability for service: {}", self.service);

        let entry = match Entry::new(&self.service, "availability-probe") {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Keyring not available: {}", e);
                return Ok(SecretStorageStatus::unavailable(format!(
                    "OS keyring not available: {}",
                    e
                )));
            }
        };
        let method = Self::get_platform_method();
        match entry.get_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => {
                debug!("Keyring available, method: {:?}", method);
                Ok(SecretStorageStatus::available(method, false))
            }
            Err(e) => {
                warn!("Keyring not accessible: {:?}", e);
                Ok(SecretStorageStatus::unavailable(format!(
                    "OS keyring not accessible: {}",
                    e
                )))
            }
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> crate::Result<()> {
        debug!(
            "Storing {} byte entry in keyring (service: {}, account: {})",
            value.len(),
            self.service,
            key
        );

        let entry = self.entry(key)?;

        // Keyring APIs expect strings
        let encoded = base64::engine::general_purpose::STANDARD.encode(value);
        entry.set_password(&encoded).map_err(|e| {
            error!("Failed to store entry {} in keyring: {:?}", key, e);
            Self::map_keyring_error(e)
        })
    }

    fn put_with_policy(&self, key: &str, value: &[u8], policy: AccessPolicy) -> crate::Result<()> {
        if policy == AccessPolicy::BiometryCurrentSet {
            info!(
                "Keyring has no biometric gate; storing {} as a session-protected entry",
                key
            );
        }
        self.put(key, value)
    }

    fn get(&self, key: &str) -> crate::Result<Option<Vec<u8>>> {
        let entry = self.entry(key)?;

        let encoded = match entry.get_password() {
            Ok(password) => password,
            Err(keyring::Error::NoEntry) => {
                debug!("No keyring entry for {}", key);
                return Ok(None);
            }
            Err(e) => {
                error!("Failed to retrieve {} from keyring: {:?}", key, e);
                return Err(Self::map_keyring_error(e));
            }
        };

        let value = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| {
                error!("Failed to decode keyring entry {} from base64: {}", key, e);
                Error::Internal(format!("Failed to decode entry: {}", e))
            })?;
        Ok(Some(value))
    }

    fn get_with_prompt(&self, key: &str, _reason: &str) -> crate::Result<Option<Vec<u8>>> {
        self.get(key)
    }

    fn delete(&self, key: &str) -> crate::Result<()> {
        let entry = self.entry(key)?;

        // delete_credential returns an error if the entry doesn't exist,
        // but we want delete to be idempotent
        match entry.delete_credential() {
            Ok(()) => {
                debug!("Deleted keyring entry {}", key);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                error!("Failed to delete {} from keyring: {:?}", key, e);
                Err(Self::map_keyring_error(e))
            }
        }
    }

    fn exists(&self, key: &str) -> crate::Result<bool> {
        let entry = self.entry(key)?;
        match entry.get_password() {
            Ok(_) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }
}
