//! Data types shared by the secure store backends.

use serde::{Deserialize, Serialize};

/// The method used for secure secret storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SecretStorageMethod {
    /// macOS Keychain.
    MacOSKeychain,
    /// Windows Credential Manager.
    WindowsCredentialManager,
    /// Linux Secret Service API (GNOME Keyring, KWallet, etc.)
    LinuxSecretService,
    /// Process-local memory. Nothing survives a restart.
    Memory,
}

/// Access-control policy attached to an entry at write time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessPolicy {
    /// Readable whenever the device is unlocked.
    #[default]
    WhenUnlocked,
    /// Readable only after a biometric challenge against the currently
    /// enrolled set. Enrollment changes invalidate the entry.
    BiometryCurrentSet,
}

/// Status of secure secret storage availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretStorageStatus {
    /// Whether secure storage is available and can be used.
    pub available: bool,
    /// The method that will be used (if available).
    pub method: Option<SecretStorageMethod>,
    /// Whether policy-bound reads really prompt for biometrics.
    pub biometric_prompt: bool,
    /// Why secure storage is unavailable (if not available).
    pub unavailable_reason: Option<String>,
}

impl SecretStorageStatus {
    /// Create a status indicating secure storage is available.
    pub fn available(method: SecretStorageMethod, biometric_prompt: bool) -> Self {
        Self {
            available: true,
            method: Some(method),
            biometric_prompt,
            unavailable_reason: None,
        }
    }

    /// Create a status indicating secure storage is unavailable.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            method: None,
            biometric_prompt: false,
            unavailable_reason: Some(reason.into()),
        }
    }
}

/// Scripted result of the next biometric challenge on a [`crate::MemoryStore`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BiometricOutcome {
    /// The user passes the challenge.
    #[default]
    Approve,
    /// The user dismisses the prompt.
    Cancel,
    /// The presented biometric does not match.
    Reject,
}
