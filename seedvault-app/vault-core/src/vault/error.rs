//! Vault-specific error types for secure storage operations.
//!
//! A wrong PIN is deliberately absent: it is an ordinary outcome
//! (`Ok(None)` / `Ok(false)`), so the UI can tell "try again" apart from
//! "something broke".

use thiserror::Error;

/// Text shown when a PIN does not match.
pub const INVALID_PIN_MESSAGE: &str = "Invalid PIN";

/// Text shown for every failure the user cannot act on beyond retrying.
pub const STORAGE_FAILURE_MESSAGE: &str = "Could not access secure storage.";

/// Errors that can occur during vault operations.
#[derive(Error, Debug)]
pub enum VaultError {
    /// The secure store rejected a write. No partial-state guarantee;
    /// repeating the whole operation is the only recovery.
    #[error("Secure storage write failed: {0}")]
    StorageWriteFailed(String),

    /// The secure store could not be read.
    #[error("Secure storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The cipher could not produce a blob.
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Too many consecutive wrong PINs. Recoverable by waiting.
    #[error("Locked out for {remaining_seconds} more seconds")]
    LockedOut { remaining_seconds: u64 },

    /// The PIN verified but the blob did not authenticate: corruption.
    #[error("Stored secret failed its integrity check")]
    DecryptionFailed,

    /// No secret has been saved for this wallet.
    #[error("Vault not set up")]
    NotSetup,

    /// The failed-attempt counter could not be persisted.
    #[error("Lockout state could not be persisted: {0}")]
    LockoutPersistence(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for vault operations.
pub type VaultResult<T> = std::result::Result<T, VaultError>;

impl VaultError {
    /// Stable code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::StorageWriteFailed(_) => "STORAGE_WRITE_FAILED",
            VaultError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            VaultError::EncryptionFailed(_) => "ENCRYPTION_FAILED",
            VaultError::LockedOut { .. } => "LOCKED_OUT",
            VaultError::DecryptionFailed => "DECRYPTION_FAILED",
            VaultError::NotSetup => "NOT_SETUP",
            VaultError::LockoutPersistence(_) => "LOCKOUT_PERSISTENCE",
            VaultError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            VaultError::LockedOut { remaining_seconds } => format!(
                "Too many attempts. Try again in {}.",
                format_wait(*remaining_seconds)
            ),
            VaultError::NotSetup => "No wallet has been set up yet.".to_string(),
            _ => STORAGE_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Render a wait as "3 minutes 20 seconds", "1 minute", "45 seconds".
pub fn format_wait(seconds: u64) -> String {
    fn unit(n: u64, name: &str) -> String {
        if n == 1 {
            format!("1 {}", name)
        } else {
            format!("{} {}s", n, name)
        }
    }

    let minutes = seconds / 60;
    let rest = seconds % 60;
    match (minutes, rest) {
        (0, s) => unit(s, "second"),
        (m, 0) => unit(m, "minute"),
        (m, s) => format!("{} {}", unit(m, "minute"), unit(s, "second")),
    }
}

impl From<seedvault_securestore::Error> for VaultError {
    fn from(err: seedvault_securestore::Error) -> Self {
        VaultError::StorageUnavailable(err.to_string())
    }
}

// ============================================================================
// Serialization for callers that forward errors over IPC
// ============================================================================

impl serde::Serialize for VaultError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("VaultError", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.user_message())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_wait() {
        assert_eq!(format_wait(0), "0 seconds");
        assert_eq!(format_wait(1), "1 second");
        assert_eq!(format_wait(45), "45 seconds");
        assert_eq!(format_wait(60), "1 minute");
        assert_eq!(format_wait(200), "3 minutes 20 seconds");
        assert_eq!(format_wait(3600), "60 minutes");
    }

    #[test]
    fn test_user_messages() {
        let locked = VaultError::LockedOut {
            remaining_seconds: 120,
        };
        assert_eq!(
            locked.user_message(),
            "Too many attempts. Try again in 2 minutes."
        );
        assert_eq!(
            VaultError::DecryptionFailed.user_message(),
            STORAGE_FAILURE_MESSAGE
        );
        assert_eq!(
            VaultError::StorageWriteFailed("keyring".into()).user_message(),
            STORAGE_FAILURE_MESSAGE
        );
    }

    #[test]
    fn test_store_error_conversion() {
        let err: VaultError = seedvault_securestore::Error::AccessDenied.into();
        assert!(matches!(err, VaultError::StorageUnavailable(_)));
    }

    #[test]
    fn test_vault_error_serialization() {
        let err = VaultError::LockedOut {
            remaining_seconds: 60,
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("LOCKED_OUT"));
        assert!(json.contains("1 minute"));
    }
}
