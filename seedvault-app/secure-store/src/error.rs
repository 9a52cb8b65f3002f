//! Error types for the secure store backends.

use serde::{Deserialize, Serialize};

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during secret storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", content = "message")]
pub enum Error {
    /// Secure storage is not available on this platform/device.
    #[error("Secure storage not available: {0}")]
    NotAvailable(String),

    /// User failed to authenticate (wrong biometric, lockout by the OS, etc.)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Biometric enrollment changed since the entry was stored.
    /// The backend has invalidated the entry.
    #[error("Biometric enrollment changed - stored secrets are now inaccessible")]
    BiometricEnrollmentChanged,

    /// No biometrics enrolled on the device.
    #[error("No biometrics enrolled on this device")]
    NoBiometricsEnrolled,

    /// No secret is stored under the requested key.
    #[error("No secret found in secure storage")]
    SecretNotFound,

    /// Access to secure storage was denied by the OS.
    #[error("Access denied to secure storage")]
    AccessDenied,

    /// User cancelled the biometric prompt.
    #[error("User cancelled authentication")]
    UserCancelled,

    /// I/O error during store operations.
    #[error("I/O error: {0}")]
    Io(String),

    /// Platform-specific internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error is the outcome of a biometric challenge that did
    /// not pass, as opposed to a storage failure.
    pub fn is_biometric_refusal(&self) -> bool {
        matches!(
            self,
            Error::UserCancelled
                | Error::AuthenticationFailed(_)
                | Error::BiometricEnrollmentChanged
                | Error::NoBiometricsEnrolled
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_biometric_refusal_classification() {
        assert!(Error::UserCancelled.is_biometric_refusal());
        assert!(Error::BiometricEnrollmentChanged.is_biometric_refusal());
        assert!(Error::AuthenticationFailed("no match".into()).is_biometric_refusal());
        assert!(!Error::AccessDenied.is_biometric_refusal());
        assert!(!Error::Io("disk".into()).is_biometric_refusal());
    }

    #[test]
    fn test_error_serialization() {
        let json = serde_json::to_string(&Error::NotAvailable("dbus".into())).unwrap();
        assert_eq!(json, r#"{"type":"NotAvailable","message":"dbus"}"#);
    }
}
