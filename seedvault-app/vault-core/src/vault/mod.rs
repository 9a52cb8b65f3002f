//! PIN-protected vault for the wallet recovery seed.
//!
//! This module provides:
//! - Save/load/delete of the seed, encrypted with a PIN-derived key
//! - Failed-attempt counting with an escalating lockout
//! - Biometric escrow of the PIN
//! - Read-time migration of secrets in the legacy XOR format
//!
//! The PIN is transformed via PBKDF2-HMAC-SHA256 into both the AES-256-GCM
//! key and the stored verification tag.

pub mod auth;
pub mod biometric;
pub mod error;
pub mod keys;
pub mod lockout;
pub mod lockout_persistence;
pub mod manager;
pub mod salt;

pub use auth::VaultStatus;
pub use biometric::BiometricEscrow;
pub use error::{format_wait, VaultError, VaultResult, INVALID_PIN_MESSAGE, STORAGE_FAILURE_MESSAGE};
pub use keys::StorageKeys;
pub use lockout::{LockoutPolicy, LockoutState};
pub use lockout_persistence::{JsonFileLockoutStore, LockoutStore, MemoryLockoutStore, LOCKOUT_FILE};
pub use manager::{PlaintextCheck, VaultManager};
pub use salt::{generate_salt, SALT_SIZE};
