//! Vault status as seen by the wallet layer before any PIN is entered.

use serde::{Deserialize, Serialize};

/// Represents the current state of the vault.
///
/// - `NotSetup` → `Locked` (after the first `save_secret`)
/// - `Locked` → `LockedOut` (after too many wrong PINs)
/// - `LockedOut` → `Locked` (once the lockout window has passed)
/// - any → `NotSetup` (after `delete_secret`)
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", tag = "state")]
pub enum VaultStatus {
    /// No secret has been saved yet
    #[default]
    NotSetup,
    /// A secret exists and can be unlocked with the PIN
    Locked,
    /// A secret exists but PIN attempts are refused for now
    LockedOut { remaining_seconds: u64 },
}

impl std::fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotSetup => write!(f, "NotSetup"),
            Self::Locked => write!(f, "Locked"),
            Self::LockedOut { remaining_seconds } => {
                write!(f, "LockedOut ({}s remaining)", remaining_seconds)
            }
        }
    }
}
