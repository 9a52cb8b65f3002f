//! SeedVault core: a local, PIN-protected vault for a single wallet
//! recovery seed.
//!
//! Everything goes through [`VaultManager`]. Storage is abstracted behind
//! [`seedvault_securestore::SecureStore`], and the failed-attempt counter
//! behind [`LockoutStore`], so the whole state machine runs against
//! in-memory fakes in tests.

pub mod clock;
pub mod config;
pub mod error;
pub mod security;
pub mod vault;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_config, save_config, VaultConfig, CONFIG_FILE};
pub use error::{Result, SeedVaultError};
pub use vault::{
    JsonFileLockoutStore, LockoutPolicy, LockoutState, LockoutStore, MemoryLockoutStore,
    VaultError, VaultManager, VaultResult, VaultStatus,
};
