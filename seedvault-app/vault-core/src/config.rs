use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SeedVaultError};
use crate::security::{Kdf, PBKDF2_ITERATIONS};
use crate::vault::LockoutPolicy;

/// File name for the vault configuration inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Logical wallet identity; namespaces every secure-store key.
    pub wallet_id: String,
    /// Service name the OS keyring files entries under.
    pub keyring_service: String,
    /// PBKDF2 rounds. Secrets are only readable with the count they were
    /// saved with, so changing this on an existing vault locks it for good.
    pub kdf_iterations: u32,
    pub lockout_threshold: u32,
    pub lockout_base_minutes: u64,
    pub lockout_max_minutes: u64,
    /// Text shown by the platform biometric prompt.
    pub biometric_prompt: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            wallet_id: "wallet".to_string(),
            keyring_service: "com.seedvault.vault".to_string(),
            kdf_iterations: PBKDF2_ITERATIONS,
            lockout_threshold: 5,
            lockout_base_minutes: 1,
            lockout_max_minutes: 60,
            biometric_prompt: "Unlock your wallet".to_string(),
        }
    }
}

impl VaultConfig {
    pub fn lockout_policy(&self) -> LockoutPolicy {
        LockoutPolicy {
            threshold: self.lockout_threshold,
            base_minutes: self.lockout_base_minutes,
            max_minutes: self.lockout_max_minutes,
        }
    }

    pub fn kdf(&self) -> Kdf {
        Kdf::new(self.kdf_iterations)
    }

    fn validate(&self) -> Result<()> {
        if self.wallet_id.is_empty() {
            return Err(SeedVaultError::Config("wallet_id must not be empty".into()));
        }
        if self.kdf_iterations == 0 {
            return Err(SeedVaultError::Config(
                "kdf_iterations must be at least 1".into(),
            ));
        }
        if self.lockout_threshold == 0 {
            return Err(SeedVaultError::Config(
                "lockout_threshold must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn get_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Load the configuration from `data_dir`, or defaults when none was saved.
pub fn load_config(data_dir: &Path) -> Result<VaultConfig> {
    let path = get_config_path(data_dir);

    if !path.exists() {
        return Ok(VaultConfig::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let config: VaultConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config(data_dir: &Path, config: &VaultConfig) -> Result<()> {
    config.validate()?;
    std::fs::create_dir_all(data_dir)?;
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(get_config_path(data_dir), content)?;
    Ok(())
}
