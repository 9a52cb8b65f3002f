//! VaultManager - PIN-protected storage of the recovery seed.
//!
//! This module provides the VaultManager struct that handles:
//! - Saving the seed under a PIN-derived AES-256-GCM key
//! - Loading it back behind a failed-attempt lockout
//! - Upgrading secrets written in the legacy XOR format on first read
//! - Escrowing the PIN behind biometrics for a faster unlock
//!
//! The encryption key is derived from the PIN using PBKDF2-HMAC-SHA256 with a
//! fresh salt per save. The same derivation doubles as the verification tag,
//! so a wrong PIN is rejected before the ciphertext is touched.

use seedvault_securestore::{SecretStorageStatus, SecureStore};
use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

use super::auth::VaultStatus;
use super::biometric::BiometricEscrow;
use super::error::{VaultError, VaultResult};
use super::keys::StorageKeys;
use super::lockout::{LockoutPolicy, LockoutState};
use super::lockout_persistence::LockoutStore;
use super::salt::generate_salt;
use crate::clock::{Clock, SystemClock};
use crate::config::VaultConfig;
use crate::security::{cipher, legacy, Kdf, KEY_LEN};

/// Decides whether a legacy-decoded plaintext is genuine. There is no
/// integrity tag in that format, so this is the only thing standing between
/// a wrong PIN and garbage being accepted as the seed.
pub type PlaintextCheck = fn(&str) -> bool;

/// VaultManager guards a single seed for one wallet identity.
///
/// All lockout bookkeeping happens in memory and is written through to the
/// [`LockoutStore`] after every change, so a restart does not reset the
/// counter.
pub struct VaultManager {
    store: Box<dyn SecureStore>,
    lockout_store: Box<dyn LockoutStore>,
    clock: Box<dyn Clock>,
    keys: StorageKeys,
    policy: LockoutPolicy,
    kdf: Kdf,
    lockout: LockoutState,
    plaintext_check: PlaintextCheck,
    escrow: BiometricEscrow,
}

impl VaultManager {
    /// Create a VaultManager over `store`, restoring the lockout state from
    /// `lockout_store`.
    ///
    /// # Errors
    /// Returns an error if the persisted lockout state cannot be read.
    pub fn new(
        config: &VaultConfig,
        store: impl SecureStore + 'static,
        lockout_store: impl LockoutStore + 'static,
    ) -> VaultResult<Self> {
        let keys = StorageKeys::for_wallet(&config.wallet_id);
        let lockout = lockout_store.load()?;
        if lockout.failed_attempts > 0 {
            debug!(
                "Restored {} failed attempts for {}",
                lockout.failed_attempts, config.wallet_id
            );
        }

        Ok(Self {
            escrow: BiometricEscrow::new(keys.biometric_pin.clone(), config.biometric_prompt.clone()),
            store: Box::new(store),
            lockout_store: Box::new(lockout_store),
            clock: Box::new(SystemClock),
            keys,
            policy: config.lockout_policy(),
            kdf: config.kdf(),
            lockout,
            plaintext_check: legacy::looks_like_mnemonic,
        })
    }

    /// Replace the time source used for lockout decisions.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the check applied to plaintext decoded from the legacy format.
    pub fn with_plaintext_check(mut self, check: PlaintextCheck) -> Self {
        self.plaintext_check = check;
        self
    }

    /// Availability of the underlying secure store.
    pub fn storage_status(&self) -> VaultResult<SecretStorageStatus> {
        Ok(self.store.check_availability()?)
    }

    /// Check if a secret has been saved. Never prompts.
    pub fn has_secret(&self) -> VaultResult<bool> {
        Ok(self.store.exists(&self.keys.secret)?)
    }

    /// Encrypt and store `plaintext` under `pin`, replacing any previous
    /// secret.
    ///
    /// A fresh salt is drawn on every call. A successful save clears the
    /// failed-attempt counter, and an enabled biometric escrow is rewritten
    /// with `pin`.
    ///
    /// # Errors
    /// Returns `StorageWriteFailed` if any entry cannot be written. Entries
    /// written before the failure are left in place; repeat the save.
    pub fn save_secret(&mut self, plaintext: &str, pin: &str) -> VaultResult<()> {
        let salt = generate_salt();
        let key = self.kdf.derive(pin, &salt, KEY_LEN);
        if key.is_degraded() {
            return Err(VaultError::EncryptionFailed(
                "PBKDF2 unavailable; refusing to save under a degraded key".into(),
            ));
        }

        let blob = cipher::seal(plaintext.as_bytes(), key.as_bytes())?;

        // The seed is replaced by its own write, last, so a failure anywhere
        // before that leaves the previous blob readable.
        for entry in [&self.keys.salt, &self.keys.verifier] {
            self.store.delete(entry).map_err(write_failed)?;
        }
        self.store.put(&self.keys.salt, &salt).map_err(write_failed)?;
        self.store
            .put(&self.keys.verifier, key.as_bytes())
            .map_err(write_failed)?;
        self.store.put(&self.keys.secret, &blob).map_err(write_failed)?;

        if self.escrow.is_enabled(self.store.as_ref())? {
            self.escrow.enable(self.store.as_ref(), pin)?;
        }

        self.lockout.record_success();
        self.persist_lockout()?;

        info!("Secret saved ({} byte blob)", blob.len());
        Ok(())
    }

    /// Verify `pin` and return the decrypted secret.
    ///
    /// Returns `Ok(None)` for a wrong PIN, which counts as a failed attempt.
    ///
    /// # Errors
    /// - `LockedOut` while a lockout window is running; nothing is derived.
    /// - `NotSetup` if no secret exists. Not counted as an attempt.
    /// - `DecryptionFailed` if the PIN verified but the blob did not.
    pub fn load_secret(&mut self, pin: &str) -> VaultResult<Option<Zeroizing<String>>> {
        let now = self.clock.now();
        if self.lockout.is_locked_out(now) {
            return Err(VaultError::LockedOut {
                remaining_seconds: self.lockout.remaining_seconds(now),
            });
        }

        let blob = match self.store.get(&self.keys.secret)? {
            Some(blob) => Zeroizing::new(blob),
            None => return Err(VaultError::NotSetup),
        };

        match self.store.get(&self.keys.salt)? {
            Some(salt) => self.load_current(&blob, &salt, pin),
            None => self.load_legacy(&blob, pin),
        }
    }

    fn load_current(
        &mut self,
        blob: &[u8],
        salt: &[u8],
        pin: &str,
    ) -> VaultResult<Option<Zeroizing<String>>> {
        let key = self.kdf.derive(pin, salt, KEY_LEN);
        if key.is_degraded() {
            warn!("Loading with a degraded key; re-save once PBKDF2 is available");
        }

        let opened = match self.store.get(&self.keys.verifier)? {
            Some(tag) => {
                if !key.matches(&tag) {
                    return self.wrong_pin();
                }
                self.record_success()?;
                cipher::open(blob, key.as_bytes()).ok_or(VaultError::DecryptionFailed)?
            }
            None => {
                warn!("Verifier entry missing; authenticating against the ciphertext");
                match cipher::open(blob, key.as_bytes()) {
                    Some(opened) => {
                        self.record_success()?;
                        opened
                    }
                    None => return self.wrong_pin(),
                }
            }
        };

        let plaintext = into_string(opened)?;
        self.refresh_escrow(pin);
        Ok(Some(plaintext))
    }

    fn load_legacy(&mut self, blob: &[u8], pin: &str) -> VaultResult<Option<Zeroizing<String>>> {
        let decoded = legacy::apply_keystream(blob, pin);
        let plaintext = match std::str::from_utf8(&decoded) {
            Ok(text) if (self.plaintext_check)(text) => Zeroizing::new(text.to_string()),
            _ => return self.wrong_pin(),
        };

        self.record_success()?;
        info!("Migrating legacy secret to the current format");
        if let Err(e) = self.save_secret(&plaintext, pin) {
            self.abandon_migration(blob);
            return Err(e);
        }
        Ok(Some(plaintext))
    }

    /// Clean up after a failed migration so the next load sees a consistent
    /// format.
    ///
    /// The seed is written last, so while it still holds the legacy blob only
    /// the new salt and verifier need to go. Once it holds the new blob, the
    /// new triple is complete and is kept as is.
    fn abandon_migration(&self, legacy_blob: &[u8]) {
        match self.store.get(&self.keys.secret) {
            Ok(Some(current)) if current.as_slice() == legacy_blob => {
                warn!("Legacy migration failed; keeping the legacy secret");
                for entry in [&self.keys.salt, &self.keys.verifier] {
                    if let Err(e) = self.store.delete(entry) {
                        warn!("Failed to remove {} after migration failure: {}", entry, e);
                    }
                }
            }
            Ok(_) => warn!("Legacy migration stored the new secret but did not finish"),
            Err(e) => warn!("Could not inspect secret after migration failure: {}", e),
        }
    }

    /// Delete the secret and every entry that belongs to it, including the
    /// biometric escrow. The failed-attempt counter is left alone.
    pub fn delete_secret(&mut self) -> VaultResult<()> {
        info!("Deleting secret - the seed will be unrecoverable from this device");
        for entry in [
            &self.keys.secret,
            &self.keys.salt,
            &self.keys.verifier,
            &self.keys.biometric_pin,
        ] {
            self.store.delete(entry).map_err(write_failed)?;
        }
        Ok(())
    }

    /// Change the PIN. The old PIN goes through the usual lockout rules.
    ///
    /// Returns `Ok(false)` if `old_pin` is wrong.
    pub fn change_pin(&mut self, old_pin: &str, new_pin: &str) -> VaultResult<bool> {
        let Some(plaintext) = self.load_secret(old_pin)? else {
            return Ok(false);
        };
        self.save_secret(&plaintext, new_pin)?;
        info!("PIN changed");
        Ok(true)
    }

    /// Escrow `pin` behind the current biometric enrollment.
    pub fn enable_biometric(&self, pin: &str) -> VaultResult<()> {
        self.escrow.enable(self.store.as_ref(), pin)
    }

    pub fn disable_biometric(&self) -> VaultResult<()> {
        self.escrow.disable(self.store.as_ref())
    }

    pub fn has_biometric_enabled(&self) -> VaultResult<bool> {
        self.escrow.is_enabled(self.store.as_ref())
    }

    /// Prompt for biometrics and return the escrowed PIN, or `None` when the
    /// user has to type it.
    pub fn retrieve_via_biometric(&self) -> VaultResult<Option<Zeroizing<String>>> {
        self.escrow.retrieve(self.store.as_ref())
    }

    pub fn verify_biometric_pin(&self, candidate: &str) -> VaultResult<bool> {
        self.escrow.verify(self.store.as_ref(), candidate)
    }

    /// Clear the failed-attempt counter and any running lockout.
    pub fn reset_failed_attempts(&mut self) -> VaultResult<()> {
        self.lockout.reset();
        self.persist_lockout()?;
        info!("Failed attempts reset");
        Ok(())
    }

    pub fn is_locked_out(&self) -> bool {
        self.lockout.is_locked_out(self.clock.now())
    }

    pub fn lockout_remaining_seconds(&self) -> u64 {
        self.lockout.remaining_seconds(self.clock.now())
    }

    pub fn failed_attempts(&self) -> u32 {
        self.lockout.failed_attempts
    }

    /// Status of the vault, without prompting or deriving anything.
    pub fn status(&self) -> VaultResult<VaultStatus> {
        if !self.has_secret()? {
            return Ok(VaultStatus::NotSetup);
        }
        let now = self.clock.now();
        if self.lockout.is_locked_out(now) {
            return Ok(VaultStatus::LockedOut {
                remaining_seconds: self.lockout.remaining_seconds(now),
            });
        }
        Ok(VaultStatus::Locked)
    }

    fn wrong_pin(&mut self) -> VaultResult<Option<Zeroizing<String>>> {
        let now = self.clock.now();
        self.lockout.record_failure(now, &self.policy);
        self.persist_lockout()?;

        if self.lockout.is_locked_out(now) {
            warn!(
                "Wrong PIN ({} consecutive); locked out for {}s",
                self.lockout.failed_attempts,
                self.lockout.remaining_seconds(now)
            );
        } else {
            info!("Wrong PIN ({} consecutive)", self.lockout.failed_attempts);
        }
        Ok(None)
    }

    fn record_success(&mut self) -> VaultResult<()> {
        if self.lockout.failed_attempts == 0 {
            return Ok(());
        }
        self.lockout.record_success();
        self.persist_lockout()
    }

    /// Rewrite an existing escrow with the raw PIN. Upgrades hashed escrows.
    fn refresh_escrow(&self, pin: &str) {
        match self.escrow.is_enabled(self.store.as_ref()) {
            Ok(true) => {
                if let Err(e) = self.escrow.enable(self.store.as_ref(), pin) {
                    warn!("Failed to refresh biometric escrow: {}", e);
                }
            }
            Ok(false) => {}
            Err(e) => warn!("Could not check biometric escrow: {}", e),
        }
    }

    fn persist_lockout(&self) -> VaultResult<()> {
        self.lockout_store.save(&self.lockout)
    }
}

fn write_failed(err: seedvault_securestore::Error) -> VaultError {
    VaultError::StorageWriteFailed(err.to_string())
}

fn into_string(mut bytes: Zeroizing<Vec<u8>>) -> VaultResult<Zeroizing<String>> {
    match String::from_utf8(std::mem::take(&mut *bytes)) {
        Ok(text) => Ok(Zeroizing::new(text)),
        Err(e) => {
            e.into_bytes().zeroize();
            Err(VaultError::DecryptionFailed)
        }
    }
}
