//! Biometric escrow of the PIN.
//!
//! The PIN is copied into the secure store behind a biometric access policy
//! bound to the currently enrolled set. Reading it back shows the platform
//! prompt; any refusal quietly falls back to manual PIN entry.
//!
//! Older releases escrowed `HMAC-SHA256(ESCROW_HMAC_KEY, pin)` instead of
//! the PIN. Such entries still verify, and are rewritten in raw form as soon
//! as the PIN is known.

use hmac::{Hmac, Mac};
use seedvault_securestore::{AccessPolicy, SecureStore};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

use super::error::{VaultError, VaultResult};

/// Key of the HMAC used by the hashed escrow format.
pub const ESCROW_HMAC_KEY: &[u8] = b"seedvault.biometric-escrow.v1";

const HASHED_ESCROW_LEN: usize = 32;

/// Keyed hash stored by the hashed escrow format.
pub fn legacy_escrow_hash(pin: &str) -> VaultResult<[u8; HASHED_ESCROW_LEN]> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(ESCROW_HMAC_KEY)
        .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;
    mac.update(pin.as_bytes());
    Ok(mac.finalize().into_bytes().into())
}

/// Stored escrow contents, by format.
enum EscrowValue {
    Raw(Zeroizing<Vec<u8>>),
    Hashed(Zeroizing<Vec<u8>>),
}

impl EscrowValue {
    /// Raw PINs are always UTF-8; a 32-byte value that is not is an HMAC
    /// output.
    fn classify(bytes: Zeroizing<Vec<u8>>) -> Self {
        if bytes.len() == HASHED_ESCROW_LEN && std::str::from_utf8(&bytes).is_err() {
            EscrowValue::Hashed(bytes)
        } else {
            EscrowValue::Raw(bytes)
        }
    }
}

/// Escrow entry for one wallet.
#[derive(Debug, Clone)]
pub struct BiometricEscrow {
    key: String,
    prompt: String,
}

impl BiometricEscrow {
    pub fn new(key: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            prompt: prompt.into(),
        }
    }

    /// Escrow `pin` behind the current biometric enrollment.
    pub fn enable(&self, store: &dyn SecureStore, pin: &str) -> VaultResult<()> {
        store
            .put_with_policy(&self.key, pin.as_bytes(), AccessPolicy::BiometryCurrentSet)
            .map_err(|e| VaultError::StorageWriteFailed(e.to_string()))?;
        info!("Biometric unlock enabled");
        Ok(())
    }

    pub fn disable(&self, store: &dyn SecureStore) -> VaultResult<()> {
        store
            .delete(&self.key)
            .map_err(|e| VaultError::StorageWriteFailed(e.to_string()))?;
        info!("Biometric unlock disabled");
        Ok(())
    }

    pub fn is_enabled(&self, store: &dyn SecureStore) -> VaultResult<bool> {
        Ok(store.exists(&self.key)?)
    }

    /// Prompt for biometrics and return the escrowed PIN.
    ///
    /// `None` on cancellation, rejection, invalidated enrollment, a missing
    /// entry, or a hashed entry that cannot yield the PIN.
    pub fn retrieve(&self, store: &dyn SecureStore) -> VaultResult<Option<Zeroizing<String>>> {
        let Some(bytes) = self.read(store)? else {
            return Ok(None);
        };

        match EscrowValue::classify(bytes) {
            EscrowValue::Raw(bytes) => match String::from_utf8(bytes.to_vec()) {
                Ok(pin) => Ok(Some(Zeroizing::new(pin))),
                Err(e) => {
                    e.into_bytes().zeroize();
                    warn!("Escrowed PIN is not valid UTF-8; manual entry required");
                    Ok(None)
                }
            },
            EscrowValue::Hashed(_) => {
                debug!("Hashed biometric escrow cannot yield a PIN; manual entry required");
                Ok(None)
            }
        }
    }

    /// Prompt for biometrics and compare `candidate` with the escrow,
    /// accepting both the raw and the hashed format. A hashed entry that
    /// matches is rewritten in raw form.
    pub fn verify(&self, store: &dyn SecureStore, candidate: &str) -> VaultResult<bool> {
        let Some(bytes) = self.read(store)? else {
            return Ok(false);
        };

        match EscrowValue::classify(bytes) {
            EscrowValue::Raw(stored) => Ok(stored.as_slice().ct_eq(candidate.as_bytes()).into()),
            EscrowValue::Hashed(stored) => {
                let expected = Zeroizing::new(legacy_escrow_hash(candidate)?);
                let matched: bool = stored.as_slice().ct_eq(expected.as_slice()).into();
                if matched {
                    info!("Migrating hashed biometric escrow to current format");
                    self.enable(store, candidate)?;
                }
                Ok(matched)
            }
        }
    }

    fn read(&self, store: &dyn SecureStore) -> VaultResult<Option<Zeroizing<Vec<u8>>>> {
        match store.get_with_prompt(&self.key, &self.prompt) {
            Ok(value) => Ok(value.map(Zeroizing::new)),
            Err(seedvault_securestore::Error::BiometricEnrollmentChanged) => {
                warn!("Biometric enrollment changed; discarding escrowed PIN");
                if let Err(e) = store.delete(&self.key) {
                    warn!("Failed to delete invalidated escrow: {}", e);
                }
                Ok(None)
            }
            Err(e) if e.is_biometric_refusal() => {
                debug!("Biometric challenge not passed: {}", e);
                Ok(None)
            }
            Err(seedvault_securestore::Error::SecretNotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedvault_securestore::{BiometricOutcome, MemoryStore};

    fn escrow() -> BiometricEscrow {
        BiometricEscrow::new("wallet.biometric_pin", "Unlock your wallet")
    }

    #[test]
    fn test_enable_retrieve_disable() {
        let store = MemoryStore::new();
        let escrow = escrow();
        assert!(!escrow.is_enabled(&store).unwrap());

        escrow.enable(&store, "123456").unwrap();
        assert!(escrow.is_enabled(&store).unwrap());
        assert_eq!(
            store.policy_of("wallet.biometric_pin").unwrap(),
            Some(AccessPolicy::BiometryCurrentSet)
        );
        assert_eq!(escrow.retrieve(&store).unwrap().as_deref().map(String::as_str), Some("123456"));

        escrow.disable(&store).unwrap();
        assert!(!escrow.is_enabled(&store).unwrap());
        assert!(escrow.retrieve(&store).unwrap().is_none());
    }

    #[test]
    fn test_refusal_yields_none() {
        let store = MemoryStore::new();
        let escrow = escrow();
        escrow.enable(&store, "123456").unwrap();

        store.set_biometric_outcome(BiometricOutcome::Cancel).unwrap();
        assert!(escrow.retrieve(&store).unwrap().is_none());
        assert!(!escrow.verify(&store, "123456").unwrap());

        store.set_biometric_outcome(BiometricOutcome::Reject).unwrap();
        assert!(escrow.retrieve(&store).unwrap().is_none());

        // Refusal does not remove the entry
        assert!(escrow.is_enabled(&store).unwrap());
    }

    #[test]
    fn test_enrollment_change_clears_escrow() {
        let store = MemoryStore::new();
        let escrow = escrow();
        escrow.enable(&store, "123456").unwrap();

        store.change_enrollment().unwrap();
        assert!(escrow.retrieve(&store).unwrap().is_none());
        assert!(!escrow.is_enabled(&store).unwrap());
    }

    #[test]
    fn test_verify_raw() {
        let store = MemoryStore::new();
        let escrow = escrow();
        escrow.enable(&store, "123456").unwrap();
        assert!(escrow.verify(&store, "123456").unwrap());
        assert!(!escrow.verify(&store, "000000").unwrap());
    }

    #[test]
    fn test_verify_hashed_migrates_to_raw() {
        let store = MemoryStore::new();
        let escrow = escrow();
        store
            .put_with_policy(
                "wallet.biometric_pin",
                &legacy_escrow_hash("123456").unwrap(),
                AccessPolicy::BiometryCurrentSet,
            )
            .unwrap();

        // A hashed entry cannot hand back the PIN
        assert!(escrow.retrieve(&store).unwrap().is_none());

        assert!(!escrow.verify(&store, "000000").unwrap());
        assert!(escrow.verify(&store, "123456").unwrap());

        assert_eq!(escrow.retrieve(&store).unwrap().as_deref().map(String::as_str), Some("123456"));
    }

    #[test]
    fn test_hash_is_keyed() {
        let a = legacy_escrow_hash("123456").unwrap();
        let b = legacy_escrow_hash("123457").unwrap();
        assert_ne!(a, b);
        // Not UTF-8, so never mistaken for a raw PIN
        assert!(std::str::from_utf8(&a).is_err());
    }

    #[test]
    fn test_non_ascii_pin_of_hash_length_stays_raw() {
        let store = MemoryStore::new();
        let escrow = escrow();
        let pin = "é".repeat(16);
        assert_eq!(pin.len(), 32);

        escrow.enable(&store, &pin).unwrap();
        assert_eq!(
            escrow.retrieve(&store).unwrap().as_deref().map(String::as_str),
            Some(pin.as_str())
        );
        assert!(escrow.verify(&store, &pin).unwrap());
        assert!(!escrow.verify(&store, "123456").unwrap());
    }
}
