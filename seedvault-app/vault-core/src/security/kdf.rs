//! PIN-based key derivation.
//!
//! One PBKDF2-HMAC-SHA256 derivation serves both purposes: its output is
//! stored as the verification tag and used as the AES-256-GCM key.

use hmac::Hmac;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// PBKDF2 rounds used for every current secret.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Output length for keys and verification tags (256 bits).
pub const KEY_LEN: usize = 32;

/// Derived key material, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: Vec<u8>,
    /// Set when PBKDF2 could not run and the single-hash fallback was used.
    #[zeroize(skip)]
    degraded: bool,
}

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True when this key came from the SHA-256 fallback instead of PBKDF2.
    /// Such a key is far cheaper to brute-force.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Constant-time comparison against a stored verification tag.
    pub fn matches(&self, tag: &[u8]) -> bool {
        self.bytes.as_slice().ct_eq(tag).into()
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log the actual key material
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .field("degraded", &self.degraded)
            .finish()
    }
}

/// PBKDF2-HMAC-SHA256 with a fixed round count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kdf {
    iterations: u32,
}

impl Kdf {
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Derive `output_len` bytes from `pin` and `salt`.
    ///
    /// Deterministic for fixed inputs. If PBKDF2 cannot run, falls back to a
    /// single SHA-256 of the PIN and marks the result as degraded.
    pub fn derive(&self, pin: &str, salt: &[u8], output_len: usize) -> DerivedKey {
        if self.iterations == 0 {
            warn!("PBKDF2 configured with zero rounds; using degraded SHA-256 key");
            return fallback(pin, output_len);
        }

        let mut bytes = vec![0u8; output_len];
        match pbkdf2::pbkdf2::<Hmac<Sha256>>(pin.as_bytes(), salt, self.iterations, &mut bytes) {
            Ok(()) => {
                debug!(
                    "Derived {}-byte key with {} PBKDF2 rounds",
                    output_len, self.iterations
                );
                DerivedKey {
                    bytes,
                    degraded: false,
                }
            }
            Err(e) => {
                bytes.zeroize();
                warn!("PBKDF2 failed ({}); using degraded SHA-256 key", e);
                fallback(pin, output_len)
            }
        }
    }
}

impl Default for Kdf {
    fn default() -> Self {
        Self::new(PBKDF2_ITERATIONS)
    }
}

/// Derive with the standard round count.
pub fn derive(pin: &str, salt: &[u8], output_len: usize) -> DerivedKey {
    Kdf::default().derive(pin, salt, output_len)
}

fn fallback(pin: &str, output_len: usize) -> DerivedKey {
    let mut digest = Sha256::digest(pin.as_bytes());
    let bytes = digest.iter().copied().cycle().take(output_len).collect();
    digest.as_mut_slice().zeroize();
    DerivedKey {
        bytes,
        degraded: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pbkdf2_known_answers() {
        let one = Kdf::new(1).derive("password", b"salt", KEY_LEN);
        assert_eq!(
            hex::encode(one.as_bytes()),
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
        );

        let many = Kdf::new(4096).derive("password", b"salt", KEY_LEN);
        assert_eq!(
            hex::encode(many.as_bytes()),
            "c5e478d59288c841aa530db6845c4c8d962893a001ce4e11a4963873aa98134a"
        );
        assert!(!many.is_degraded());
    }

    #[test]
    fn test_derive_deterministic() {
        let salt = [7u8; 16];
        let key1 = Kdf::new(1000).derive("123456", &salt, KEY_LEN);
        let key2 = Kdf::new(1000).derive("123456", &salt, KEY_LEN);
        assert_eq!(key1.as_bytes(), key2.as_bytes());
        assert_eq!(key1.as_bytes().len(), KEY_LEN);
        assert!(key1.matches(key2.as_bytes()));
    }

    #[test]
    fn test_derive_varies_with_pin_and_salt() {
        let kdf = Kdf::new(1000);
        let base = kdf.derive("123456", &[1u8; 16], KEY_LEN);
        let other_pin = kdf.derive("000000", &[1u8; 16], KEY_LEN);
        let other_salt = kdf.derive("123456", &[2u8; 16], KEY_LEN);

        assert!(!base.matches(other_pin.as_bytes()));
        assert!(!base.matches(other_salt.as_bytes()));
    }

    #[test]
    fn test_default_uses_standard_rounds() {
        assert_eq!(Kdf::default().iterations(), 100_000);

        let key = derive("123456", &[3u8; 16], KEY_LEN);
        let expected = Kdf::new(100_000).derive("123456", &[3u8; 16], KEY_LEN);
        assert!(!key.is_degraded());
        assert!(key.matches(expected.as_bytes()));
        assert!(!key.matches(Kdf::new(99_999).derive("123456", &[3u8; 16], KEY_LEN).as_bytes()));
    }

    #[test]
    fn test_fallback_is_flagged() {
        let key = Kdf::new(0).derive("123456", &[1u8; 16], KEY_LEN);
        assert!(key.is_degraded());
        assert_eq!(
            hex::encode(key.as_bytes()),
            "8d969eef6ecad3c29a3a629280e686cf0c3f5d5a86aff3ca12020c923adc6c92"
        );
    }

    #[test]
    fn test_matches_rejects_wrong_length() {
        let key = Kdf::new(1).derive("123456", b"salt", KEY_LEN);
        assert!(!key.matches(&key.as_bytes()[..16]));
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = Kdf::new(1).derive("123456", b"salt", KEY_LEN);
        let rendered = format!("{:?}", key);
        assert!(rendered.contains("REDACTED"));
    }
}
