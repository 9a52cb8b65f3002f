//! Legacy seed format: XOR with the unsalted SHA-256 digest of the PIN.
//!
//! Only ever used to read secrets saved before salts and AEAD were added.
//! There is no integrity tag, so a wrong PIN yields garbage instead of an
//! error and callers must check the plaintext shape before trusting it.

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Word counts accepted by [`looks_like_mnemonic`].
const MNEMONIC_WORD_COUNTS: [usize; 7] = [12, 13, 15, 18, 21, 24, 25];

fn legacy_key(pin: &str) -> Zeroizing<[u8; 32]> {
    Zeroizing::new(Sha256::digest(pin.as_bytes()).into())
}

/// Apply the legacy keystream. XOR is its own inverse, so this both encodes
/// and decodes.
pub fn apply_keystream(data: &[u8], pin: &str) -> Zeroizing<Vec<u8>> {
    let key = legacy_key(pin);
    Zeroizing::new(
        data.iter()
            .zip(key.iter().cycle())
            .map(|(byte, key_byte)| byte ^ key_byte)
            .collect(),
    )
}

/// Whether a decoded plaintext has the shape of a recovery phrase: UTF-8,
/// a standard word count, lowercase ASCII words separated by single spaces.
pub fn looks_like_mnemonic(plaintext: &str) -> bool {
    let words: Vec<&str> = plaintext.split(' ').collect();
    MNEMONIC_WORD_COUNTS.contains(&words.len())
        && words
            .iter()
            .all(|word| !word.is_empty() && word.bytes().all(|b| b.is_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_keystream_round_trip() {
        let encoded = apply_keystream(SEED.as_bytes(), "123456");
        assert_ne!(encoded.as_slice(), SEED.as_bytes());
        let decoded = apply_keystream(&encoded, "123456");
        assert_eq!(decoded.as_slice(), SEED.as_bytes());
    }

    #[test]
    fn test_keystream_repeats_digest() {
        let zeros = [0u8; 64];
        let stream = apply_keystream(&zeros, "123456");
        assert_eq!(
            hex::encode(&stream[..32]),
            "8d969eef6ecad3c29a3a629280e686cf0c3f5d5a86aff3ca12020c923adc6c92"
        );
        assert_eq!(stream[..32], stream[32..]);
    }

    #[test]
    fn test_wrong_pin_fails_shape_check() {
        let encoded = apply_keystream(SEED.as_bytes(), "123456");
        let decoded = apply_keystream(&encoded, "000000");
        let shaped = std::str::from_utf8(&decoded)
            .map(looks_like_mnemonic)
            .unwrap_or(false);
        assert!(!shaped);
    }

    #[test]
    fn test_mnemonic_shape() {
        assert!(looks_like_mnemonic(SEED));
        assert!(!looks_like_mnemonic("abandon about"));
        assert!(!looks_like_mnemonic(&SEED.to_uppercase()));
        assert!(!looks_like_mnemonic(&SEED.replace(' ', "  ")));
        assert!(!looks_like_mnemonic(""));
    }
}
