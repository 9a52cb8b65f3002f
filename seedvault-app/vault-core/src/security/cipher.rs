//! Authenticated encryption of the seed using AES-256-GCM.
//!
//! Blob format: `[12-byte nonce][ciphertext with 16-byte auth tag]`

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::vault::{VaultError, VaultResult};

/// Nonce size for AES-GCM (96 bits = 12 bytes)
pub const NONCE_SIZE: usize = 12;

/// Authentication tag appended by AES-GCM.
pub const TAG_SIZE: usize = 16;

/// Encrypt `plaintext` under a fresh random nonce.
pub fn seal(plaintext: &[u8], key: &[u8]) -> VaultResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| VaultError::EncryptionFailed(format!("Invalid key: {}", e)))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::EncryptionFailed(format!("Encryption failed: {}", e)))?;

    let mut output = nonce_bytes.to_vec();
    output.extend(ciphertext);
    Ok(output)
}

/// Decrypt a blob produced by [`seal`].
///
/// `None` means the tag did not verify (wrong key or tampered blob), the blob
/// is too short, or the key has the wrong length.
pub fn open(blob: &[u8], key: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
    if blob.len() < NONCE_SIZE + TAG_SIZE {
        return None;
    }

    let cipher = Aes256Gcm::new_from_slice(key).ok()?;
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher.decrypt(nonce, ciphertext).ok().map(Zeroizing::new)
}
