//! Salt generation for PIN key derivation.
//!
//! Every save draws a new 16-byte salt, so identical PINs give different
//! keys across saves and across devices. The salt lives next to the
//! ciphertext in the secure store; its absence marks a legacy secret.

use rand::RngCore;

/// Salt size in bytes (128 bits)
pub const SALT_SIZE: usize = 16;

/// Generate a fresh cryptographically random salt.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::rng().fill_bytes(&mut salt);
    salt
}
