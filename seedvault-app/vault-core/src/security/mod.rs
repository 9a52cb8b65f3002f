pub mod cipher;
pub mod kdf;
pub mod legacy;

pub use kdf::{derive, DerivedKey, Kdf, KEY_LEN, PBKDF2_ITERATIONS};
