//! Secure-store key names for one wallet identity.

/// The four secure-store entries that make up a vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub secret: String,
    pub salt: String,
    pub verifier: String,
    pub biometric_pin: String,
}

impl StorageKeys {
    pub fn for_wallet(wallet_id: &str) -> Self {
        Self {
            secret: format!("{}.seed", wallet_id),
            salt: format!("{}.salt", wallet_id),
            verifier: format!("{}.verifier", wallet_id),
            biometric_pin: format!("{}.biometric_pin", wallet_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_namespaced() {
        let keys = StorageKeys::for_wallet("hot");
        assert_eq!(keys.secret, "hot.seed");
        assert_eq!(keys.salt, "hot.salt");
        assert_eq!(keys.verifier, "hot.verifier");
        assert_eq!(keys.biometric_pin, "hot.biometric_pin");
    }
}
