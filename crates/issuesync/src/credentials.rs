//! Access-token decryption contract.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to decrypt credential: {0}")]
    Decrypt(String),

    #[error("Failed to encrypt credential: {0}")]
    Encrypt(String),
}

/// Encrypts and decrypts stored provider credentials.
///
/// The engine only ever decrypts; `encrypt` exists for the code that stores
/// new connections.
pub trait SecretCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, CredentialError>;

    fn decrypt(&self, ciphertext: &str) -> Result<String, CredentialError>;
}

/// Stores tokens as-is, tagged with a `plain:` prefix.
///
/// Suitable for local development databases only. Untagged values are
/// rejected on decrypt so that a database written by a real cipher is not
/// silently misread.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextCipher;

const PLAINTEXT_PREFIX: &str = "plain:";

impl SecretCipher for PlaintextCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CredentialError> {
        Ok(format!("{PLAINTEXT_PREFIX}{plaintext}"))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CredentialError> {
        ciphertext
            .strip_prefix(PLAINTEXT_PREFIX)
            .map(str::to_string)
            .ok_or_else(|| CredentialError::Decrypt("value is not a plaintext envelope".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_round_trip() {
        let cipher = PlaintextCipher;
        let stored = cipher.encrypt("ghp_secret").unwrap();
        assert_eq!(stored, "plain:ghp_secret");
        assert_eq!(cipher.decrypt(&stored).unwrap(), "ghp_secret");
    }

    #[test]
    fn empty_token_is_allowed() {
        let cipher = PlaintextCipher;
        assert_eq!(cipher.decrypt(&cipher.encrypt("").unwrap()).unwrap(), "");
    }

    #[test]
    fn foreign_ciphertext_is_rejected() {
        let err = PlaintextCipher.decrypt("v1:AES:abcdef").unwrap_err();
        assert!(matches!(err, CredentialError::Decrypt(_)));
    }
}
