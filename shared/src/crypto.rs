//! AES-256-GCM sealing for secrets stored in the database (user API keys).

use crate::error::{AppError, Result};
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    AeadCore, Aes256Gcm, Key, Nonce,
};
use base64::Engine;
use sha2::Sha256;

const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;
const KDF_ROUNDS: u32 = 100_000;
const KDF_SALT: &[u8] = b"signalhub.user-secrets.v1";

#[derive(Clone)]
pub struct SecretBox {
    cipher: Aes256Gcm,
}

impl SecretBox {
    /// Derive the AES key from an operator passphrase.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut key = [0u8; KEY_SIZE];
        pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), KDF_SALT, KDF_ROUNDS, &mut key);
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
        }
    }

    /// Returns `base64(nonce):base64(ciphertext)`.
    pub fn seal(&self, plaintext: &str) -> Result<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| AppError::Encryption(e.to_string()))?;

        let engine = base64::engine::general_purpose::STANDARD;
        Ok(format!("{}:{}", engine.encode(nonce), engine.encode(ciphertext)))
    }

    pub fn open(&self, sealed: &str) -> Result<String> {
        let (nonce_b64, ciphertext_b64) = sealed
            .split_once(':')
            .ok_or_else(|| AppError::Encryption("Malformed sealed value".to_string()))?;

        let engine = base64::engine::general_purpose::STANDARD;
        let nonce_bytes = engine
            .decode(nonce_b64)
            .map_err(|e| AppError::Encryption(format!("Invalid nonce base64: {}", e)))?;
        let ciphertext = engine
            .decode(ciphertext_b64)
            .map_err(|e| AppError::Encryption(format!("Invalid ciphertext base64: {}", e)))?;

        if nonce_bytes.len() != NONCE_SIZE {
            return Err(AppError::Encryption(format!(
                "Invalid nonce size: expected {}, got {}",
                NONCE_SIZE,
                nonce_bytes.len()
            )));
        }

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|e| AppError::Encryption(format!("Decryption failed: {}", e)))?;

        String::from_utf8(plaintext)
            .map_err(|e| AppError::Encryption(format!("Invalid UTF-8 in plaintext: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_then_open() {
        let secrets = SecretBox::from_passphrase("operator passphrase");
        let sealed = secrets.seal("sk-test-123").unwrap();
        assert!(!sealed.contains("sk-test-123"));
        assert_eq!(secrets.open(&sealed).unwrap(), "sk-test-123");
    }

    #[test]
    fn test_same_plaintext_gets_fresh_nonce() {
        let secrets = SecretBox::from_passphrase("operator passphrase");
        assert_ne!(secrets.seal("same").unwrap(), secrets.seal("same").unwrap());
    }

    #[test]
    fn test_wrong_passphrase_fails() {
        let sealed = SecretBox::from_passphrase("one").seal("value").unwrap();
        assert!(SecretBox::from_passphrase("two").open(&sealed).is_err());
    }

    #[test]
    fn test_malformed_value_is_rejected() {
        let secrets = SecretBox::from_passphrase("x");
        assert!(secrets.open("no-separator").is_err());
    }
}
