//! AES-256-GCM sealing for the persistent tier.
//!
//! Sealed values are `base64(nonce || ciphertext || tag)` with a 12-byte
//! nonce drawn fresh for every write.

use crate::domain_port::StorageError;
use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};

pub const KEY_LENGTH: usize = 32;
pub const NONCE_LENGTH: usize = 12;

#[derive(Clone)]
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    pub fn new(key: [u8; KEY_LENGTH]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(&key);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Accepts a base64-encoded 32-byte key; anything else is treated as a
    /// passphrase and stretched with SHA-256.
    pub fn from_key_material(material: &str) -> Self {
        if let Ok(bytes) = STANDARD.decode(material.trim()) {
            if bytes.len() == KEY_LENGTH {
                let mut key = [0u8; KEY_LENGTH];
                key.copy_from_slice(&bytes);
                return Self::new(key);
            }
        }
        let digest = Sha256::digest(material.as_bytes());
        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&digest[..]);
        Self::new(key)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, StorageError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| StorageError::Encryption(e.to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(combined))
    }

    pub fn decrypt(&self, sealed: &str) -> Result<String, StorageError> {
        let combined = STANDARD
            .decode(sealed)
            .map_err(|e| StorageError::Decryption(format!("invalid base64: {}", e)))?;
        if combined.len() < NONCE_LENGTH {
            return Err(StorageError::Decryption("ciphertext too short".to_string()));
        }
        let (nonce, ciphertext) = combined.split_at(NONCE_LENGTH);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| StorageError::Decryption(e.to_string()))?;
        String::from_utf8(plaintext).map_err(|e| StorageError::Decryption(e.to_string()))
    }
}
