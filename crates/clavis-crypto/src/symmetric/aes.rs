//! AES-256-GCM authenticated encryption

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Key, Nonce,
};

use crate::error::{Error, Result};

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// AES-256-GCM cipher wrapper
pub struct Aes {
    cipher: Aes256Gcm,
}

impl Aes {
    /// Create a new AES-256-GCM cipher from a 32-byte key
    pub fn new(key: &[u8; 32]) -> Result<Self> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        Ok(Self { cipher })
    }

    /// Encrypt data with AES-256-GCM (auto-generated nonce)
    ///
    /// Returns encrypted data with 12-byte nonce prepended
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| Error::Encryption(format!("AES-GCM encryption failed: {}", e)))?;

        let mut result = Vec::with_capacity(nonce.len() + ciphertext.len());
        result.extend_from_slice(&nonce);
        result.extend_from_slice(&ciphertext);

        Ok(result)
    }

    /// Decrypt data produced by [`Aes::encrypt`]
    pub fn decrypt(&self, encrypted_data: &[u8]) -> Result<Vec<u8>> {
        if encrypted_data.len() < NONCE_LEN + TAG_LEN {
            return Err(Error::Decryption(
                "Encrypted data too short for AES-GCM".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = encrypted_data.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| Error::Decryption(format!("AES-GCM decryption failed: {}", e)))
    }

    /// Encrypt with an external nonce, binding `aad`
    ///
    /// Returns ciphertext with the tag appended, nonce NOT prepended
    pub fn encrypt_with_nonce_and_aad(
        &self,
        plaintext: &[u8],
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        let payload = Payload {
            msg: plaintext,
            aad,
        };
        self.cipher
            .encrypt(Nonce::from_slice(nonce), payload)
            .map_err(|e| Error::Encryption(format!("AES-GCM encryption with AAD failed: {}", e)))
    }

    /// Decrypt with an external nonce, checking `aad`
    pub fn decrypt_with_nonce_and_aad(
        &self,
        encrypted_data: &[u8],
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        if encrypted_data.len() < TAG_LEN {
            return Err(Error::Decryption(
                "Encrypted data too short for AES-GCM tag".to_string(),
            ));
        }
        let payload = Payload {
            msg: encrypted_data,
            aad,
        };
        self.cipher
            .decrypt(Nonce::from_slice(nonce), payload)
            .map_err(|e| Error::Decryption(format!("AES-GCM decryption with AAD failed: {}", e)))
    }
}
