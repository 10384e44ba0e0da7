//! ChaCha20-Poly1305 authenticated encryption

use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    ChaCha20Poly1305, Key, Nonce,
};

use super::aes::{NONCE_LEN, TAG_LEN};
use crate::error::{Error, Result};

/// ChaCha20-Poly1305 cipher wrapper
pub struct ChaCha {
    cipher: ChaCha20Poly1305,
}

impl ChaCha {
    /// Create a new ChaCha20-Poly1305 cipher from a 32-byte key
    pub fn new(key: &[u8; 32]) -> Result<Self> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
        Ok(Self { cipher })
    }

    /// Encrypt data with ChaCha20-Poly1305 (auto-generated nonce)
    ///
    /// Returns encrypted data with 12-byte nonce prepended
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| Error::Encryption(format!("ChaCha20-Poly1305 encryption failed: {}", e)))?;

        let mut result = Vec::with_capacity(nonce.len() + ciphertext.len());
        result.extend_from_slice(&nonce);
        result.extend_from_slice(&ciphertext);

        Ok(result)
    }

    /// Decrypt data produced by [`ChaCha::encrypt`]
    pub fn decrypt(&self, encrypted_data: &[u8]) -> Result<Vec<u8>> {
        if encrypted_data.len() < NONCE_LEN + TAG_LEN {
            return Err(Error::Decryption(
                "Encrypted data too short for ChaCha20-Poly1305".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = encrypted_data.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| Error::Decryption(format!("ChaCha20-Poly1305 decryption failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let chacha = ChaCha::new(&[9u8; 32]).unwrap();
        let encrypted = chacha.encrypt(b"Hello, ChaCha20-Poly1305!").unwrap();
        assert_eq!(chacha.decrypt(&encrypted).unwrap(), b"Hello, ChaCha20-Poly1305!");

        let other = ChaCha::new(&[8u8; 32]).unwrap();
        assert!(matches!(other.decrypt(&encrypted), Err(Error::Decryption(_))));
    }
}
