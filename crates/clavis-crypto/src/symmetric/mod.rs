//! Symmetric (session) encryption
//!
//! Envelope encryption seals the payload with a one-time 32-byte key under
//! one of the AEAD algorithms below. Sealed bytes are always
//! `nonce(12) || ciphertext || tag(16)`.

pub mod aes;
pub mod chacha;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    error::{Error, Result},
    kdf::random_bytes,
    symmetric::{aes::Aes, chacha::ChaCha},
};

pub const SESSION_KEY_LEN: usize = 32;

/// Session cipher selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionAlgorithm {
    /// AES-256-GCM algorithm
    #[default]
    #[serde(rename = "AES-256-GCM")]
    Aes256Gcm,
    /// ChaCha20-Poly1305 algorithm
    #[serde(rename = "ChaCha20-Poly1305")]
    ChaCha20Poly1305,
}

impl SessionAlgorithm {
    /// Wire name carried in `EncryptedMessage.algorithm`
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aes256Gcm => "AES-256-GCM",
            Self::ChaCha20Poly1305 => "ChaCha20-Poly1305",
        }
    }

    /// Encrypt `plaintext` with a one-time `key`
    pub fn seal(&self, key: &SessionKey, plaintext: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Aes256Gcm => Aes::new(key.as_bytes())?.encrypt(plaintext),
            Self::ChaCha20Poly1305 => ChaCha::new(key.as_bytes())?.encrypt(plaintext),
        }
    }

    /// Reverse of [`SessionAlgorithm::seal`]
    pub fn open(&self, key: &SessionKey, sealed: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Aes256Gcm => Aes::new(key.as_bytes())?.decrypt(sealed),
            Self::ChaCha20Poly1305 => ChaCha::new(key.as_bytes())?.decrypt(sealed),
        }
    }
}

impl fmt::Display for SessionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SessionAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AES-256-GCM" => Ok(Self::Aes256Gcm),
            "ChaCha20-Poly1305" => Ok(Self::ChaCha20Poly1305),
            other => Err(Error::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// One-time symmetric key, wiped on drop
pub struct SessionKey(Zeroizing<[u8; SESSION_KEY_LEN]>);

impl SessionKey {
    /// Fresh key from the OS CSPRNG
    pub fn generate() -> Result<Self> {
        Ok(Self(Zeroizing::new(random_bytes::<SESSION_KEY_LEN>()?)))
    }

    /// Rebuild a key unwrapped from an envelope
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let key: [u8; SESSION_KEY_LEN] = bytes.try_into().map_err(|_| {
            Error::Decryption(format!(
                "Session key must be {SESSION_KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(Zeroizing::new(key)))
    }

    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_all_algorithms() {
        for algorithm in [SessionAlgorithm::Aes256Gcm, SessionAlgorithm::ChaCha20Poly1305] {
            let key = SessionKey::generate().unwrap();
            let sealed = algorithm.seal(&key, b"payload").unwrap();
            assert_eq!(algorithm.open(&key, &sealed).unwrap(), b"payload");
        }
    }

    #[test]
    fn test_fresh_keys_differ() {
        let a = SessionKey::generate().unwrap();
        let b = SessionKey::generate().unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!(SessionAlgorithm::default().to_string(), "AES-256-GCM");
        assert_eq!(
            "ChaCha20-Poly1305".parse::<SessionAlgorithm>().unwrap(),
            SessionAlgorithm::ChaCha20Poly1305
        );
        assert!(matches!(
            "DES".parse::<SessionAlgorithm>(),
            Err(Error::UnsupportedAlgorithm(_))
        ));
        let json = serde_json::to_string(&SessionAlgorithm::ChaCha20Poly1305).unwrap();
        assert_eq!(json, "\"ChaCha20-Poly1305\"");
    }

    #[test]
    fn test_session_key_length_is_checked() {
        assert!(matches!(SessionKey::from_slice(&[0u8; 16]), Err(Error::Decryption(_))));
        assert!(SessionKey::from_slice(&[0u8; 32]).is_ok());
    }
}
