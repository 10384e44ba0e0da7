//! Hybrid (envelope) encryption
//!
//! The payload is sealed under a fresh session key, and the session key is
//! wrapped with RSA. Both halves travel hex encoded in an
//! [`EncryptedMessage`].

use clavis_crypto::{SessionAlgorithm, SessionKey};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    config::CryptoConfig,
    error::{Error, Result},
    name::DistinguishedName,
};

/// Wire form of an envelope-encrypted payload
///
/// ```json
/// {"algorithm": "AES-256-GCM", "key": "<hex>", "message": "<hex>"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMessage {
    /// Session cipher name, e.g. `AES-256-GCM`
    pub algorithm: String,
    /// RSA-wrapped session key, lowercase hex
    pub key: String,
    /// `nonce || ciphertext || tag`, lowercase hex
    pub message: String,
}

impl EncryptedMessage {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Format(format!("Failed to serialize message: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Format(format!("Failed to parse message: {}", e)))
    }

    pub fn session_algorithm(&self) -> Result<SessionAlgorithm> {
        self.algorithm
            .parse()
            .map_err(|e| Error::Decryption(format!("Unknown session algorithm: {}", e)))
    }
}

/// Shared capability of [`PublicKey`](crate::PublicKey) and
/// [`PrivateKey`](crate::PrivateKey)
pub trait Key {
    /// Raw RSA encryption of a short input (a session key)
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Raw RSA decryption; only a private key can do this
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>>;

    fn to_pem(&self) -> Result<String>;

    fn dn(&self) -> Option<&DistinguishedName>;

    /// Seal `plaintext` under a fresh session key and wrap that key
    fn encrypt_message(
        &self,
        algorithm: SessionAlgorithm,
        plaintext: &[u8],
    ) -> Result<EncryptedMessage> {
        let session_key = SessionKey::generate()?;
        let sealed = algorithm.seal(&session_key, plaintext)?;
        let wrapped = self.encrypt(session_key.as_bytes())?;
        Ok(EncryptedMessage {
            algorithm: algorithm.name().to_string(),
            key: hex::encode(wrapped),
            message: hex::encode(sealed),
        })
    }

    /// Every failure here is reported as a decryption error
    fn decrypt_message(&self, message: &EncryptedMessage) -> Result<Vec<u8>> {
        let algorithm = message.session_algorithm()?;
        let wrapped = hex::decode(&message.key)
            .map_err(|e| Error::Decryption(format!("Corrupt session key encoding: {}", e)))?;
        let sealed = hex::decode(&message.message)
            .map_err(|e| Error::Decryption(format!("Corrupt message encoding: {}", e)))?;

        let raw_key = Zeroizing::new(self.decrypt(&wrapped)?);
        let session_key = SessionKey::from_slice(&raw_key)
            .map_err(|e| Error::Decryption(e.to_string()))?;
        algorithm
            .open(&session_key, &sealed)
            .map_err(|e| Error::Decryption(e.to_string()))
    }

    /// [`Key::encrypt_message`] with the default session algorithm
    fn to_encrypted_message(&self, plaintext: &[u8]) -> Result<EncryptedMessage> {
        self.encrypt_message(SessionAlgorithm::default(), plaintext)
    }

    fn to_encrypted_message_with(
        &self,
        plaintext: &[u8],
        config: &CryptoConfig,
    ) -> Result<EncryptedMessage> {
        self.encrypt_message(config.session_algorithm, plaintext)
    }

    /// Encrypt a string and return the JSON wire form
    fn encrypt_string(&self, plaintext: &str) -> Result<String> {
        self.to_encrypted_message(plaintext.as_bytes())?.to_json()
    }

    fn decrypt_string(&self, json: &str) -> Result<String> {
        let message = EncryptedMessage::from_json(json)?;
        let plaintext = self.decrypt_message(&message)?;
        String::from_utf8(plaintext)
            .map_err(|e| Error::Decryption(format!("Plaintext is not UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use super::*;
    use crate::KeyPair;

    fn fixture() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| KeyPair::generate().unwrap())
    }

    #[test]
    fn test_roundtrip_every_algorithm() {
        let pair = fixture();
        for algorithm in [SessionAlgorithm::Aes256Gcm, SessionAlgorithm::ChaCha20Poly1305] {
            for plaintext in [&b""[..], b"short", &[0xA5u8; 4096][..]] {
                let message = pair.public_key().encrypt_message(algorithm, plaintext).unwrap();
                assert_eq!(message.algorithm, algorithm.name());
                let decrypted = pair.private_key().decrypt_message(&message).unwrap();
                assert_eq!(decrypted, plaintext);
            }
        }
    }

    #[test]
    fn test_private_key_encrypts_to_itself() {
        let pair = fixture();
        let message = pair.private_key().to_encrypted_message(b"note to self").unwrap();
        assert_eq!(message.algorithm, "AES-256-GCM");
        assert_eq!(
            pair.private_key().decrypt_message(&message).unwrap(),
            b"note to self"
        );
    }

    #[test]
    fn test_fresh_session_key_per_call() {
        let pair = fixture();
        let a = pair.public_key().to_encrypted_message(b"same").unwrap();
        let b = pair.public_key().to_encrypted_message(b"same").unwrap();
        assert_ne!(a.key, b.key);
        assert_ne!(a.message, b.message);
    }

    #[test]
    fn test_public_key_cannot_decrypt() {
        let pair = fixture();
        let message = pair.public_key().to_encrypted_message(b"secret").unwrap();
        assert!(matches!(
            pair.public_key().decrypt_message(&message),
            Err(Error::Decryption(_))
        ));
    }

    #[test]
    fn test_encrypt_string() {
        let pair = fixture();
        let json = pair.public_key().encrypt_string("hello world").unwrap();
        assert!(json.contains("\"algorithm\":\"AES-256-GCM\""));
        assert_eq!(pair.private_key().decrypt_string(&json).unwrap(), "hello world");
    }

    #[test]
    fn test_configured_algorithm() {
        let pair = fixture();
        let config =
            CryptoConfig::default().with_session_algorithm(SessionAlgorithm::ChaCha20Poly1305);
        let message = pair
            .public_key()
            .to_encrypted_message_with(b"x", &config)
            .unwrap();
        assert_eq!(message.algorithm, "ChaCha20-Poly1305");
    }

    #[test]
    fn test_tampering_is_decryption_error() {
        let pair = fixture();
        let private_key = pair.private_key();
        let message = pair.public_key().to_encrypted_message(b"payload").unwrap();

        let mut unknown = message.clone();
        unknown.algorithm = "AES".to_string();
        assert!(matches!(private_key.decrypt_message(&unknown), Err(Error::Decryption(_))));

        let mut bad_hex = message.clone();
        bad_hex.message = "zz".to_string();
        assert!(matches!(private_key.decrypt_message(&bad_hex), Err(Error::Decryption(_))));

        let mut flipped = message.clone();
        let last = if flipped.message.ends_with('0') { "1" } else { "0" };
        flipped.message.replace_range(flipped.message.len() - 1.., last);
        assert!(matches!(private_key.decrypt_message(&flipped), Err(Error::Decryption(_))));

        let other = KeyPair::generate().unwrap();
        assert!(matches!(
            other.private_key().decrypt_message(&message),
            Err(Error::Decryption(_))
        ));
    }
}
