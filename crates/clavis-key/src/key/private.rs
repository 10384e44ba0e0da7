use std::fmt;

use clavis_crypto::{Rsa, SignatureAlgorithm};

use super::{
    encode_pem, parse_pem_blocks, parse_single_pem, PublicKey, ENCRYPTED_PRIVATE_KEY_LABEL,
    PRIVATE_KEY_LABEL, RSA_PRIVATE_KEY_LABEL,
};
use crate::{
    config::CryptoConfig,
    envelope::Key,
    error::{Error, Result},
    name::DistinguishedName,
};

/// Private half of an RSA key pair
///
/// No `PartialEq`: compare the derived public halves
/// or use [`PrivateKey::matches`].
#[derive(Clone)]
pub struct PrivateKey {
    inner: Rsa,
    dn: Option<DistinguishedName>,
}

impl From<Rsa> for PrivateKey {
    fn from(inner: Rsa) -> Self {
        Self { inner, dn: None }
    }
}

impl PrivateKey {
    pub fn rsa(&self) -> &Rsa {
        &self.inner
    }

    pub fn size_bits(&self) -> usize {
        self.inner.size()
    }

    pub fn dn(&self) -> Option<&DistinguishedName> {
        self.dn.as_ref()
    }

    pub fn set_dn(&mut self, dn: DistinguishedName) {
        self.dn = Some(dn);
    }

    pub fn with_dn(mut self, dn: DistinguishedName) -> Self {
        self.dn = Some(dn);
        self
    }

    /// The matching public half, carrying the same name
    pub fn public_key(&self) -> PublicKey {
        let public_key = PublicKey::from(self.inner.public_key());
        match &self.dn {
            Some(dn) => public_key.with_dn(dn.clone()),
            None => public_key,
        }
    }

    /// Whether `public_key` pairs with this key
    pub fn matches(&self, public_key: &PublicKey) -> bool {
        self.inner.matches(public_key.inner())
    }

    /// PKCS#1 v1.5 signature over `message`
    pub fn sign_message(&self, algorithm: SignatureAlgorithm, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.inner.sign(algorithm, message)?)
    }
}

// ============================================================================
// PEM / DER
// ============================================================================

impl PrivateKey {
    /// Unencrypted PKCS#8 `PRIVATE KEY`
    pub fn to_pem(&self) -> Result<String> {
        let der = self.inner.to_pkcs8_der()?;
        Ok(encode_pem(PRIVATE_KEY_LABEL, &der))
    }

    /// Accepts PKCS#8 `PRIVATE KEY` or PKCS#1 `RSA PRIVATE KEY`
    pub fn from_pem(text: &str) -> Result<Self> {
        let blocks = parse_pem_blocks(text)?;
        let block = blocks
            .iter()
            .find(|block| is_private_label(block.tag()))
            .ok_or_else(|| Error::Format("No private key block found".to_string()))?;
        Self::from_pem_block(block.tag(), block.contents())
    }

    pub(crate) fn from_pem_block(label: &str, der: &[u8]) -> Result<Self> {
        let inner = match label {
            PRIVATE_KEY_LABEL => Rsa::from_pkcs8_der(der),
            RSA_PRIVATE_KEY_LABEL => Rsa::from_pkcs1_der(der),
            ENCRYPTED_PRIVATE_KEY_LABEL => {
                return Err(Error::Format(
                    "Private key is encrypted; a password is required".to_string(),
                ))
            }
            other => return Err(Error::Format(format!("Unexpected PEM label {other}"))),
        }
        .map_err(|e| Error::Format(format!("Invalid private key: {}", e)))?;
        Ok(inner.into())
    }

    /// PBES2 encrypted PKCS#8 `ENCRYPTED PRIVATE KEY` using the default work factor
    pub fn to_pem_with_password(&self, password: &str) -> Result<String> {
        self.to_encrypted_pem(password, &CryptoConfig::default())
    }

    pub fn to_encrypted_pem(&self, password: &str, config: &CryptoConfig) -> Result<String> {
        let der = self.to_encrypted_der(password, config)?;
        Ok(encode_pem(ENCRYPTED_PRIVATE_KEY_LABEL, &der))
    }

    pub fn to_encrypted_der(&self, password: &str, config: &CryptoConfig) -> Result<Vec<u8>> {
        self.inner
            .to_encrypted_pkcs8_der(password, config.pbkdf2_iterations)
            .map_err(|e| Error::Encryption(format!("Failed to protect private key: {}", e)))
    }

    /// Reads an `ENCRYPTED PRIVATE KEY`; a wrong password is a decryption error
    pub fn from_pem_with_password(text: &str, password: &str) -> Result<Self> {
        let der = parse_single_pem(text, ENCRYPTED_PRIVATE_KEY_LABEL)?;
        Self::from_encrypted_der(&der, password)
    }

    pub fn from_encrypted_der(der: &[u8], password: &str) -> Result<Self> {
        let inner = Rsa::from_encrypted_pkcs8_der(der, password).map_err(|e| match e {
            clavis_crypto::Error::Encoding(msg) => Error::Format(msg),
            other => Error::Decryption(other.to_string()),
        })?;
        Ok(inner.into())
    }
}

pub(crate) fn is_private_label(label: &str) -> bool {
    matches!(
        label,
        PRIVATE_KEY_LABEL | RSA_PRIVATE_KEY_LABEL | ENCRYPTED_PRIVATE_KEY_LABEL
    )
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("bits", &self.size_bits())
            .field("dn", &self.dn)
            .finish_non_exhaustive()
    }
}

impl Key for PrivateKey {
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(self.inner.encrypt_with_own_key(data)?)
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let plaintext = self
            .inner
            .decrypt(data)
            .map_err(|e| Error::Decryption(e.to_string()))?;
        Ok(plaintext.to_vec())
    }

    fn to_pem(&self) -> Result<String> {
        PrivateKey::to_pem(self)
    }

    fn dn(&self) -> Option<&DistinguishedName> {
        PrivateKey::dn(self)
    }
}
