use clavis_crypto::asymmetric::rsa::{encrypt, public_key_from_spki_der, public_key_to_spki_der};
use rsa::{traits::PublicKeyParts, RsaPublicKey};

use super::{encode_pem, parse_single_pem, PUBLIC_KEY_LABEL};
use crate::{
    envelope::Key,
    error::{Error, Result},
    name::DistinguishedName,
};

/// Public half of an RSA key pair
///
/// Equality looks at the key only; the attached name is ignored.
#[derive(Debug, Clone)]
pub struct PublicKey {
    inner: RsaPublicKey,
    dn: Option<DistinguishedName>,
}

impl From<RsaPublicKey> for PublicKey {
    fn from(inner: RsaPublicKey) -> Self {
        Self { inner, dn: None }
    }
}

impl PublicKey {
    pub fn inner(&self) -> &RsaPublicKey {
        &self.inner
    }

    /// Modulus size in bits
    pub fn size_bits(&self) -> usize {
        self.inner.size() * 8
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

    /// SubjectPublicKeyInfo DER
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(public_key_to_spki_der(&self.inner)?)
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = public_key_from_spki_der(der)
            .map_err(|e| Error::Format(format!("Invalid public key: {}", e)))?;
        Ok(inner.into())
    }

    pub fn to_pem(&self) -> Result<String> {
        Ok(encode_pem(PUBLIC_KEY_LABEL, &self.to_der()?))
    }

    pub fn from_pem(text: &str) -> Result<Self> {
        let der = parse_single_pem(text, PUBLIC_KEY_LABEL)?;
        Self::from_der(&der)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for PublicKey {}

impl Key for PublicKey {
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(encrypt(&self.inner, data)?)
    }

    fn decrypt(&self, _data: &[u8]) -> Result<Vec<u8>> {
        Err(Error::Decryption(
            "A public key cannot decrypt; use the matching private key".to_string(),
        ))
    }

    fn to_pem(&self) -> Result<String> {
        PublicKey::to_pem(self)
    }

    fn dn(&self) -> Option<&DistinguishedName> {
        PublicKey::dn(self)
    }
}
