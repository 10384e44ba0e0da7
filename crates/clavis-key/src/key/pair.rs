use clavis_crypto::Rsa;
use tracing::debug;

use super::{
    parse_pem_blocks, private::is_private_label, PrivateKey, PublicKey,
    ENCRYPTED_PRIVATE_KEY_LABEL, PUBLIC_KEY_LABEL,
};
use crate::{
    config::CryptoConfig,
    error::{Error, Result},
    name::DistinguishedName,
};

/// RSA key pair
///
/// # Examples
///
/// ```no_run
/// use clavis_key::{DistinguishedName, KeyPair};
///
/// let pair = KeyPair::generate()
///     .unwrap()
///     .with_dn(DistinguishedName::new("foo.com"));
/// let pem = pair.to_pem().unwrap();
/// assert_eq!(KeyPair::from_pem(&pem).unwrap(), pair);
/// ```
#[derive(Debug, Clone)]
pub struct KeyPair {
    public_key: PublicKey,
    private_key: PrivateKey,
}

// ============================================================================
// Constructors
// ============================================================================

impl KeyPair {
    /// Generate a 2048-bit pair
    pub fn generate() -> Result<Self> {
        Self::generate_with(&CryptoConfig::default())
    }

    pub fn generate_with(config: &CryptoConfig) -> Result<Self> {
        let rsa = Rsa::generate(config.key_bits)
            .map_err(|e| Error::KeyGeneration(format!("RSA-{} generation failed: {}", config.key_bits, e)))?;
        debug!(bits = config.key_bits, "generated RSA key pair");
        Ok(Self::from_private_key(PrivateKey::from(rsa)))
    }

    /// Derive the public half from `private_key`
    pub fn from_private_key(private_key: PrivateKey) -> Self {
        Self {
            public_key: private_key.public_key(),
            private_key,
        }
    }

    /// Join two halves; they must belong together
    pub fn from_parts(public_key: PublicKey, private_key: PrivateKey) -> Result<Self> {
        if !private_key.matches(&public_key) {
            return Err(Error::Format(
                "Public key does not match private key".to_string(),
            ));
        }
        Ok(Self {
            public_key,
            private_key,
        })
    }

    pub fn into_parts(self) -> (PublicKey, PrivateKey) {
        (self.public_key, self.private_key)
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl KeyPair {
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn dn(&self) -> Option<&DistinguishedName> {
        self.public_key.dn()
    }

    /// Attach `dn` to both halves
    pub fn set_dn(&mut self, dn: DistinguishedName) {
        self.private_key.set_dn(dn.clone());
        self.public_key.set_dn(dn);
    }

    pub fn with_dn(mut self, dn: DistinguishedName) -> Self {
        self.set_dn(dn);
        self
    }
}

// ============================================================================
// PEM
// ============================================================================

impl KeyPair {
    /// `PRIVATE KEY` block followed by `PUBLIC KEY` block
    pub fn to_pem(&self) -> Result<String> {
        let mut out = self.private_key.to_pem()?;
        out.push_str(&self.public_key.to_pem()?);
        Ok(out)
    }

    /// Reads the output of [`KeyPair::to_pem`], or a lone private key block
    pub fn from_pem(text: &str) -> Result<Self> {
        let blocks = parse_pem_blocks(text)?;
        let mut private_key = None;
        let mut public_key = None;
        for block in &blocks {
            if is_private_label(block.tag()) {
                if private_key.is_some() {
                    return Err(Error::Format("More than one private key block".to_string()));
                }
                private_key = Some(PrivateKey::from_pem_block(block.tag(), block.contents())?);
            } else if block.tag() == PUBLIC_KEY_LABEL {
                public_key = Some(PublicKey::from_der(block.contents())?);
            } else {
                return Err(Error::Format(format!(
                    "Unexpected PEM label {} in key pair",
                    block.tag()
                )));
            }
        }
        Self::assemble(private_key, public_key)
    }

    /// `ENCRYPTED PRIVATE KEY` block followed by the `PUBLIC KEY` block
    pub fn to_pem_with_password(&self, password: &str) -> Result<String> {
        self.to_encrypted_pem(password, &CryptoConfig::default())
    }

    pub fn to_encrypted_pem(&self, password: &str, config: &CryptoConfig) -> Result<String> {
        let mut out = self.private_key.to_encrypted_pem(password, config)?;
        out.push_str(&self.public_key.to_pem()?);
        Ok(out)
    }

    pub fn from_pem_with_password(text: &str, password: &str) -> Result<Self> {
        let blocks = parse_pem_blocks(text)?;
        let mut private_key = None;
        let mut public_key = None;
        for block in &blocks {
            match block.tag() {
                ENCRYPTED_PRIVATE_KEY_LABEL => {
                    private_key = Some(PrivateKey::from_encrypted_der(block.contents(), password)?)
                }
                PUBLIC_KEY_LABEL => public_key = Some(PublicKey::from_der(block.contents())?),
                other => {
                    return Err(Error::Format(format!(
                        "Unexpected PEM label {other} in encrypted key pair"
                    )))
                }
            }
        }
        Self::assemble(private_key, public_key)
    }

    fn assemble(private_key: Option<PrivateKey>, public_key: Option<PublicKey>) -> Result<Self> {
        let private_key =
            private_key.ok_or_else(|| Error::Format("No private key block found".to_string()))?;
        match public_key {
            Some(public_key) => Self::from_parts(public_key, private_key),
            None => Ok(Self::from_private_key(private_key)),
        }
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key
            && self.private_key.matches(&self.public_key)
            && other.private_key.matches(&other.public_key)
    }
}
