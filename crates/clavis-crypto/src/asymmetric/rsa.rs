use pkcs8::{
    pkcs5::pbes2, DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey,
    EncryptedPrivateKeyInfo, PrivateKeyInfo,
};
use rsa::{
    pkcs1::DecodeRsaPrivateKey, traits::PublicKeyParts, Pkcs1v15Encrypt, Pkcs1v15Sign,
    RsaPrivateKey, RsaPublicKey,
};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::SignatureAlgorithm;
use crate::{
    error::{Error, Result},
    kdf::random_bytes,
};

/// Smallest modulus accepted for generated keys
pub const MIN_RSA_BITS: usize = 2048;

#[derive(Clone)]
pub struct Rsa {
    inner: RsaPrivateKey,
}

impl From<RsaPrivateKey> for Rsa {
    fn from(value: RsaPrivateKey) -> Self {
        Self { inner: value }
    }
}

impl Rsa {
    /// Generate a new RSA key pair with the given modulus size
    pub fn generate(bits: usize) -> Result<Self> {
        if bits < MIN_RSA_BITS {
            return Err(Error::KeyGeneration(format!(
                "RSA key size {bits} is below the {MIN_RSA_BITS}-bit minimum"
            )));
        }
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| Error::KeyGeneration(format!("Failed to generate RSA key: {}", e)))?;
        Ok(private_key.into())
    }

    /// Import from PKCS8 DER format
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_der(der)?;
        Ok(private_key.into())
    }

    /// Import from PKCS1 (`RSA PRIVATE KEY`) DER format
    pub fn from_pkcs1_der(der: &[u8]) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs1_der(der)
            .map_err(|e| Error::Encoding(format!("Invalid PKCS1 private key: {}", e)))?;
        Ok(private_key.into())
    }

    /// Import from a PBES2-encrypted PKCS8 document
    ///
    /// A structurally broken document is an encoding error; anything that goes
    /// wrong after that (bad password, garbage plaintext) is a decryption error.
    pub fn from_encrypted_pkcs8_der(der: &[u8], password: &str) -> Result<Self> {
        let info = EncryptedPrivateKeyInfo::try_from(der)
            .map_err(|e| Error::Encoding(format!("Invalid encrypted PKCS8 document: {}", e)))?;
        let document = info
            .decrypt(password)
            .map_err(|e| Error::Decryption(format!("Failed to decrypt private key: {}", e)))?;
        let private_key = RsaPrivateKey::from_pkcs8_der(document.as_bytes())
            .map_err(|e| Error::Decryption(format!("Decrypted key is not valid: {}", e)))?;
        Ok(private_key.into())
    }
}

impl Rsa {
    /// Export private key to PKCS8 DER format
    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let der = self.inner.to_pkcs8_der()?;
        Ok(Zeroizing::new(der.as_bytes().to_vec()))
    }

    /// Export private key as PBES2 (PBKDF2-SHA256, AES-256-CBC) encrypted PKCS8 DER
    pub fn to_encrypted_pkcs8_der(&self, password: &str, iterations: u32) -> Result<Vec<u8>> {
        let salt = random_bytes::<16>()?;
        let iv = random_bytes::<16>()?;
        let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(iterations, &salt, &iv)
            .map_err(|e| Error::Encryption(format!("Invalid PBES2 parameters: {}", e)))?;

        let der = self.inner.to_pkcs8_der()?;
        let info = PrivateKeyInfo::try_from(der.as_bytes())
            .map_err(|e| Error::Encoding(format!("Invalid PKCS8 document: {}", e)))?;
        let encrypted = info
            .encrypt_with_params(params, password)
            .map_err(|e| Error::Encryption(format!("Failed to encrypt private key: {}", e)))?;
        Ok(encrypted.as_bytes().to_vec())
    }

    /// Export public key to SPKI DER format
    pub fn to_spki_der(&self) -> Result<Vec<u8>> {
        public_key_to_spki_der(&self.public_key())
    }
}

impl Rsa {
    /// Get the public key for this keypair
    pub fn public_key(&self) -> RsaPublicKey {
        self.inner.to_public_key()
    }

    pub fn inner(&self) -> &RsaPrivateKey {
        &self.inner
    }

    /// Get key size in bits
    pub fn size(&self) -> usize {
        self.inner.size() * 8
    }

    /// Sign data using PKCS#1 v1.5 with the selected digest
    pub fn sign(&self, algorithm: SignatureAlgorithm, message: &[u8]) -> Result<Vec<u8>> {
        let mut rng = rand::thread_rng();
        let signature = match algorithm {
            SignatureAlgorithm::Sha256WithRsa => {
                let hashed = Sha256::digest(message);
                self.inner
                    .sign_with_rng(&mut rng, Pkcs1v15Sign::new::<Sha256>(), &hashed)
            }
            SignatureAlgorithm::LegacySha1WithRsa => {
                let hashed = Sha1::digest(message);
                self.inner
                    .sign_with_rng(&mut rng, Pkcs1v15Sign::new::<Sha1>(), &hashed)
            }
        }
        .map_err(|e| Error::Signing(format!("RSA signing failed: {}", e)))?;
        Ok(signature)
    }

    /// Encrypt data using own public key with PKCS#1 v1.5 padding
    pub fn encrypt_with_own_key(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        encrypt(&self.public_key(), plaintext)
    }

    /// Decrypt data using PKCS#1 v1.5 padding
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let plaintext = self
            .inner
            .decrypt(Pkcs1v15Encrypt, ciphertext)
            .map_err(|e| Error::Decryption(format!("RSA decryption failed: {}", e)))?;
        Ok(Zeroizing::new(plaintext))
    }

    /// Whether `public_key` is the public half of this key
    pub fn matches(&self, public_key: &RsaPublicKey) -> bool {
        &self.public_key() == public_key
    }
}

/// Encrypt data for `public_key` with PKCS#1 v1.5 padding
pub fn encrypt(public_key: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut rng = rand::thread_rng();
    public_key
        .encrypt(&mut rng, Pkcs1v15Encrypt, plaintext)
        .map_err(|e| Error::Encryption(format!("RSA encryption failed: {}", e)))
}

/// Verify a PKCS#1 v1.5 signature
///
/// Returns `Ok(false)` for a well-formed but wrong signature.
pub fn verify(
    public_key: &RsaPublicKey,
    algorithm: SignatureAlgorithm,
    message: &[u8],
    signature: &[u8],
) -> Result<bool> {
    let result = match algorithm {
        SignatureAlgorithm::Sha256WithRsa => {
            let hashed = Sha256::digest(message);
            public_key.verify(Pkcs1v15Sign::new::<Sha256>(), &hashed, signature)
        }
        SignatureAlgorithm::LegacySha1WithRsa => {
            let hashed = Sha1::digest(message);
            public_key.verify(Pkcs1v15Sign::new::<Sha1>(), &hashed, signature)
        }
    };
    match result {
        Ok(()) => Ok(true),
        Err(rsa::Error::Verification) => Ok(false),
        Err(e) => Err(Error::Verification(format!("RSA verification failed: {}", e))),
    }
}

/// Export an RSA public key as SPKI DER
pub fn public_key_to_spki_der(public_key: &RsaPublicKey) -> Result<Vec<u8>> {
    let der = public_key.to_public_key_der()?;
    Ok(der.as_bytes().to_vec())
}

/// Import an RSA public key from SPKI DER
pub fn public_key_from_spki_der(der: &[u8]) -> Result<RsaPublicKey> {
    Ok(RsaPublicKey::from_public_key_der(der)?)
}
