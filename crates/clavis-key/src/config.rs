//! Explicit algorithm configuration
//!
//! Every operation that picks an algorithm or a work factor has a `_with`
//! variant taking a [`CryptoConfig`]; the plain variants use the default.

use std::path::Path;

use clavis_crypto::{SessionAlgorithm, SignatureAlgorithm, MIN_RSA_BITS};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Upper bound on PBKDF2 iterations, for writing and for reading stored headers
pub const MAX_PBKDF2_ITERATIONS: u32 = 10_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// RSA modulus size for generated keys
    #[serde(default = "default_key_bits")]
    pub key_bits: usize,

    /// Signature used for CSRs and issued certificates
    #[serde(default)]
    pub signature_algorithm: SignatureAlgorithm,

    /// Cipher used by envelope encryption when none is named
    #[serde(default)]
    pub session_algorithm: SessionAlgorithm,

    /// PBKDF2 iterations for password protected keys and the keystore
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,
}

fn default_key_bits() -> usize {
    2048
}

fn default_pbkdf2_iterations() -> u32 {
    100_000
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            key_bits: default_key_bits(),
            signature_algorithm: SignatureAlgorithm::default(),
            session_algorithm: SessionAlgorithm::default(),
            pbkdf2_iterations: default_pbkdf2_iterations(),
        }
    }
}

impl CryptoConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CryptoConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.key_bits < MIN_RSA_BITS {
            return Err(Error::Config(format!(
                "key_bits must be at least {MIN_RSA_BITS}, got {}",
                self.key_bits
            )));
        }
        if self.pbkdf2_iterations == 0 || self.pbkdf2_iterations > MAX_PBKDF2_ITERATIONS {
            return Err(Error::Config(format!(
                "pbkdf2_iterations must be in 1..={MAX_PBKDF2_ITERATIONS}, got {}",
                self.pbkdf2_iterations
            )));
        }
        Ok(())
    }

    pub fn with_key_bits(mut self, key_bits: usize) -> Self {
        self.key_bits = key_bits;
        self
    }

    pub fn with_signature_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.signature_algorithm = algorithm;
        self
    }

    pub fn with_session_algorithm(mut self, algorithm: SessionAlgorithm) -> Self {
        self.session_algorithm = algorithm;
        self
    }

    pub fn with_pbkdf2_iterations(mut self, iterations: u32) -> Self {
        self.pbkdf2_iterations = iterations;
        self
    }
}
