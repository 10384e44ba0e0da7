//! Asymmetric cryptography
//!
//! RSA is the only key type: it wraps session keys (PKCS#1 v1.5 encryption)
//! and signs certificate material (PKCS#1 v1.5 signatures).

pub mod rsa;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Digest + signature pairing used for CSRs and issued certificates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// sha256WithRSAEncryption
    #[default]
    #[serde(rename = "sha256WithRSAEncryption")]
    Sha256WithRsa,
    /// sha1WithRSAEncryption, kept for interoperability with old requests
    #[serde(rename = "sha1WithRSAEncryption")]
    LegacySha1WithRsa,
}

impl SignatureAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256WithRsa => "sha256WithRSAEncryption",
            Self::LegacySha1WithRsa => "sha1WithRSAEncryption",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256WithRSAEncryption" | "SHA256withRSA" => Ok(Self::Sha256WithRsa),
            "sha1WithRSAEncryption" | "SHA1withRSA" => Ok(Self::LegacySha1WithRsa),
            other => Err(Error::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_algorithm_names() {
        assert_eq!(SignatureAlgorithm::default(), SignatureAlgorithm::Sha256WithRsa);
        assert_eq!(
            "SHA1withRSA".parse::<SignatureAlgorithm>().unwrap(),
            SignatureAlgorithm::LegacySha1WithRsa
        );
        assert_eq!(
            SignatureAlgorithm::Sha256WithRsa.to_string(),
            "sha256WithRSAEncryption"
        );
        assert!("md5WithRSA".parse::<SignatureAlgorithm>().is_err());
    }
}
