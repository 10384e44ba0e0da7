//! 签名算法与 X.509 AlgorithmIdentifier 的映射

use clavis_key::SignatureAlgorithm;
use const_oid::{
    db::rfc5912::{SHA_1_WITH_RSA_ENCRYPTION, SHA_256_WITH_RSA_ENCRYPTION},
    ObjectIdentifier,
};
use der::{Any, Tag};
use pkcs8::spki::AlgorithmIdentifierOwned;

use crate::error::{PkiError, Result};

pub fn oid(algorithm: SignatureAlgorithm) -> ObjectIdentifier {
    match algorithm {
        SignatureAlgorithm::Sha256WithRsa => SHA_256_WITH_RSA_ENCRYPTION,
        SignatureAlgorithm::LegacySha1WithRsa => SHA_1_WITH_RSA_ENCRYPTION,
    }
}

/// RSA 签名算法的参数固定为 NULL
pub fn algorithm_identifier(algorithm: SignatureAlgorithm) -> Result<AlgorithmIdentifierOwned> {
    let parameters = Any::new(Tag::Null, Vec::new())
        .map_err(|e| PkiError::signing("Failed to encode NULL parameters", e))?;
    Ok(AlgorithmIdentifierOwned {
        oid: oid(algorithm),
        parameters: Some(parameters),
    })
}

pub fn from_oid(oid: &ObjectIdentifier) -> Option<SignatureAlgorithm> {
    if *oid == SHA_256_WITH_RSA_ENCRYPTION {
        Some(SignatureAlgorithm::Sha256WithRsa)
    } else if *oid == SHA_1_WITH_RSA_ENCRYPTION {
        Some(SignatureAlgorithm::LegacySha1WithRsa)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oid_mapping() {
        for algorithm in [
            SignatureAlgorithm::Sha256WithRsa,
            SignatureAlgorithm::LegacySha1WithRsa,
        ] {
            let id = algorithm_identifier(algorithm).unwrap();
            assert_eq!(from_oid(&id.oid), Some(algorithm));
        }
        assert_eq!(
            oid(SignatureAlgorithm::Sha256WithRsa).to_string(),
            "1.2.840.113549.1.1.11"
        );
        assert_eq!(from_oid(&const_oid::db::rfc5912::RSA_ENCRYPTION), None);
    }
}
