//! X.509 证书
//!
//! 证书相等只比较主体 DN 和签发者 DN，不比较序列号和有效期：同一主体、
//! 同一签发者的两张证书视为相等。

use std::{path::Path, time::SystemTime};

use clavis_crypto::asymmetric::rsa::verify as verify_signature;
use clavis_key::{CryptoConfig, DistinguishedName, PublicKey, SignatureAlgorithm};
use der::{Decode, Encode};
use rsa::BigUint;

use crate::{
    algorithm,
    error::{PkiError, Result},
    keystore::SecureKeyStore,
    name,
};

pub const CERTIFICATE_PEM_LABEL: &str = "CERTIFICATE";

#[derive(Debug, Clone)]
pub struct Certificate {
    inner: x509_cert::Certificate,
    subject: DistinguishedName,
    issuer: DistinguishedName,
    public_key: PublicKey,
}

// ============================================================================
// 编解码
// ============================================================================

impl Certificate {
    pub fn from_x509(inner: x509_cert::Certificate) -> Result<Self> {
        let subject = name::from_x509_name(&inner.tbs_certificate.subject)?;
        let issuer = name::from_x509_name(&inner.tbs_certificate.issuer)?;
        let spki_der = inner
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| PkiError::certificate_decode("Failed to encode subject SPKI", e))?;
        let public_key = PublicKey::from_der(&spki_der)
            .map_err(|e| PkiError::certificate_decode("Subject key is not an RSA key", e))?
            .with_dn(subject.clone());
        Ok(Self {
            inner,
            subject,
            issuer,
            public_key,
        })
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = x509_cert::Certificate::from_der(der)
            .map_err(|e| PkiError::certificate_decode("Failed to parse certificate DER", e))?;
        Self::from_x509(inner)
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| PkiError::format("Failed to encode certificate", e))
    }

    /// 解析 `CERTIFICATE` PEM；PEM 外壳错误为格式错误，DER 错误为证书解析错误
    pub fn from_pem(text: &str) -> Result<Self> {
        let block = pem::parse(text).map_err(|e| PkiError::format("Failed to parse PEM", e))?;
        if block.tag() != CERTIFICATE_PEM_LABEL {
            return Err(PkiError::format_msg(format!(
                "Invalid PEM tag {}, expected {CERTIFICATE_PEM_LABEL}",
                block.tag()
            )));
        }
        Self::from_der(block.contents())
    }

    pub fn to_pem(&self) -> Result<String> {
        Ok(clavis_key::key::encode_pem(CERTIFICATE_PEM_LABEL, &self.to_der()?))
    }

    pub fn inner(&self) -> &x509_cert::Certificate {
        &self.inner
    }
}

// ============================================================================
// 字段访问
// ============================================================================

impl Certificate {
    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    pub fn serial_number(&self) -> BigUint {
        BigUint::from_bytes_be(self.inner.tbs_certificate.serial_number.as_bytes())
    }

    pub fn not_before(&self) -> SystemTime {
        self.inner.tbs_certificate.validity.not_before.to_system_time()
    }

    pub fn not_after(&self) -> SystemTime {
        self.inner.tbs_certificate.validity.not_after.to_system_time()
    }

    /// 不支持的签名算法返回 None
    pub fn signature_algorithm(&self) -> Option<SignatureAlgorithm> {
        algorithm::from_oid(&self.inner.signature_algorithm.oid)
    }

    /// 主体公钥，附带主体 DN
    pub fn public_key(&self) -> PublicKey {
        self.public_key.clone()
    }
}

// ============================================================================
// 校验
// ============================================================================

impl Certificate {
    /// 用签发者公钥校验证书签名
    pub fn verify(&self, issuer_key: &PublicKey) -> Result<bool> {
        let algorithm = self.signature_algorithm().ok_or_else(|| {
            PkiError::certificate_decode_msg(format!(
                "Unsupported signature algorithm {}",
                self.inner.signature_algorithm.oid
            ))
        })?;
        let tbs_der = self
            .inner
            .tbs_certificate
            .to_der()
            .map_err(|e| PkiError::certificate_decode("Failed to encode TBSCertificate", e))?;
        verify_signature(
            issuer_key.inner(),
            algorithm,
            &tbs_der,
            self.inner.signature.raw_bytes(),
        )
        .map_err(|e| PkiError::certificate_decode("Signature check failed", e))
    }

    /// `not_before <= instant <= not_after`
    pub fn is_valid_at(&self, instant: SystemTime) -> bool {
        self.not_before() <= instant && instant <= self.not_after()
    }

    /// 写入只含一个受信任证书条目的密钥库
    pub fn store<P: AsRef<Path>>(&self, path: P, password: &str, alias: &str) -> Result<()> {
        self.store_with(path, password, alias, &CryptoConfig::default())
    }

    pub fn store_with<P: AsRef<Path>>(
        &self,
        path: P,
        password: &str,
        alias: &str,
        config: &CryptoConfig,
    ) -> Result<()> {
        let mut store = SecureKeyStore::new();
        store.add_certificate(alias, self.clone());
        store.store_with(path, password, config)
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.subject == other.subject && self.issuer == other.issuer
    }
}

impl Eq for Certificate {}

#[cfg(test)]
mod tests {
    use std::{sync::OnceLock, time::Duration};

    use clavis_key::KeyPair;

    use super::*;
    use crate::{ca::CertificateAuthority, csr::SigningRequestExt};

    const YEAR: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    struct Fixture {
        ca: KeyPair,
        leaf: KeyPair,
        cert: Certificate,
        issued_at: SystemTime,
    }

    fn fixture() -> &'static Fixture {
        static FIXTURE: OnceLock<Fixture> = OnceLock::new();
        FIXTURE.get_or_init(|| {
            let ca = KeyPair::generate()
                .unwrap()
                .with_dn(DistinguishedName::new("Clavis Root"));
            let leaf = KeyPair::generate().unwrap().with_dn(
                DistinguishedName::new("foo.com")
                    .with_country_code("US")
                    .with_state("Colorado")
                    .with_city("Denver")
                    .with_company("Long Term Software LLC")
                    .with_division("Development"),
            );
            let issued_at = SystemTime::now();
            let csr = leaf.certificate_signing_request().unwrap();
            let cert = ca
                .private_key()
                .sign(&csr, issued_at, issued_at + YEAR)
                .unwrap();
            Fixture {
                ca,
                leaf,
                cert,
                issued_at,
            }
        })
    }

    #[test]
    fn test_pem_roundtrip_is_equal() {
        let cert = &fixture().cert;
        let pem = cert.to_pem().unwrap();
        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----"));

        let decoded = Certificate::from_pem(&pem).unwrap();
        assert_eq!(&decoded, cert);
        assert_eq!(decoded.serial_number(), cert.serial_number());
        assert_eq!(decoded.to_der().unwrap(), cert.to_der().unwrap());
        assert_eq!(decoded.subject().to_string(), fixture().leaf.dn().unwrap().to_string());
    }

    #[test]
    fn test_malformed_pem_and_der() {
        assert!(matches!(
            Certificate::from_pem("no armor here"),
            Err(PkiError::Format { .. })
        ));

        let wrong_label = fixture().leaf.public_key().to_pem().unwrap();
        assert!(matches!(
            Certificate::from_pem(&wrong_label),
            Err(PkiError::Format { .. })
        ));

        let junk = clavis_key::key::encode_pem(CERTIFICATE_PEM_LABEL, b"definitely not DER");
        assert!(matches!(
            Certificate::from_pem(&junk),
            Err(PkiError::CertificateDecode { .. })
        ));
    }

    #[test]
    fn test_equality_ignores_serial_and_validity() {
        let f = fixture();
        let csr = f.leaf.certificate_signing_request().unwrap();
        let later = f.issued_at + YEAR;
        let other = f.ca.private_key().sign(&csr, later, later + YEAR).unwrap();
        assert_ne!(other.serial_number(), f.cert.serial_number());
        assert_eq!(other, f.cert);

        let self_signed = crate::ca::self_signed(&f.leaf, f.issued_at, later).unwrap();
        assert_eq!(self_signed.subject(), f.cert.subject());
        assert_ne!(self_signed, f.cert);
    }

    #[test]
    fn test_validity_window() {
        let f = fixture();
        assert!(f.cert.is_valid_at(SystemTime::now()));
        assert!(!f.cert.is_valid_at(f.issued_at - Duration::from_secs(60)));
        assert!(!f.cert.is_valid_at(f.issued_at + YEAR + Duration::from_secs(60)));
    }

    #[test]
    fn test_public_key_carries_subject() {
        let f = fixture();
        let public_key = f.cert.public_key();
        assert_eq!(&public_key, f.leaf.public_key());
        assert_eq!(public_key.dn(), Some(f.cert.subject()));
        assert!(f.cert.verify(f.ca.public_key()).unwrap());
    }
}
