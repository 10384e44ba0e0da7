//! CA 签发模块
//!
//! 任何带有 DN 的私钥都可以作为签发者：[`CertificateAuthority`] 作为扩展
//! trait 挂在 [`PrivateKey`] 上。

use std::time::SystemTime;

use clavis_key::{CryptoConfig, DistinguishedName, KeyPair, PrivateKey, PublicKey, SignatureAlgorithm};
use der::{
    asn1::{GeneralizedTime, UtcTime},
    DateTime, Decode, Encode,
};
use pkcs8::spki::SubjectPublicKeyInfoOwned;
use tracing::debug;
use x509_cert::{
    request::CertReq,
    time::{Time, Validity},
    TbsCertificate, Version,
};

use crate::{
    algorithm,
    cert::Certificate,
    csr::{self, CertificateSigningRequest},
    error::{PkiError, Result},
    name,
    serial::SerialNumber,
};

/// 2050 年之前用 UTCTime，之后用 GeneralizedTime（RFC 5280 §4.1.2.5）
const UTC_TIME_LAST_YEAR: u16 = 2049;

/// 证书签发
pub trait CertificateAuthority {
    /// 用默认配置签发证书
    fn sign(
        &self,
        csr: &CertificateSigningRequest,
        not_before: SystemTime,
        not_after: SystemTime,
    ) -> Result<Certificate>;

    fn sign_with(
        &self,
        csr: &CertificateSigningRequest,
        not_before: SystemTime,
        not_after: SystemTime,
        config: &CryptoConfig,
    ) -> Result<Certificate>;

    /// 签发外部提交的 PKCS#10 请求，签发前先校验请求签名
    fn sign_request(
        &self,
        request: &CertReq,
        not_before: SystemTime,
        not_after: SystemTime,
        config: &CryptoConfig,
    ) -> Result<Certificate>;
}

impl CertificateAuthority for PrivateKey {
    fn sign(
        &self,
        csr: &CertificateSigningRequest,
        not_before: SystemTime,
        not_after: SystemTime,
    ) -> Result<Certificate> {
        self.sign_with(csr, not_before, not_after, &CryptoConfig::default())
    }

    fn sign_with(
        &self,
        csr: &CertificateSigningRequest,
        not_before: SystemTime,
        not_after: SystemTime,
        config: &CryptoConfig,
    ) -> Result<Certificate> {
        let issuer = issuer_dn(self)?;
        issue(
            self,
            issuer,
            csr.subject(),
            csr.public_key(),
            not_before,
            not_after,
            config.signature_algorithm,
        )
    }

    fn sign_request(
        &self,
        request: &CertReq,
        not_before: SystemTime,
        not_after: SystemTime,
        config: &CryptoConfig,
    ) -> Result<Certificate> {
        let issuer = issuer_dn(self)?;
        csr::verify_request(request)?;
        let public_key = csr::request_public_key(request)?;
        let subject = name::from_x509_name(&request.info.subject)?;
        issue(
            self,
            issuer,
            &subject,
            &public_key,
            not_before,
            not_after,
            config.signature_algorithm,
        )
    }
}

/// 自签名根证书：签发者与主体都是 `pair` 的 DN
pub fn self_signed(
    pair: &KeyPair,
    not_before: SystemTime,
    not_after: SystemTime,
) -> Result<Certificate> {
    self_signed_with(pair, not_before, not_after, &CryptoConfig::default())
}

pub fn self_signed_with(
    pair: &KeyPair,
    not_before: SystemTime,
    not_after: SystemTime,
    config: &CryptoConfig,
) -> Result<Certificate> {
    let csr = CertificateSigningRequest::new(pair.public_key().clone(), pair.private_key().clone())?;
    let private_key = match pair.private_key().dn() {
        Some(_) => pair.private_key().clone(),
        None => pair.private_key().clone().with_dn(csr.subject().clone()),
    };
    private_key.sign_with(&csr, not_before, not_after, config)
}

fn issuer_dn(issuer_key: &PrivateKey) -> Result<&DistinguishedName> {
    issuer_key
        .dn()
        .ok_or_else(|| PkiError::signing_msg("Issuer key has no distinguished name"))
}

fn issue(
    issuer_key: &PrivateKey,
    issuer: &DistinguishedName,
    subject: &DistinguishedName,
    subject_key: &PublicKey,
    not_before: SystemTime,
    not_after: SystemTime,
    signature_algorithm: SignatureAlgorithm,
) -> Result<Certificate> {
    let serial = SerialNumber::next();
    let algorithm_id = algorithm::algorithm_identifier(signature_algorithm)?;

    let spki_der = subject_key
        .to_der()
        .map_err(|e| PkiError::signing("Failed to encode subject public key", e))?;
    let subject_public_key_info = SubjectPublicKeyInfoOwned::from_der(&spki_der)
        .map_err(|e| PkiError::signing("Failed to parse subject SPKI", e))?;

    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number: serial.to_x509()?,
        signature: algorithm_id.clone(),
        issuer: name::to_x509_name(issuer)?,
        validity: Validity {
            not_before: to_x509_time(not_before)?,
            not_after: to_x509_time(not_after)?,
        },
        subject: name::to_x509_name(subject)?,
        subject_public_key_info,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: None,
    };

    let tbs_der = tbs_certificate
        .to_der()
        .map_err(|e| PkiError::signing("Failed to encode TBSCertificate", e))?;
    let signature = issuer_key
        .sign_message(signature_algorithm, &tbs_der)
        .map_err(|e| PkiError::signing("Failed to sign certificate", e))?;

    let certificate = x509_cert::Certificate {
        tbs_certificate,
        signature_algorithm: algorithm_id,
        signature: der::asn1::BitString::from_bytes(&signature)
            .map_err(|e| PkiError::signing("Failed to encode signature", e))?,
    };
    let der = certificate
        .to_der()
        .map_err(|e| PkiError::signing("Failed to encode certificate", e))?;

    debug!(
        %serial,
        subject = %subject,
        issuer = %issuer,
        algorithm = %signature_algorithm,
        "issued certificate"
    );

    Certificate::from_der(&der).map_err(|e| PkiError::signing("Issued certificate does not decode", e))
}

/// X.509 时间精度为秒
pub fn to_x509_time(instant: SystemTime) -> Result<Time> {
    let date_time = DateTime::from_system_time(instant)
        .map_err(|e| PkiError::signing("Validity instant is out of range", e))?;
    if date_time.year() <= UTC_TIME_LAST_YEAR {
        let utc = UtcTime::from_date_time(date_time)
            .map_err(|e| PkiError::signing("Invalid UTCTime", e))?;
        Ok(Time::UtcTime(utc))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_date_time(date_time)))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::OnceLock,
        time::{Duration, UNIX_EPOCH},
    };

    use clavis_key::Key;

    use super::*;
    use crate::csr::SigningRequestExt;

    const YEAR: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    fn issuer() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| {
            KeyPair::generate()
                .unwrap()
                .with_dn(DistinguishedName::new("Clavis Test CA").with_company("Clavis"))
        })
    }

    fn subject() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| {
            KeyPair::generate().unwrap().with_dn(
                DistinguishedName::new("foo.com")
                    .with_country_code("US")
                    .with_state("Colorado")
                    .with_city("Denver")
                    .with_company("Long Term Software LLC")
                    .with_division("Development"),
            )
        })
    }

    #[test]
    fn test_sign_csr() {
        let now = SystemTime::now();
        let csr = subject().certificate_signing_request().unwrap();
        let cert = issuer().private_key().sign(&csr, now, now + YEAR).unwrap();

        assert_eq!(cert.subject(), subject().dn().unwrap());
        assert_eq!(cert.issuer(), issuer().dn().unwrap());
        assert_eq!(&cert.public_key(), subject().public_key());
        assert_eq!(cert.signature_algorithm(), Some(SignatureAlgorithm::Sha256WithRsa));
        assert!(cert.verify(issuer().public_key()).unwrap());
        assert!(!cert.verify(subject().public_key()).unwrap());

        let check = SystemTime::now();
        assert!(cert.not_before() <= check);
        assert!(check < cert.not_after());
        assert!(cert.is_valid_at(check));
    }

    #[test]
    fn test_issuer_without_dn_fails() {
        let csr = subject().certificate_signing_request().unwrap();
        let anonymous = PrivateKey::from(issuer().private_key().rsa().clone());
        let now = SystemTime::now();
        let result = anonymous.sign(&csr, now, now + YEAR);
        assert!(matches!(result, Err(PkiError::Signing { .. })));
    }

    #[test]
    fn test_serials_increase() {
        let csr = subject().certificate_signing_request().unwrap();
        let now = SystemTime::now();
        let first = issuer().private_key().sign(&csr, now, now + YEAR).unwrap();
        let second = issuer().private_key().sign(&csr, now, now + YEAR).unwrap();
        assert!(first.serial_number() < second.serial_number());
        // same subject and issuer, so they compare equal anyway
        assert_eq!(first, second);
    }

    #[test]
    fn test_legacy_sha1_issuance() {
        let config =
            CryptoConfig::default().with_signature_algorithm(SignatureAlgorithm::LegacySha1WithRsa);
        let csr = subject().certificate_signing_request().unwrap();
        let now = SystemTime::now();
        let cert = issuer()
            .private_key()
            .sign_with(&csr, now, now + YEAR, &config)
            .unwrap();
        assert_eq!(cert.signature_algorithm(), Some(SignatureAlgorithm::LegacySha1WithRsa));
        assert!(cert.verify(issuer().public_key()).unwrap());
    }

    #[test]
    fn test_sign_external_request() {
        let request = subject()
            .certificate_signing_request()
            .unwrap()
            .to_request_structure()
            .unwrap();
        let now = SystemTime::now();
        let cert = issuer()
            .private_key()
            .sign_request(&request, now, now + YEAR, &CryptoConfig::default())
            .unwrap();
        assert_eq!(cert.subject(), subject().dn().unwrap());

        let mut forged = request.clone();
        forged.info.subject = name::to_x509_name(&DistinguishedName::new("evil.com")).unwrap();
        let result = issuer()
            .private_key()
            .sign_request(&forged, now, now + YEAR, &CryptoConfig::default());
        assert!(matches!(result, Err(PkiError::Signing { .. })));
    }

    #[test]
    fn test_self_signed() {
        let now = SystemTime::now();
        let cert = self_signed(issuer(), now, now + YEAR).unwrap();
        assert_eq!(cert.subject(), cert.issuer());
        assert!(cert.verify(issuer().public_key()).unwrap());
    }

    #[test]
    fn test_issued_key_encrypts_for_subject() {
        let csr = subject().certificate_signing_request().unwrap();
        let now = SystemTime::now();
        let cert = issuer().private_key().sign(&csr, now, now + YEAR).unwrap();
        let message = cert.public_key().to_encrypted_message(b"hello").unwrap();
        assert_eq!(subject().private_key().decrypt_message(&message).unwrap(), b"hello");
    }

    #[test]
    fn test_time_encoding_switches_at_2050() {
        let before = UNIX_EPOCH + Duration::from_secs(2_524_607_999); // 2049-12-31T23:59:59Z
        let after = UNIX_EPOCH + Duration::from_secs(2_524_608_000); // 2050-01-01T00:00:00Z
        assert!(matches!(to_x509_time(before).unwrap(), Time::UtcTime(_)));
        assert!(matches!(to_x509_time(after).unwrap(), Time::GeneralTime(_)));
    }
}
