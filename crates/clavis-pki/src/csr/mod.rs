//! Certificate Signing Request (CSR) module
//!
//! A [`CertificateSigningRequest`] pairs the requester's public key (which
//! must carry a [`DistinguishedName`]) with the private key that proves
//! possession. It renders to a PKCS#10 `CertReq`.

use clavis_crypto::asymmetric::rsa;
use clavis_key::{DistinguishedName, KeyPair, PrivateKey, PublicKey, SignatureAlgorithm};
use der::{Decode, Encode};
use pkcs8::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use tracing::debug;
use x509_cert::request::{CertReq, CertReqInfo, Version};

use crate::{
    algorithm,
    error::{PkiError, Result},
    name,
};

pub const CSR_PEM_LABEL: &str = "CERTIFICATE REQUEST";
const LEGACY_CSR_PEM_LABEL: &str = "NEW CERTIFICATE REQUEST";

#[derive(Debug, Clone)]
pub struct CertificateSigningRequest {
    subject: DistinguishedName,
    public_key: PublicKey,
    private_key: PrivateKey,
}

impl CertificateSigningRequest {
    /// The public key's DN becomes the request subject; without one this fails
    pub fn new(public_key: PublicKey, private_key: PrivateKey) -> Result<Self> {
        let subject = public_key.dn().cloned().ok_or_else(|| {
            PkiError::signing_msg("Public key has no distinguished name to use as the request subject")
        })?;
        if !private_key.matches(&public_key) {
            return Err(PkiError::signing_msg(
                "Private key does not match the public key of the request",
            ));
        }
        Ok(Self {
            subject,
            public_key,
            private_key,
        })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    /// PKCS#10 request signed with sha256WithRSAEncryption
    pub fn to_request_structure(&self) -> Result<CertReq> {
        self.to_request_structure_with(SignatureAlgorithm::default())
    }

    pub fn to_request_structure_with(&self, algorithm: SignatureAlgorithm) -> Result<CertReq> {
        let info = build_unsigned(self.subject(), &self.public_key)?;
        let info_der = info
            .to_der()
            .map_err(|e| PkiError::signing("Failed to encode CertReqInfo", e))?;
        let signature = self
            .private_key
            .sign_message(algorithm, &info_der)
            .map_err(|e| PkiError::signing("Failed to sign certificate request", e))?;

        debug!(subject = %self.subject(), %algorithm, "built certificate signing request");
        assemble(info, algorithm::algorithm_identifier(algorithm)?, &signature)
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.to_request_structure()?
            .to_der()
            .map_err(|e| PkiError::signing("Failed to encode certificate request", e))
    }

    pub fn to_pem(&self) -> Result<String> {
        Ok(clavis_key::key::encode_pem(CSR_PEM_LABEL, &self.to_der()?))
    }
}

/// Builds requests straight from a key pair
pub trait SigningRequestExt {
    fn certificate_signing_request(&self) -> Result<CertificateSigningRequest>;
}

impl SigningRequestExt for KeyPair {
    fn certificate_signing_request(&self) -> Result<CertificateSigningRequest> {
        CertificateSigningRequest::new(self.public_key().clone(), self.private_key().clone())
    }
}

/// Build an unsigned CertReqInfo from subject and public key
pub fn build_unsigned(subject: &DistinguishedName, public_key: &PublicKey) -> Result<CertReqInfo> {
    let spki_der = public_key
        .to_der()
        .map_err(|e| PkiError::signing("Failed to encode public key", e))?;
    let spki = SubjectPublicKeyInfoOwned::from_der(&spki_der)
        .map_err(|e| PkiError::signing("Failed to parse SPKI", e))?;

    Ok(CertReqInfo {
        version: Version::V1,
        subject: name::to_x509_name(subject)?,
        public_key: spki,
        attributes: Default::default(),
    })
}

/// Assemble a complete CSR from CertReqInfo and signature
pub fn assemble(
    info: CertReqInfo,
    algorithm: AlgorithmIdentifierOwned,
    signature: &[u8],
) -> Result<CertReq> {
    Ok(CertReq {
        info,
        algorithm,
        signature: der::asn1::BitString::from_bytes(signature)
            .map_err(|e| PkiError::signing("Failed to encode signature", e))?,
    })
}

/// Check the proof-of-possession signature of a request
pub fn verify_request(request: &CertReq) -> Result<()> {
    let algorithm = algorithm::from_oid(&request.algorithm.oid).ok_or_else(|| {
        PkiError::signing_msg(format!(
            "Unsupported request signature algorithm {}",
            request.algorithm.oid
        ))
    })?;
    let public_key = request_public_key(request)?;
    let info_der = request
        .info
        .to_der()
        .map_err(|e| PkiError::signing("Failed to encode CertReqInfo for verification", e))?;

    let verified = rsa::verify(
        public_key.inner(),
        algorithm,
        &info_der,
        request.signature.raw_bytes(),
    )
    .map_err(|e| PkiError::signing("Request signature check failed", e))?;
    if verified {
        Ok(())
    } else {
        Err(PkiError::signing_msg("Request signature does not verify"))
    }
}

/// The requester's public key with the request subject attached
pub fn request_public_key(request: &CertReq) -> Result<PublicKey> {
    let spki_der = request
        .info
        .public_key
        .to_der()
        .map_err(|e| PkiError::format("Failed to encode request SPKI", e))?;
    let subject = name::from_x509_name(&request.info.subject)?;
    Ok(PublicKey::from_der(&spki_der)?.with_dn(subject))
}

/// Parse CSR from PEM format
pub fn parse_request_pem(text: &str) -> Result<CertReq> {
    let block = pem::parse(text).map_err(|e| PkiError::format("Failed to parse PEM", e))?;
    if block.tag() != CSR_PEM_LABEL && block.tag() != LEGACY_CSR_PEM_LABEL {
        return Err(PkiError::format_msg(format!(
            "Invalid PEM tag {}, expected {CSR_PEM_LABEL}",
            block.tag()
        )));
    }
    CertReq::from_der(block.contents()).map_err(|e| PkiError::format("Failed to parse DER", e))
}
