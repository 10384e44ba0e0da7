//! 密钥库容器格式（v1）
//!
//! ```text
//! MAGIC "CLVSKS01" (8) | version u32 BE | pbkdf2 iterations u32 BE
//! | salt (16) | nonce (12) | AES-256-GCM(body) with the header as AAD
//! ```
//!
//! 主体是 JSON，见 [`Body`]。

use clavis_crypto::{derive_key32, random_bytes, Aes};
use clavis_key::MAX_PBKDF2_ITERATIONS;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{PkiError, Result};

pub const MAGIC: &[u8; 8] = b"CLVSKS01";
pub const VERSION: u32 = 1;
pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const HEADER_LEN: usize = MAGIC.len() + 4 + 4 + SALT_LEN + NONCE_LEN;

pub const KIND_PRIVATE_KEY: &str = "private-key";
pub const KIND_TRUSTED_CERTIFICATE: &str = "trusted-certificate";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Body {
    pub entries: Vec<EntryRecord>,
}

/// 单个条目；`kind` 决定哪些字段有效
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRecord {
    pub alias: String,
    pub kind: String,
    /// 加密的 PKCS#8 PEM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dn: Option<clavis_key::DistinguishedName>,
    /// 证书链 PEM，叶子证书在前
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    iterations: u32,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
}

impl Header {
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_be_bytes());
        out.extend_from_slice(&self.iterations.to_be_bytes());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out
    }

    fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(PkiError::format_msg(format!(
                "Keystore is truncated: {} bytes, header needs {HEADER_LEN}",
                data.len()
            )));
        }
        let (magic, rest) = data.split_at(MAGIC.len());
        if magic != MAGIC {
            return Err(PkiError::format_msg("Not a clavis keystore (bad magic)"));
        }
        let (version, rest) = rest.split_at(4);
        let version = u32::from_be_bytes(to_array(version)?);
        if version != VERSION {
            return Err(PkiError::format_msg(format!(
                "Unsupported keystore version {version}"
            )));
        }
        let (iterations, rest) = rest.split_at(4);
        let iterations = u32::from_be_bytes(to_array(iterations)?);
        if iterations == 0 || iterations > MAX_PBKDF2_ITERATIONS {
            return Err(PkiError::format_msg(format!(
                "Keystore header iteration count {iterations} is outside 1..={MAX_PBKDF2_ITERATIONS}"
            )));
        }
        let (salt, rest) = rest.split_at(SALT_LEN);
        let nonce = &rest[..NONCE_LEN];
        Ok(Self {
            iterations,
            salt: to_array(salt)?,
            nonce: to_array(nonce)?,
        })
    }
}

fn to_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| PkiError::format_msg("Keystore header field has the wrong length"))
}

/// 加密并封装主体
pub fn seal(body: &Body, password: &str, iterations: u32) -> Result<Vec<u8>> {
    let plaintext = Zeroizing::new(
        serde_json::to_vec(body).map_err(|e| PkiError::persistence("Failed to serialize keystore", e))?,
    );
    let header = Header {
        iterations,
        salt: random_bytes::<SALT_LEN>()
            .map_err(|e| PkiError::persistence("Failed to generate salt", e))?,
        nonce: random_bytes::<NONCE_LEN>()
            .map_err(|e| PkiError::persistence("Failed to generate nonce", e))?,
    };
    let aad = header.encode();

    let key = derive_key32(password, &header.salt, header.iterations);
    let ciphertext = Aes::new(&key)
        .and_then(|aes| aes.encrypt_with_nonce_and_aad(&plaintext, &header.nonce, &aad))
        .map_err(|e| PkiError::persistence("Failed to encrypt keystore", e))?;

    let mut out = aad;
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// 校验并解密容器；头部问题为格式错误，认证失败为解密错误
pub fn open(data: &[u8], password: &str) -> Result<Body> {
    let header = Header::decode(data)?;
    let (aad, ciphertext) = data.split_at(HEADER_LEN);

    let key = derive_key32(password, &header.salt, header.iterations);
    let plaintext = Aes::new(&key)
        .and_then(|aes| aes.decrypt_with_nonce_and_aad(ciphertext, &header.nonce, aad))
        .map(Zeroizing::new)
        .map_err(|e| {
            PkiError::decryption("Keystore authentication failed (wrong password or tampered file)", e)
        })?;

    serde_json::from_slice(&plaintext)
        .map_err(|e| PkiError::format("Keystore body is not valid JSON", e))
}
