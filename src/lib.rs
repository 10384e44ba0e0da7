//! # Clavis - 密钥与证书管理
//!
//! RSA 密钥对、PEM 编解码、混合信封加密、PKCS#10 证书请求、CA 签发，以及
//! 用主密码加密保存的别名密钥库。
//!
//! ## 模块
//!
//! - `clavis_crypto` - 基础加密原语
//! - `clavis_key` - 密钥、DN 与信封加密
//! - `clavis_pki` - 证书请求、签发、证书与密钥库

// Re-export all sub-crates
pub use clavis_crypto;
pub use clavis_key;
pub use clavis_pki;

pub mod prelude {
    pub use clavis_key::{
        CryptoConfig, DistinguishedName, EncryptedMessage, Key, KeyPair, PrivateKey, PublicKey,
        SessionAlgorithm, SignatureAlgorithm,
    };
    pub use clavis_pki::prelude::*;
}
