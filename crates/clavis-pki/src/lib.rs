//! Clavis PKI - 证书请求、签发与密钥库
//!
//! 提供 PKCS#10 证书请求、CA 签发、X.509 证书封装，以及用主密码加密保存的
//! 别名密钥库。

pub mod algorithm;
pub mod ca;
pub mod cert;
pub mod csr;
pub mod error;
pub mod keystore;
pub mod name;
pub mod serial;

// 重新导出常用类型
pub use ca::{self_signed, self_signed_with, CertificateAuthority};
pub use cert::Certificate;
pub use csr::{CertificateSigningRequest, SigningRequestExt};
pub use error::{PkiError, Result};
pub use keystore::SecureKeyStore;
pub use serial::SerialNumber;

/// 预导入模块，包含最常用的类型和 trait
pub mod prelude {
    pub use crate::{
        ca::{self_signed, CertificateAuthority},
        cert::Certificate,
        csr::{CertificateSigningRequest, SigningRequestExt},
        error::{PkiError, Result},
        keystore::SecureKeyStore,
    };
}
