use thiserror::Error;

/// Crypto模块的错误类型
#[derive(Error, Debug)]
pub enum Error {
    /// 密钥生成失败
    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    /// 加密失败
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// 解密或认证失败
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// 签名失败
    #[error("Signing error: {0}")]
    Signing(String),

    /// 验签失败
    #[error("Verification error: {0}")]
    Verification(String),

    /// 不支持的算法名
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// DER / PKCS 编码错误
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("PKCS8 error: {0}")]
    Pkcs8Error(#[from] pkcs8::Error),

    #[error("SPKI error: {0}")]
    SpkiError(#[from] pkcs8::spki::Error),

    /// 随机数源错误
    #[error("Rng error: {0}")]
    Rng(#[from] rand::Error),
}

/// Result类型别名
pub type Result<T> = std::result::Result<T, Error>;
