use thiserror::Error;

/// Key模块的错误类型
#[derive(Error, Debug)]
pub enum Error {
    /// 密钥生成错误
    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    /// 解密错误（密码错误、密文损坏、算法未知）
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// 加密错误
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// PEM / DER / JSON 格式错误
    #[error("Format error: {0}")]
    Format(String),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(String),

    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 底层密码学错误
    #[error(transparent)]
    Crypto(#[from] clavis_crypto::Error),
}

/// Result类型别名
pub type Result<T> = std::result::Result<T, Error>;
