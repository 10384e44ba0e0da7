use thiserror::Error;

type Cause = Box<dyn std::error::Error + Send + Sync>;

/// PKI模块的错误类型
///
/// 每个变体都保留原始错误，调用方可以通过 `source()` 取得底层原因。
#[derive(Error, Debug)]
pub enum PkiError {
    /// 密钥生成错误
    #[error("Key generation error: {message}")]
    KeyGeneration {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// 签名错误（CSR 或证书签发）
    #[error("Signing error: {message}")]
    Signing {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// 解密错误（密码错误或数据被篡改）
    #[error("Decryption error: {message}")]
    Decryption {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// 格式错误（PEM / DER / 容器）
    #[error("Format error: {message}")]
    Format {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// 证书解析错误
    #[error("Certificate decode error: {message}")]
    CertificateDecode {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// 存储错误（store/load 过程中的 IO）
    #[error("Persistence error: {message}")]
    Persistence {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// 容器文件不存在
    #[error("Not found: {0}")]
    NotFound(String),

    /// 密钥模块错误
    #[error(transparent)]
    Key(#[from] clavis_key::Error),
}

macro_rules! constructors {
    ($($fn_name:ident => $variant:ident),* $(,)?) => {
        impl PkiError {
            $(
                pub fn $fn_name<E>(message: impl Into<String>, source: E) -> Self
                where
                    E: Into<Cause>,
                {
                    Self::$variant {
                        message: message.into(),
                        source: Some(source.into()),
                    }
                }
            )*
        }
    };
}

constructors! {
    key_generation => KeyGeneration,
    signing => Signing,
    decryption => Decryption,
    format => Format,
    certificate_decode => CertificateDecode,
    persistence => Persistence,
}

impl PkiError {
    pub fn signing_msg(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
            source: None,
        }
    }

    pub fn format_msg(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
            source: None,
        }
    }

    pub fn certificate_decode_msg(message: impl Into<String>) -> Self {
        Self::CertificateDecode {
            message: message.into(),
            source: None,
        }
    }

    pub fn persistence_msg(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
            source: None,
        }
    }

    /// 密码错误或数据被篡改时为 true，调用方可据此重新提示输入密码
    pub fn is_decryption(&self) -> bool {
        matches!(
            self,
            Self::Decryption { .. } | Self::Key(clavis_key::Error::Decryption(_))
        )
    }

    pub fn is_format(&self) -> bool {
        matches!(
            self,
            Self::Format { .. } | Self::Key(clavis_key::Error::Format(_))
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result类型别名
pub type Result<T> = std::result::Result<T, PkiError>;
