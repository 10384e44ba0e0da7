pub mod config;
pub mod envelope;
pub mod error;
pub mod key;
pub mod name;

// Re-export core functionality
pub use clavis_crypto::{SessionAlgorithm, SignatureAlgorithm};
pub use config::{CryptoConfig, MAX_PBKDF2_ITERATIONS};
pub use envelope::{EncryptedMessage, Key};
pub use error::{Error, Result};
pub use key::{KeyPair, PrivateKey, PublicKey};
pub use name::{DistinguishedName, LdapName};
