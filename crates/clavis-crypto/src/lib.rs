//! Clavis Cryptography Library
//!
//! Primitive layer for the clavis workspace: the RSA key handle used for
//! key wrapping and PKCS#1 v1.5 signatures, the session (AEAD) ciphers used
//! for envelope encryption, and the password KDF behind the keystore.

pub mod error;

pub mod asymmetric;
pub mod kdf;
pub mod symmetric;

pub use asymmetric::{
    rsa::{Rsa, MIN_RSA_BITS},
    SignatureAlgorithm,
};
pub use error::{Error, Result};
pub use kdf::{derive_key32, random_bytes};
pub use symmetric::{aes::Aes, chacha::ChaCha, SessionAlgorithm, SessionKey};
