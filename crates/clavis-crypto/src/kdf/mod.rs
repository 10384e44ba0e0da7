//! Key Derivation Functions (KDF)
//!
//! Password based key derivation for the keystore container (PBKDF2 with
//! HMAC-SHA256) and the CSPRNG helper shared by the other modules.

use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::Result;

/// Derive a 32-byte symmetric key from a password using PBKDF2-HMAC-SHA256
///
/// # Arguments
/// - `password`: user supplied secret
/// - `salt`: random, non-secret salt stored next to the ciphertext
/// - `iterations`: PBKDF2 work factor
///
/// # Returns
/// 32-byte key suitable for AES-256-GCM or ChaCha20-Poly1305
pub fn derive_key32(password: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; 32]> {
    let mut okm = Zeroizing::new([0u8; 32]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, okm.as_mut());
    okm
}

/// Fill an `N`-byte array from the operating system CSPRNG
pub fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut out = [0u8; N];
    OsRng.try_fill_bytes(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key32_is_deterministic() {
        let a = derive_key32("whatever", b"0123456789abcdef", 1_000);
        let b = derive_key32("whatever", b"0123456789abcdef", 1_000);
        let c = derive_key32("whatever", b"fedcba9876543210", 1_000);
        assert_eq!(*a, *b);
        assert_ne!(*a, *c);
    }

    #[test]
    fn test_random_bytes() {
        let a = random_bytes::<16>().unwrap();
        let b = random_bytes::<16>().unwrap();
        assert_ne!(a, b);
    }
}
