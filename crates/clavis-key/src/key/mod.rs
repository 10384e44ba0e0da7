//! RSA key material
//!
//! [`PublicKey`] and [`PrivateKey`] are the two halves, each optionally
//! carrying the [`DistinguishedName`](crate::DistinguishedName) of its owner.
//! [`KeyPair`] holds both and owns the PEM codecs for the pair.

mod pair;
mod private;
mod public;

pub use pair::KeyPair;
pub use private::PrivateKey;
pub use public::PublicKey;

use pem::{EncodeConfig, LineEnding, Pem};

use crate::error::{Error, Result};

// ============================================================================
// PEM labels
// ============================================================================

pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
pub const RSA_PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";
pub const ENCRYPTED_PRIVATE_KEY_LABEL: &str = "ENCRYPTED PRIVATE KEY";

// ============================================================================
// PEM helpers
// ============================================================================

/// Armor `der` under `label` with LF line endings
pub fn encode_pem(label: &str, der: &[u8]) -> String {
    let block = Pem::new(label, der);
    pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

/// Parse every PEM block in `text`; no blocks at all is a format error
pub fn parse_pem_blocks(text: &str) -> Result<Vec<Pem>> {
    let blocks =
        pem::parse_many(text).map_err(|e| Error::Format(format!("Invalid PEM: {}", e)))?;
    if blocks.is_empty() {
        return Err(Error::Format("No PEM block found".to_string()));
    }
    Ok(blocks)
}

/// Parse exactly one PEM block and check its label
pub fn parse_single_pem(text: &str, label: &str) -> Result<Vec<u8>> {
    let block = pem::parse(text).map_err(|e| Error::Format(format!("Invalid PEM: {}", e)))?;
    if block.tag() != label {
        return Err(Error::Format(format!(
            "Expected PEM label {label}, found {}",
            block.tag()
        )));
    }
    Ok(block.into_contents())
}
