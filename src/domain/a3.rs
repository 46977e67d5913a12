//! Detached (hardware token) signing data.
//!
//! The hash package crosses a process boundary to an external signer, so it
//! is a plain serializable record. The signature blob it sends back may be hex
//! or base64 encoded.

use crate::infra::error::{A3Error, A3Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Algorithm label sent to the external signer.
pub const A3_HASH_ALGORITHM: &str = "SHA-256";

/// Digest package handed to an external signing device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct A3HashPackage {
    pub hash_hex: String,
    pub algorithm: String,
    pub pdf_size: u64,
    pub timestamp: DateTime<Utc>,
}

/// Raw signature returned by the external signer.
#[derive(Clone, PartialEq, Eq)]
pub struct ExternalSignature(Vec<u8>);

impl ExternalSignature {
    pub fn from_bytes(bytes: Vec<u8>) -> A3Result<Self> {
        if bytes.is_empty() {
            return Err(A3Error::InvalidSignatureBlob(
                "signature is empty".to_string(),
            ));
        }
        Ok(Self(bytes))
    }

    /// Decode a hex or standard base64 blob, whichever parses.
    pub fn decode(encoded: &str) -> A3Result<Self> {
        let trimmed = encoded.trim();
        let is_hex = trimmed.len() % 2 == 0 && trimmed.chars().all(|c| c.is_ascii_hexdigit());
        let bytes = if is_hex {
            hex::decode(trimmed).map_err(|e| A3Error::InvalidSignatureBlob(e.to_string()))?
        } else {
            base64::engine::general_purpose::STANDARD
                .decode(trimmed)
                .map_err(|e| A3Error::InvalidSignatureBlob(e.to_string()))?
        };
        Self::from_bytes(bytes)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ExternalSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExternalSignature(len={})", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_hex_and_base64() {
        let hex_sig = ExternalSignature::decode("deadbeef").unwrap();
        assert_eq!(hex_sig.as_slice(), &[0xde, 0xad, 0xbe, 0xef]);

        let b64_sig = ExternalSignature::decode("3q2+7w==").unwrap();
        assert_eq!(b64_sig, hex_sig);
    }

    #[test]
    fn empty_blob_is_rejected() {
        assert!(matches!(
            ExternalSignature::decode(""),
            Err(A3Error::InvalidSignatureBlob(_))
        ));
        assert!(ExternalSignature::decode("not base64 !!").is_err());
    }
}
