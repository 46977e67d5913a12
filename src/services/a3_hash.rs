//! Digest preparation for signing with a hardware token.
//!
//! `prepare` is complete. `finalize` only validates its input: embedding an
//! externally produced signature is not implemented yet.

use crate::domain::a3::{A3HashPackage, ExternalSignature, A3_HASH_ALGORITHM};
use crate::domain::crypto::Sha256Digest;
use crate::domain::signing::SignedDocument;
use crate::infra::error::{A3Error, A3Result};
use chrono::{DateTime, Utc};

pub struct A3HashPreparer;

impl A3HashPreparer {
    /// SHA-256 of the whole PDF, stamped with the current time.
    #[must_use]
    pub fn prepare(pdf_bytes: &[u8]) -> A3HashPackage {
        Self::prepare_at(pdf_bytes, Utc::now())
    }

    /// Same as [`prepare`](Self::prepare) with a caller-supplied timestamp,
    /// which makes the package a pure function of its inputs.
    #[must_use]
    pub fn prepare_at(pdf_bytes: &[u8], timestamp: DateTime<Utc>) -> A3HashPackage {
        let digest = Sha256Digest::of(pdf_bytes);
        log::debug!(
            "Prepared A3 hash for {} bytes: {}",
            pdf_bytes.len(),
            digest.to_hex()
        );
        A3HashPackage {
            hash_hex: digest.to_hex(),
            algorithm: A3_HASH_ALGORITHM.to_string(),
            pdf_size: pdf_bytes.len() as u64,
            timestamp,
        }
    }

    /// Embed an externally produced signature. Not implemented: always fails
    /// with `NotImplemented` once the inputs are checked.
    pub fn finalize(
        pdf_bytes: &[u8],
        external_signature: &ExternalSignature,
    ) -> A3Result<SignedDocument> {
        if pdf_bytes.is_empty() {
            return Err(A3Error::InvalidSignatureBlob(
                "no PDF supplied for finalize".to_string(),
            ));
        }
        log::warn!(
            "A3 finalize requested for {} bytes with a {} byte signature; not implemented",
            pdf_bytes.len(),
            external_signature.as_slice().len()
        );
        Err(A3Error::NotImplemented(
            "embedding an external token signature".to_string(),
        ))
    }
}
