//! Foundational cryptographic domain types.
//!
//! Provides strongly-typed wrappers for cryptographic artifacts:
//! - SHA-256 digest values with size validation
//! - Signing credentials opened from PKCS#12 bundles

mod cert;
mod digest_bytes;

pub use cert::SigningCredential;
pub use digest_bytes::{Sha256Digest, SHA256_LEN};
