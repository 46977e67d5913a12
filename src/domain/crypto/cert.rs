use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use std::fmt;

/// Key material opened from a PKCS#12 bundle: signing key, end-entity
/// certificate and the remaining chain (intermediates first, root last when
/// present).
///
/// The key is owned, moved into the signer and dropped when signing ends.
pub struct SigningCredential {
    private_key: PKey<Private>,
    certificate: X509,
    chain: Vec<X509>,
}

impl SigningCredential {
    #[must_use]
    pub fn new(private_key: PKey<Private>, certificate: X509, chain: Vec<X509>) -> Self {
        Self {
            private_key,
            certificate,
            chain,
        }
    }

    #[must_use]
    pub fn private_key(&self) -> &PKey<Private> {
        &self.private_key
    }

    #[must_use]
    pub fn certificate(&self) -> &X509 {
        &self.certificate
    }

    #[must_use]
    pub fn chain(&self) -> &[X509] {
        &self.chain
    }

    /// Split into parts. Callers that only need the certificate can drop the
    /// key right away.
    #[must_use]
    pub fn into_parts(self) -> (PKey<Private>, X509, Vec<X509>) {
        (self.private_key, self.certificate, self.chain)
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subject = self
            .certificate
            .subject_name()
            .entries()
            .filter_map(|e| e.data().as_utf8().ok().map(|s| s.to_string()))
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "SigningCredential(subject={subject}, chain={}, key=[REDACTED])",
            self.chain.len()
        )
    }
}
