//! `SignWorkflow` runs the one-call A1 signing path: open the PKCS#12
//! bundle, describe the certificate, then sign the PDF with it.
//!
//! The key material only lives for the duration of a single call.

use crate::domain::certificate::{CertificateInfo, Passphrase};
use crate::domain::signing::{SignatureAnchor, SignedDocument, SigningRequest, TargetPage};
use crate::infra::config::SigningDefaults;
use crate::infra::error::{TrustError, TrustResult};
use crate::services::certificate_loader::CertificateLoader;
use crate::services::pdf_signer::PdfSigner;
use std::path::Path;

/// Caller choices for one signature. `None` falls back to the configured
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct SignOptions {
    pub reason: Option<String>,
    pub location: Option<String>,
    pub visible: bool,
    pub anchor: SignatureAnchor,
    pub target_page: TargetPage,
}

/// Output of a signing run.
#[derive(Debug, Clone)]
pub struct SignOutcome {
    pub document: SignedDocument,
    pub certificate: CertificateInfo,
}

pub struct SignWorkflow {
    defaults: SigningDefaults,
    signer: PdfSigner,
}

impl SignWorkflow {
    #[must_use]
    pub fn new(defaults: SigningDefaults) -> Self {
        Self {
            signer: PdfSigner::new(defaults.clone()),
            defaults,
        }
    }

    /// Sign `pdf_bytes` with the key in `pfx_bytes`.
    pub fn sign(
        &self,
        pdf_bytes: Vec<u8>,
        pfx_bytes: &[u8],
        passphrase: &Passphrase,
        options: &SignOptions,
    ) -> TrustResult<SignOutcome> {
        let credential = CertificateLoader::load(pfx_bytes, passphrase)?;
        let certificate = CertificateLoader::get_info(credential.certificate())?;
        log::info!(
            "Loaded certificate for {} (valid until {})",
            certificate.display_name(),
            certificate.not_after.format("%Y-%m-%d")
        );

        let reason = options
            .reason
            .clone()
            .unwrap_or_else(|| self.defaults.default_reason.clone());
        let location = options
            .location
            .clone()
            .unwrap_or_else(|| self.defaults.default_location.clone());

        let mut request = SigningRequest::new(pdf_bytes, credential)
            .with_reason(reason)
            .with_location(location);
        if options.visible {
            request = request.with_stamp(options.anchor, options.target_page);
        }

        let document = self.signer.sign(request)?;
        Ok(SignOutcome {
            document,
            certificate,
        })
    }
}

/// Read `input` and `pfx`, sign, and write the result to `output`.
///
/// Nothing is written when signing fails.
pub fn sign_pdf_file(
    input: &Path,
    output: &Path,
    pfx: &Path,
    passphrase: &Passphrase,
    options: &SignOptions,
    defaults: SigningDefaults,
) -> TrustResult<SignOutcome> {
    let pdf_bytes = std::fs::read(input)
        .map_err(|e| TrustError::Io(format!("Failed to read {}: {e}", input.display())))?;
    let pfx_bytes = std::fs::read(pfx)
        .map_err(|e| TrustError::Io(format!("Failed to read {}: {e}", pfx.display())))?;

    let outcome = SignWorkflow::new(defaults).sign(pdf_bytes, &pfx_bytes, passphrase, options)?;

    std::fs::write(output, &outcome.document.bytes)
        .map_err(|e| TrustError::Io(format!("Failed to write {}: {e}", output.display())))?;
    log::info!(
        "Signed PDF written to {} ({} bytes)",
        output.display(),
        outcome.document.bytes.len()
    );
    Ok(outcome)
}
