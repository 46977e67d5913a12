//! PKCS#12 loading and certificate inspection.
//!
//! Validity is judged purely from the certificate's own bounds. Revocation
//! (CRL/OCSP) is not consulted.

use crate::domain::certificate::{
    CertificateInfo, CertificateValidity, IdentityDocument, Passphrase,
};
use crate::domain::crypto::SigningCredential;
use crate::infra::error::{CertificateError, CertificateResult};
use chrono::{DateTime, Utc};
use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::error::ErrorStack;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::x509::{X509NameRef, X509Ref};

pub struct CertificateLoader;

impl CertificateLoader {
    /// Open a PKCS#12 bundle.
    ///
    /// A bundle that cannot be decoded at all is `Malformed`; a bundle that
    /// decodes but cannot be decrypted is `WrongPassword`. Nothing from a
    /// failed attempt is returned.
    pub fn load(pfx_bytes: &[u8], passphrase: &Passphrase) -> CertificateResult<SigningCredential> {
        if pfx_bytes.is_empty() {
            return Err(CertificateError::Malformed("empty PKCS#12 input".to_string()));
        }

        let bundle = Pkcs12::from_der(pfx_bytes)
            .map_err(|e| CertificateError::Malformed(format!("not a PKCS#12 bundle: {e}")))?;
        let parsed = bundle
            .parse2(passphrase.expose())
            .map_err(classify_parse_error)?;

        let private_key = parsed.pkey.ok_or_else(|| {
            CertificateError::Malformed("bundle contains no private key".to_string())
        })?;
        let certificate = parsed.cert.ok_or_else(|| {
            CertificateError::Malformed("bundle contains no certificate".to_string())
        })?;
        let chain: Vec<_> = parsed.ca.map(|stack| stack.into_iter().collect()).unwrap_or_default();

        let matches = certificate
            .public_key()
            .map(|public| public.public_eq(&private_key))
            .map_err(|e| CertificateError::Malformed(e.to_string()))?;
        if !matches {
            return Err(CertificateError::Malformed(
                "private key does not match the certificate".to_string(),
            ));
        }

        log::info!(
            "Loaded PKCS#12 bundle ({} chain certificate(s))",
            chain.len()
        );
        Ok(SigningCredential::new(private_key, certificate, chain))
    }

    /// Identity and validity of `certificate` as of now.
    pub fn get_info(certificate: &X509Ref) -> CertificateResult<CertificateInfo> {
        Self::get_info_at(certificate, Utc::now())
    }

    /// Identity and validity of `certificate` as of `now`.
    pub fn get_info_at(
        certificate: &X509Ref,
        now: DateTime<Utc>,
    ) -> CertificateResult<CertificateInfo> {
        let subject = certificate.subject_name();
        let issuer = certificate.issuer_name();

        let common_name = name_entry(subject, Nid::COMMONNAME);
        let identity_document = common_name
            .as_deref()
            .and_then(IdentityDocument::from_common_name);

        let not_before = asn1_to_datetime(certificate.not_before())?;
        let not_after = asn1_to_datetime(certificate.not_after())?;

        let serial_number = certificate
            .serial_number()
            .to_bn()
            .and_then(|bn| bn.to_dec_str().map(|s| s.to_string()))
            .map_err(|e| CertificateError::Malformed(format!("unreadable serial number: {e}")))?;

        let info = CertificateInfo {
            common_name,
            organization: name_entry(subject, Nid::ORGANIZATIONNAME),
            organizational_unit: name_entry(subject, Nid::ORGANIZATIONALUNITNAME),
            email: name_entry(subject, Nid::PKCS9_EMAILADDRESS),
            issuer_common_name: name_entry(issuer, Nid::COMMONNAME),
            issuer_organization: name_entry(issuer, Nid::ORGANIZATIONNAME),
            identity_document,
            not_before,
            not_after,
            serial_number,
            validity: CertificateValidity::evaluate(not_before, not_after, now),
        };

        log::debug!(
            "Certificate {} valid={} days_remaining={}",
            info.display_name(),
            info.validity.is_valid,
            info.validity.days_remaining
        );
        Ok(info)
    }

    /// Open a bundle only to describe it; the key is dropped right away.
    pub fn inspect(
        pfx_bytes: &[u8],
        passphrase: &Passphrase,
    ) -> CertificateResult<CertificateInfo> {
        let (_, certificate, _) = Self::load(pfx_bytes, passphrase)?.into_parts();
        Self::get_info(&certificate)
    }

    /// Map an invalid window to the matching error.
    pub fn check_validity(info: &CertificateInfo) -> CertificateResult<()> {
        if info.validity.expired {
            return Err(CertificateError::Expired(info.not_after.to_rfc3339()));
        }
        if info.validity.not_yet_valid {
            return Err(CertificateError::NotYetValid(info.not_before.to_rfc3339()));
        }
        Ok(())
    }
}

/// OpenSSL reports an unsupported legacy cipher and a bad MAC through the same
/// call; only the former is a format problem.
fn classify_parse_error(error: ErrorStack) -> CertificateError {
    let unsupported = error.errors().iter().any(|e| {
        e.reason()
            .is_some_and(|r| r.to_ascii_lowercase().contains("unsupported"))
    });
    if unsupported {
        CertificateError::Malformed(format!("unsupported PKCS#12 encryption: {error}"))
    } else {
        log::debug!("PKCS#12 decryption failed");
        CertificateError::WrongPassword
    }
}

fn name_entry(name: &X509NameRef, nid: Nid) -> Option<String> {
    name.entries_by_nid(nid)
        .next()
        .and_then(|entry| entry.data().as_utf8().ok())
        .map(|value| value.to_string())
}

fn asn1_to_datetime(time: &Asn1TimeRef) -> CertificateResult<DateTime<Utc>> {
    let epoch = Asn1Time::from_unix(0)
        .map_err(|e| CertificateError::Malformed(e.to_string()))?;
    let diff = epoch
        .diff(time)
        .map_err(|e| CertificateError::Malformed(format!("unreadable validity date: {e}")))?;
    let seconds = i64::from(diff.days) * 86_400 + i64::from(diff.secs);
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .ok_or_else(|| CertificateError::Malformed(format!("validity date out of range: {time}")))
}
