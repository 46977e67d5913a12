//! Detached CMS `SignedData` assembly for PDF signatures.
//!
//! The structure is written by hand so the digest algorithm is always SHA-256
//! and the signed attributes are encoded exactly once: the bytes that are
//! signed are the bytes that are embedded (with the SET tag swapped for
//! `[0] IMPLICIT`).

use crate::domain::constants;
use crate::domain::crypto::{Sha256Digest, SigningCredential};
use crate::domain::der;
use crate::infra::error::{CertificateError, SigningError, SigningResult};
use chrono::{DateTime, Utc};
use openssl::hash::MessageDigest;
use openssl::pkey::{Id, PKeyRef, Private};
use openssl::sign::Signer;
use openssl::x509::X509Ref;

pub struct CmsBuilderService<'a> {
    credential: &'a SigningCredential,
    signing_time: DateTime<Utc>,
}

impl<'a> CmsBuilderService<'a> {
    #[must_use]
    pub fn new(credential: &'a SigningCredential, signing_time: DateTime<Utc>) -> Self {
        Self {
            credential,
            signing_time,
        }
    }

    /// Sign `digest` (the SHA-256 of the PDF byte ranges) and return the full
    /// `ContentInfo` DER.
    pub fn build_detached(&self, digest: &Sha256Digest) -> SigningResult<Vec<u8>> {
        let signature_algorithm = signature_algorithm(self.credential.private_key())?;

        let attrs_set = self.build_signed_attributes(digest);
        let signature = sign_sha256(self.credential.private_key(), &attrs_set)?;
        log::debug!(
            "Signed attributes: {} bytes, signature: {} bytes",
            attrs_set.len(),
            signature.len()
        );

        let mut attrs_implicit = attrs_set;
        attrs_implicit[0] = constants::ASN1_CONTEXT_0_TAG;

        let signer_info =
            self.build_signer_info(&attrs_implicit, &signature_algorithm, &signature)?;
        let signed_data = der::sequence(&[
            constants::CMS_VERSION_1,
            &der::set_of(vec![der::algorithm_identifier(
                constants::SHA256_ALGORITHM_OID,
                true,
            )]),
            // encapContentInfo without eContent: detached
            &der::sequence(&[&der::oid(constants::PKCS7_DATA_OID)]),
            &self.build_certificates_component()?,
            &der::set_of(vec![signer_info]),
        ]);

        Ok(der::sequence(&[
            &der::oid(constants::PKCS7_SIGNED_DATA_OID),
            &der::tlv(constants::ASN1_CONTEXT_0_TAG, &signed_data),
        ]))
    }

    /// contentType, signingTime and messageDigest as a DER SET.
    #[must_use]
    pub fn build_signed_attributes(&self, digest: &Sha256Digest) -> Vec<u8> {
        der::set_of(vec![
            attribute(
                constants::PKCS9_CONTENT_TYPE_OID,
                &der::oid(constants::PKCS7_DATA_OID),
            ),
            attribute(
                constants::PKCS9_SIGNING_TIME_OID,
                &der::time(self.signing_time),
            ),
            attribute(
                constants::PKCS9_MESSAGE_DIGEST_OID,
                &der::octet_string(digest.as_slice()),
            ),
        ])
    }

    fn build_signer_info(
        &self,
        attrs_implicit: &[u8],
        signature_algorithm: &[u8],
        signature: &[u8],
    ) -> SigningResult<Vec<u8>> {
        Ok(der::sequence(&[
            constants::CMS_VERSION_1,
            &issuer_and_serial(self.credential.certificate())?,
            &der::algorithm_identifier(constants::SHA256_ALGORITHM_OID, true),
            attrs_implicit,
            signature_algorithm,
            &der::octet_string(signature),
        ]))
    }

    /// certificates [0] IMPLICIT: signer first, then the chain.
    fn build_certificates_component(&self) -> SigningResult<Vec<u8>> {
        let mut certs = self.credential.certificate().to_der()?;
        for cert in self.credential.chain() {
            certs.extend_from_slice(&cert.to_der()?);
        }
        Ok(der::tlv(constants::ASN1_CONTEXT_0_TAG, &certs))
    }
}

fn attribute(oid: &[u8], value: &[u8]) -> Vec<u8> {
    der::sequence(&[&der::oid(oid), &der::set_of(vec![value.to_vec()])])
}

fn issuer_and_serial(certificate: &X509Ref) -> SigningResult<Vec<u8>> {
    let issuer = certificate.issuer_name().to_der()?;
    let serial = certificate.serial_number().to_bn()?.to_vec();
    Ok(der::sequence(&[&issuer, &der::unsigned_integer(&serial)]))
}

/// `signatureAlgorithm` for the key type. Only RSA and EC keys are supported.
fn signature_algorithm(key: &PKeyRef<Private>) -> SigningResult<Vec<u8>> {
    match key.id() {
        Id::RSA => Ok(der::algorithm_identifier(constants::RSA_ENCRYPTION_OID, true)),
        Id::EC => Ok(der::algorithm_identifier(constants::ECDSA_WITH_SHA256_OID, false)),
        other => Err(SigningError::InvalidCertificate(CertificateError::Malformed(
            format!("unsupported key type {other:?}"),
        ))),
    }
}

fn sign_sha256(key: &PKeyRef<Private>, data: &[u8]) -> SigningResult<Vec<u8>> {
    let mut signer = Signer::new(MessageDigest::sha256(), key)?;
    signer.update(data)?;
    Ok(signer.sign_to_vec()?)
}
