//! PDF Trust Library
//!
//! Checks PDF signatures against a remote validation authority and produces
//! PAdES-style signatures from PKCS#12 (A1) certificates.
//!
//! - Validation: [`BatchValidator`] drives a [`RemoteSignatureValidator`]
//!   (browser-backed by default) with bounded concurrency and returns one
//!   [`ValidationRecord`] per input, in input order.
//! - Signing: [`CertificateLoader`] opens the bundle, [`PdfSigner`] appends an
//!   incremental update carrying a detached CMS signature.
//! - Hardware tokens: [`A3HashPreparer`] computes the digest for an external
//!   signer.

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod pipelines;
pub mod services;

pub use adapters::{
    AutomationSession, BrowserSignatureValidator, DriverPool, RemoteSignatureValidator,
    SessionFactory,
};
pub use domain::a3::{A3HashPackage, ExternalSignature};
pub use domain::certificate::{CertificateInfo, Passphrase};
pub use domain::crypto::SigningCredential;
pub use domain::signing::{SignatureAnchor, SignedDocument, SigningRequest, TargetPage};
pub use domain::validation::{DocumentInput, FinalVerdict, ValidationRecord};
pub use infra::config::{ConfigManager, TrustConfiguration};
pub use infra::error::{
    A3Error, A3Result, CertificateError, CertificateResult, SigningError, SigningResult,
    TrustError, TrustResult, ValidationError, ValidationResult,
};
pub use pipelines::{sign_pdf_file, BatchValidator, SignOptions, SignOutcome, SignWorkflow};
pub use services::{A3HashPreparer, CertificateLoader, PdfSigner, ResultExtractor};
