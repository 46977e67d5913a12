//! Error types for signature validation and PDF signing operations.
//!
//! Each concern owns its own enum so callers can match on the failure class
//! that matters to them: validation failures are recorded per document,
//! certificate and signing failures abort the request.

use thiserror::Error;

/// Result type for remote validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for certificate loading operations
pub type CertificateResult<T> = Result<T, CertificateError>;

/// Result type for PDF signing operations
pub type SigningResult<T> = Result<T, SigningError>;

/// Result type for detached (A3) signing operations
pub type A3Result<T> = Result<T, A3Error>;

/// Result type for orchestration code that spans several concerns
pub type TrustResult<T> = Result<T, TrustError>;

/// Failures while driving the remote validation authority.
///
/// Inside a batch these are downgraded to an `ERROR` record and never
/// propagated past the batch boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq, miette::Diagnostic)]
pub enum ValidationError {
    #[error("Validation timed out: {0}")]
    Timeout(String),

    #[error("Automation failure: {0}")]
    AutomationFailure(String),

    #[error("Could not parse validation results: {0}")]
    ParseFailure(String),
}

/// Failures while opening or evaluating a PKCS#12 certificate.
#[derive(Error, Debug, Clone, PartialEq, Eq, miette::Diagnostic)]
pub enum CertificateError {
    #[error("Wrong certificate passphrase")]
    WrongPassword,

    #[error("Malformed certificate bundle: {0}")]
    Malformed(String),

    #[error("Certificate expired on {0}")]
    Expired(String),

    #[error("Certificate not valid before {0}")]
    NotYetValid(String),
}

/// Failures while producing a signed PDF.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SigningError {
    #[error("Invalid signing certificate: {0}")]
    InvalidCertificate(#[source] CertificateError),

    #[error("PDF is corrupt or unsupported: {0}")]
    PdfCorrupt(String),

    #[error("Signature appearance does not fit: {0}")]
    AppearanceLayoutError(String),

    #[error("Cryptographic error: {0}")]
    CryptographicError(String),
}

/// Failures in the detached (hardware token) signing flow.
#[derive(Error, Debug, Clone, PartialEq, Eq, miette::Diagnostic)]
pub enum A3Error {
    #[error("Detached signing is not implemented yet: {0}")]
    NotImplemented(String),

    #[error("Invalid external signature blob: {0}")]
    InvalidSignatureBlob(String),
}

/// Umbrella error for workflows and the command line tool.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum TrustError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    A3(#[from] A3Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TrustError {
    fn from(error: std::io::Error) -> Self {
        TrustError::Io(error.to_string())
    }
}

impl From<openssl::error::ErrorStack> for SigningError {
    fn from(error: openssl::error::ErrorStack) -> Self {
        SigningError::CryptographicError(error.to_string())
    }
}

impl From<lopdf::Error> for SigningError {
    fn from(error: lopdf::Error) -> Self {
        SigningError::PdfCorrupt(error.to_string())
    }
}

impl From<CertificateError> for SigningError {
    fn from(error: CertificateError) -> Self {
        SigningError::InvalidCertificate(error)
    }
}

impl From<fantoccini::error::CmdError> for ValidationError {
    fn from(error: fantoccini::error::CmdError) -> Self {
        ValidationError::AutomationFailure(error.to_string())
    }
}

impl From<fantoccini::error::NewSessionError> for ValidationError {
    fn from(error: fantoccini::error::NewSessionError) -> Self {
        ValidationError::AutomationFailure(format!("Failed to open browser session: {error}"))
    }
}
