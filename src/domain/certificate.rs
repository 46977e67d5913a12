//! Certificate domain types.
//!
//! `CertificateInfo` is derived from a parsed certificate on every call and
//! never stored. Validity is a pure function of the certificate bounds and
//! the clock; revocation is not consulted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// Length of a personal taxpayer number (CPF).
const PERSON_DOCUMENT_LEN: usize = 11;

/// Length of an organization taxpayer number (CNPJ).
const ORGANIZATION_DOCUMENT_LEN: usize = 14;

/// Passphrase protecting a PKCS#12 bundle. Wiped on drop, never printed.
#[derive(Clone)]
pub struct Passphrase(Zeroizing<String>);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Passphrase {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase([REDACTED])")
    }
}

impl fmt::Display for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Kind of holder identified by the number embedded in the common name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolderKind {
    Person,
    Organization,
}

/// Taxpayer number carried in a `"NAME:NUMBER"` common name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDocument {
    pub number: String,
    pub kind: HolderKind,
}

impl IdentityDocument {
    /// Parse the number after the last `:` of a common name. Only 11-digit
    /// (person) and 14-digit (organization) numbers are recognized.
    #[must_use]
    pub fn from_common_name(common_name: &str) -> Option<Self> {
        let (_, number) = common_name.rsplit_once(':')?;
        let number = number.trim();
        let kind = match number.len() {
            PERSON_DOCUMENT_LEN => HolderKind::Person,
            ORGANIZATION_DOCUMENT_LEN => HolderKind::Organization,
            _ => return None,
        };
        Some(Self {
            number: number.to_string(),
            kind,
        })
    }
}

/// Validity of a certificate at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateValidity {
    pub is_valid: bool,
    pub expired: bool,
    pub not_yet_valid: bool,
    /// Whole days until `not_after`; 0 whenever the certificate is not valid
    pub days_remaining: i64,
}

impl CertificateValidity {
    #[must_use]
    pub fn evaluate(
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        let expired = now > not_after;
        let not_yet_valid = now < not_before;
        let is_valid = !expired && !not_yet_valid;
        let days_remaining = if is_valid {
            (not_after - now).num_days()
        } else {
            0
        };
        Self {
            is_valid,
            expired,
            not_yet_valid,
            days_remaining,
        }
    }
}

/// Identity and validity information extracted from a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInfo {
    pub common_name: Option<String>,
    pub organization: Option<String>,
    pub organizational_unit: Option<String>,
    pub email: Option<String>,
    pub issuer_common_name: Option<String>,
    pub issuer_organization: Option<String>,
    pub identity_document: Option<IdentityDocument>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// Decimal serial number
    pub serial_number: String,
    pub validity: CertificateValidity,
}

impl CertificateInfo {
    /// Name to print on stamps and in signature dictionaries. The taxpayer
    /// number suffix is stripped.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.common_name.as_deref() {
            Some(cn) if self.identity_document.is_some() => cn
                .rsplit_once(':')
                .map_or(cn, |(name, _)| name)
                .trim()
                .to_string(),
            Some(cn) => cn.to_string(),
            None => "Signer".to_string(),
        }
    }
}
