//! Signing request and result types.

use crate::domain::crypto::SigningCredential;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named placement presets for the visible stamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureAnchor {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
    CenterBottom,
}

impl SignatureAnchor {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAnchor::BottomRight => "bottom-right",
            SignatureAnchor::BottomLeft => "bottom-left",
            SignatureAnchor::TopRight => "top-right",
            SignatureAnchor::TopLeft => "top-left",
            SignatureAnchor::CenterBottom => "center-bottom",
        }
    }
}

impl FromStr for SignatureAnchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bottom-right" => Ok(SignatureAnchor::BottomRight),
            "bottom-left" => Ok(SignatureAnchor::BottomLeft),
            "top-right" => Ok(SignatureAnchor::TopRight),
            "top-left" => Ok(SignatureAnchor::TopLeft),
            "center-bottom" => Ok(SignatureAnchor::CenterBottom),
            other => Err(format!("Unknown signature anchor: {other}")),
        }
    }
}

impl fmt::Display for SignatureAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page that receives the signature widget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPage {
    #[default]
    First,
    Last,
    /// Zero-based index, clamped to the last page
    Index(usize),
}

impl TargetPage {
    /// Zero-based page index for a document with `page_count` pages.
    #[must_use]
    pub fn resolve(&self, page_count: usize) -> usize {
        let last = page_count.saturating_sub(1);
        match self {
            TargetPage::First => 0,
            TargetPage::Last => last,
            TargetPage::Index(index) => (*index).min(last),
        }
    }
}

impl FromStr for TargetPage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(TargetPage::First),
            "last" | "-1" => Ok(TargetPage::Last),
            other => other
                .parse::<usize>()
                .map(TargetPage::Index)
                .map_err(|_| format!("Invalid target page: {other}")),
        }
    }
}

/// Everything needed to sign one PDF.
pub struct SigningRequest {
    pub pdf_bytes: Vec<u8>,
    pub credential: SigningCredential,
    pub reason: String,
    pub location: String,
    pub visible: bool,
    pub anchor: SignatureAnchor,
    pub target_page: TargetPage,
}

impl SigningRequest {
    /// Invisible signature with empty reason and location.
    #[must_use]
    pub fn new(pdf_bytes: Vec<u8>, credential: SigningCredential) -> Self {
        Self {
            pdf_bytes,
            credential,
            reason: String::new(),
            location: String::new(),
            visible: false,
            anchor: SignatureAnchor::default(),
            target_page: TargetPage::default(),
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Request a visible stamp at `anchor` on `page`.
    #[must_use]
    pub fn with_stamp(mut self, anchor: SignatureAnchor, page: TargetPage) -> Self {
        self.visible = true;
        self.anchor = anchor;
        self.target_page = page;
        self
    }
}

impl fmt::Debug for SigningRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningRequest")
            .field("pdf_len", &self.pdf_bytes.len())
            .field("credential", &self.credential)
            .field("reason", &self.reason)
            .field("location", &self.location)
            .field("visible", &self.visible)
            .field("anchor", &self.anchor)
            .field("target_page", &self.target_page)
            .finish()
    }
}

/// A signed PDF ready to hand back to the caller.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedDocument {
    pub bytes: Vec<u8>,
    pub signer_common_name: String,
    pub signed_at: DateTime<Utc>,
}

impl fmt::Debug for SignedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SignedDocument(signer={}, signed_at={}, len={})",
            self.signer_common_name,
            self.signed_at.to_rfc3339(),
            self.bytes.len()
        )
    }
}
