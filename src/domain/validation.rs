//! Validation domain types for documents checked by the remote authority.
//!
//! A `ValidationRecord` is built once per document and handed to the caller;
//! nothing here is cached or persisted.
//!
//! The authority renders authenticity and integrity as a single combined
//! indicator. Both fields are therefore always set from the same slot and are
//! identical in every record this crate produces.

use crate::infra::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Number of result slots rendered by the authority.
pub const RESULT_SLOT_COUNT: usize = 8;

/// Number of booleans that decide the verdict and the score.
pub const PRIMARY_CHECK_COUNT: u32 = 7;

/// Prefix of `error_message` for results read without a stable page.
pub const DEGRADED_CONFIDENCE_FLAG: &str = "degraded-confidence";

/// Overall outcome of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalVerdict {
    Validated,
    NotValidated,
    Error,
}

impl fmt::Display for FinalVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FinalVerdict::Validated => "VALIDATED",
            FinalVerdict::NotValidated => "NOT_VALIDATED",
            FinalVerdict::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// A document submitted for validation.
#[derive(Clone)]
pub struct DocumentInput {
    pub filename: String,
    pub bytes: Arc<[u8]>,
}

impl DocumentInput {
    #[must_use]
    pub fn new(filename: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn header(&self) -> RecordHeader {
        RecordHeader {
            filename: self.filename.clone(),
            size_bytes: self.bytes.len() as u64,
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Debug for DocumentInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DocumentInput(filename={}, len={})",
            self.filename,
            self.bytes.len()
        )
    }
}

/// Identifying fields copied into every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub filename: String,
    pub size_bytes: u64,
    pub timestamp: DateTime<Utc>,
}

/// Pass/fail state of the result slots, in the authority's order.
///
/// Slot 5 carries the combined authenticity/integrity indicator.
/// `rendered_verdict` is what the page itself showed in slot 8; it is kept
/// for cross-checking only and never decides `final_verdict`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct SlotReadings {
    pub extension: bool,
    pub password: bool,
    pub file_size: bool,
    pub page_size: bool,
    pub signed: bool,
    pub authenticity_integrity: bool,
    pub searchable: bool,
    pub rendered_verdict: bool,
}

impl SlotReadings {
    /// Map positional pass flags onto named slots.
    #[must_use]
    pub fn from_slots(slots: [bool; RESULT_SLOT_COUNT]) -> Self {
        Self {
            extension: slots[0],
            password: slots[1],
            file_size: slots[2],
            page_size: slots[3],
            signed: slots[4],
            authenticity_integrity: slots[5],
            searchable: slots[6],
            rendered_verdict: slots[7],
        }
    }
}

/// Structured outcome of validating one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct ValidationRecord {
    pub filename: String,
    pub size_bytes: u64,
    pub timestamp: DateTime<Utc>,
    pub extension_valid: bool,
    pub no_password: bool,
    pub file_size_ok: bool,
    pub page_size_ok: bool,
    pub signed: bool,
    pub authenticity_ok: bool,
    pub integrity_ok: bool,
    pub searchable: bool,
    pub signature_count: u32,
    pub final_verdict: FinalVerdict,
    pub score: u8,
    pub error_message: Option<String>,
}

impl ValidationRecord {
    /// Build a record from slot readings, recomputing verdict and score.
    #[must_use]
    pub fn from_readings(header: RecordHeader, readings: &SlotReadings) -> Self {
        let mut record = Self {
            filename: header.filename,
            size_bytes: header.size_bytes,
            timestamp: header.timestamp,
            extension_valid: readings.extension,
            no_password: readings.password,
            file_size_ok: readings.file_size,
            page_size_ok: readings.page_size,
            signed: readings.signed,
            authenticity_ok: readings.authenticity_integrity,
            integrity_ok: readings.authenticity_integrity,
            searchable: readings.searchable,
            // The authority does not report a count
            signature_count: u32::from(readings.signed),
            final_verdict: FinalVerdict::NotValidated,
            score: 0,
            error_message: None,
        };
        record.final_verdict = if record.passed_count() == PRIMARY_CHECK_COUNT {
            FinalVerdict::Validated
        } else {
            FinalVerdict::NotValidated
        };
        record.score = record.compute_score();
        record
    }

    /// Fail-closed record with an `ERROR` verdict.
    #[must_use]
    pub fn failed(header: RecordHeader, message: impl Into<String>) -> Self {
        let mut record = Self::from_readings(header, &SlotReadings::default());
        record.final_verdict = FinalVerdict::Error;
        record.error_message = Some(message.into());
        record
    }

    /// `ERROR` record carrying the validation failure text.
    #[must_use]
    pub fn from_error(header: RecordHeader, error: &ValidationError) -> Self {
        Self::failed(header, error.to_string())
    }

    /// Degraded `ERROR` record for a document whose result never arrived
    /// (hard timeout or cancellation).
    #[must_use]
    pub fn timed_out(header: RecordHeader, reason: &str) -> Self {
        let mut record = Self::from_readings(header, &SlotReadings::default());
        record.final_verdict = FinalVerdict::Error;
        record.mark_degraded(reason);
        record
    }

    /// Number of primary checks that passed. Integrity is excluded because it
    /// always mirrors authenticity.
    #[must_use]
    pub fn passed_count(&self) -> u32 {
        [
            self.extension_valid,
            self.no_password,
            self.file_size_ok,
            self.page_size_ok,
            self.signed,
            self.authenticity_ok,
            self.searchable,
        ]
        .iter()
        .map(|ok| u32::from(*ok))
        .sum()
    }

    fn compute_score(&self) -> u8 {
        (self.passed_count() * 100 / PRIMARY_CHECK_COUNT) as u8
    }

    /// Mark the record as read from a page that never stabilized.
    pub fn mark_degraded(&mut self, reason: &str) {
        let note = format!("{DEGRADED_CONFIDENCE_FLAG}: {reason}");
        self.error_message = Some(match self.error_message.take() {
            Some(existing) => format!("{note}; {existing}"),
            None => note,
        });
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.error_message
            .as_deref()
            .is_some_and(|m| m.starts_with(DEGRADED_CONFIDENCE_FLAG))
    }

    #[must_use]
    pub fn is_validated(&self) -> bool {
        self.final_verdict == FinalVerdict::Validated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> RecordHeader {
        RecordHeader {
            filename: "doc.pdf".to_string(),
            size_bytes: 1024,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn all_primary_checks_validate() {
        let record = ValidationRecord::from_readings(
            header(),
            &SlotReadings::from_slots([true; RESULT_SLOT_COUNT]),
        );
        assert_eq!(record.final_verdict, FinalVerdict::Validated);
        assert_eq!(record.score, 100);
        assert_eq!(record.signature_count, 1);
        assert!(record.authenticity_ok && record.integrity_ok);
    }

    #[test]
    fn one_failed_check_is_not_validated() {
        let mut slots = [true; RESULT_SLOT_COUNT];
        slots[6] = false;
        let record = ValidationRecord::from_readings(header(), &SlotReadings::from_slots(slots));
        assert_eq!(record.final_verdict, FinalVerdict::NotValidated);
        assert_eq!(record.score, 85);
    }

    #[test]
    fn rendered_verdict_does_not_decide() {
        let mut slots = [true; RESULT_SLOT_COUNT];
        slots[7] = false;
        let record = ValidationRecord::from_readings(header(), &SlotReadings::from_slots(slots));
        assert_eq!(record.final_verdict, FinalVerdict::Validated);

        let mut slots = [false; RESULT_SLOT_COUNT];
        slots[7] = true;
        let record = ValidationRecord::from_readings(header(), &SlotReadings::from_slots(slots));
        assert_eq!(record.final_verdict, FinalVerdict::NotValidated);
        assert_eq!(record.score, 0);
    }

    #[test]
    fn error_record_is_fail_closed() {
        let record = ValidationRecord::from_error(
            header(),
            &ValidationError::AutomationFailure("no such element".into()),
        );
        assert_eq!(record.final_verdict, FinalVerdict::Error);
        assert_eq!(record.passed_count(), 0);
        assert_eq!(record.signature_count, 0);
        assert!(record
            .error_message
            .as_deref()
            .unwrap()
            .contains("no such element"));
        assert!(!record.is_degraded());
    }

    #[test]
    fn degraded_flag_prefixes_existing_message() {
        let mut record = ValidationRecord::failed(header(), "document is not signed");
        record.mark_degraded("results did not stabilize");
        assert!(record.is_degraded());
        assert_eq!(
            record.error_message.as_deref(),
            Some("degraded-confidence: results did not stabilize; document is not signed")
        );
    }

    #[test]
    fn timed_out_record_is_degraded_error() {
        let record = ValidationRecord::timed_out(header(), "hard timeout of 90s exceeded");
        assert_eq!(record.final_verdict, FinalVerdict::Error);
        assert!(record.is_degraded());
        assert_eq!(
            record.error_message.as_deref(),
            Some("degraded-confidence: hard timeout of 90s exceeded")
        );
    }

    #[test]
    fn verdict_serializes_in_screaming_case() {
        let json = serde_json::to_string(&FinalVerdict::NotValidated).unwrap();
        assert_eq!(json, "\"NOT_VALIDATED\"");
    }
}
