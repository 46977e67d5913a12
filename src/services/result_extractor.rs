//! Turn the authority's rendered results container into a typed record.
//!
//! Slots are read positionally. The markup carries no semantic labels, so the
//! order (extension, password, file size, page size, signed,
//! authenticity+integrity, searchable, rendered verdict) must be re-checked
//! against the live page whenever the authority changes its layout.

use crate::domain::validation::{RecordHeader, SlotReadings, ValidationRecord, RESULT_SLOT_COUNT};
use crate::infra::config::MarkerConfig;
use crate::infra::error::{ValidationError, ValidationResult};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Message attached when the authority reports a missing signature.
pub const UNSIGNED_HINT: &str = "document is not signed";

/// Index of the combined authenticity/integrity slot.
const AUTHENTICITY_SLOT: usize = 5;

/// Classification of one rendered slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Pass,
    Fail,
    /// Neither marker present yet
    Pending,
}

impl SlotState {
    /// Fail-closed: only an explicit pass counts.
    #[must_use]
    pub fn passed(self) -> bool {
        self == SlotState::Pass
    }
}

/// Stateless extractor built from the configured selectors and markers.
#[derive(Debug, Clone)]
pub struct ResultExtractor {
    slot_selector: Selector,
    pass_markers: Vec<String>,
    fail_markers: Vec<String>,
    unsigned_phrases: Vec<String>,
}

impl ResultExtractor {
    pub fn new(markers: &MarkerConfig) -> ValidationResult<Self> {
        let slot_selector = Selector::parse(&markers.slot_selector).map_err(|e| {
            ValidationError::ParseFailure(format!(
                "Invalid slot selector '{}': {e}",
                markers.slot_selector
            ))
        })?;
        Ok(Self {
            slot_selector,
            pass_markers: markers.pass_markers.clone(),
            fail_markers: markers.fail_markers.clone(),
            unsigned_phrases: markers
                .unsigned_phrases
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
        })
    }

    /// Classify every slot found in `markup`, in document order.
    #[must_use]
    pub fn slot_states(&self, markup: &str) -> Vec<SlotState> {
        let document = Html::parse_fragment(markup);
        document
            .select(&self.slot_selector)
            .map(|slot| self.classify(slot))
            .collect()
    }

    /// True once all result slots carry a pass or fail marker.
    #[must_use]
    pub fn markers_present(&self, markup: &str) -> bool {
        let states = self.slot_states(markup);
        states.len() >= RESULT_SLOT_COUNT
            && states[..RESULT_SLOT_COUNT]
                .iter()
                .all(|s| *s != SlotState::Pending)
    }

    /// Strict extraction: fewer than eight slots is a parse failure.
    pub fn try_extract(
        &self,
        markup: &str,
        header: RecordHeader,
    ) -> ValidationResult<ValidationRecord> {
        let document = Html::parse_fragment(markup);
        let slots: Vec<ElementRef<'_>> = document.select(&self.slot_selector).collect();
        if slots.len() < RESULT_SLOT_COUNT {
            return Err(ValidationError::ParseFailure(format!(
                "expected {RESULT_SLOT_COUNT} result slots, found {}",
                slots.len()
            )));
        }
        if slots.len() > RESULT_SLOT_COUNT {
            log::warn!(
                "Results container has {} slots, reading the first {}",
                slots.len(),
                RESULT_SLOT_COUNT
            );
        }

        let mut flags = [false; RESULT_SLOT_COUNT];
        for (flag, slot) in flags.iter_mut().zip(&slots) {
            *flag = self.classify(*slot).passed();
        }
        let readings = SlotReadings::from_slots(flags);
        let mut record = ValidationRecord::from_readings(header, &readings);

        if readings.rendered_verdict != record.is_validated() {
            log::warn!(
                "Rendered verdict disagrees for {} (rendered pass={}, computed={})",
                record.filename,
                readings.rendered_verdict,
                record.final_verdict
            );
        }

        if !readings.authenticity_integrity
            && self.mentions_unsigned(&slot_text(slots[AUTHENTICITY_SLOT]))
        {
            record.error_message = Some(UNSIGNED_HINT.to_string());
        }

        Ok(record)
    }

    /// Lenient extraction: any parse failure becomes an `ERROR` record.
    #[must_use]
    pub fn extract(&self, markup: &str, header: RecordHeader) -> ValidationRecord {
        match self.try_extract(markup, header.clone()) {
            Ok(record) => record,
            Err(error) => {
                log::warn!("Could not read results for {}: {}", header.filename, error);
                let mut record = ValidationRecord::from_error(header, &error);
                let text = Html::parse_fragment(markup)
                    .root_element()
                    .text()
                    .collect::<String>();
                if self.mentions_unsigned(&text) {
                    record.error_message = Some(format!("{UNSIGNED_HINT}; {error}"));
                }
                record
            }
        }
    }

    fn classify(&self, slot: ElementRef<'_>) -> SlotState {
        let classes: HashSet<&str> = slot
            .descendants()
            .filter_map(|node| node.value().as_element())
            .flat_map(|element| element.classes())
            .collect();

        if self.fail_markers.iter().any(|m| classes.contains(m.as_str())) {
            SlotState::Fail
        } else if self.pass_markers.iter().all(|m| classes.contains(m.as_str())) {
            SlotState::Pass
        } else if self.pass_markers.iter().any(|m| classes.contains(m.as_str())) {
            // Partial pass marker: rendered but ambiguous
            SlotState::Fail
        } else {
            SlotState::Pending
        }
    }

    fn mentions_unsigned(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.unsigned_phrases.iter().any(|p| text.contains(p.as_str()))
    }
}

fn slot_text(slot: ElementRef<'_>) -> String {
    slot.text().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn slot(pass: bool, label: &str) -> String {
        let icon = if pass {
            "fa fa-check text-success"
        } else {
            "fa fa-close text-danger"
        };
        format!(r#"<div class="d-inline-block"><i class="{icon}"></i> {label}</div>"#)
    }

    fn container(flags: [bool; 8]) -> String {
        let labels = [
            "Extensão",
            "Senha",
            "Tamanho",
            "Página",
            "Assinado",
            "Autenticidade",
            "Pesquisável",
            "Conforme",
        ];
        let body: String = flags
            .iter()
            .zip(labels)
            .map(|(pass, label)| slot(*pass, label))
            .collect();
        format!(r#"<div id="validacoes-arquivo">{body}</div>"#)
    }

    fn header() -> RecordHeader {
        RecordHeader {
            filename: "fixture.pdf".to_string(),
            size_bytes: 2048,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn extractor() -> ResultExtractor {
        ResultExtractor::new(&MarkerConfig::default()).unwrap()
    }

    #[test]
    fn all_pass_is_validated() {
        let record = extractor().extract(&container([true; 8]), header());
        assert!(record.is_validated());
        assert_eq!(record.score, 100);
        assert_eq!(record.error_message, None);
    }

    #[test]
    fn one_failed_slot_is_not_validated() {
        let mut flags = [true; 8];
        flags[6] = false;
        let record = extractor().extract(&container(flags), header());
        assert!(!record.is_validated());
        assert!(!record.searchable);
        assert_eq!(record.score, 85);
    }

    #[test]
    fn rendered_verdict_is_ignored() {
        let mut flags = [true; 8];
        flags[7] = false;
        let record = extractor().extract(&container(flags), header());
        assert!(record.is_validated());
    }

    #[test]
    fn slot_without_markers_fails_closed() {
        let mut markup = container([true; 8]);
        markup = markup.replacen("fa fa-check text-success", "spinner", 1);
        let ex = extractor();
        assert!(!ex.markers_present(&markup));
        let record = ex.extract(&markup, header());
        assert!(!record.extension_valid);
        assert!(!record.is_validated());
    }

    #[test]
    fn partial_pass_marker_counts_as_fail() {
        let markup = container([true; 8]).replacen("fa fa-check text-success", "fa fa-check", 1);
        let states = extractor().slot_states(&markup);
        assert_eq!(states[0], SlotState::Fail);
    }

    #[test]
    fn unsigned_phrase_sets_hint() {
        let mut flags = [true; 8];
        flags[4] = false;
        flags[5] = false;
        let markup = container(flags).replace("Autenticidade", "Documento não assinado");
        let record = extractor().extract(&markup, header());
        assert!(!record.signed);
        assert_eq!(record.signature_count, 0);
        assert_eq!(record.error_message.as_deref(), Some(UNSIGNED_HINT));
    }

    #[test]
    fn too_few_slots_is_parse_failure() {
        let markup = r#"<div id="validacoes-arquivo"><div class="d-inline-block"></div></div>"#;
        let ex = extractor();
        assert!(matches!(
            ex.try_extract(markup, header()),
            Err(ValidationError::ParseFailure(_))
        ));
        let record = ex.extract(markup, header());
        assert_eq!(
            record.final_verdict,
            crate::domain::validation::FinalVerdict::Error
        );
    }

    #[test]
    fn extraction_is_deterministic() {
        let mut one_fail = [true; 8];
        one_fail[2] = false;
        let pending = container([true; 8]).replace("fa fa-check text-success", "fa fa-spinner");
        let ex = extractor();
        for markup in [container([true; 8]), container(one_fail), pending] {
            let first = ex.extract(&markup, header());
            for _ in 0..3 {
                assert_eq!(ex.extract(&markup, header()), first);
            }
            assert_eq!(extractor().extract(&markup, header()), first);
        }
    }

    #[test]
    fn invalid_selector_is_rejected() {
        let markers = MarkerConfig {
            slot_selector: "div[".to_string(),
            ..MarkerConfig::default()
        };
        assert!(ResultExtractor::new(&markers).is_err());
    }
}
