//! `BatchValidator` fans documents out to a `RemoteSignatureValidator` with
//! bounded concurrency.
//!
//! Every input yields exactly one record, at its input position, no matter
//! in which order the workers finish. Worker failures of any kind (error,
//! hard timeout, cancellation, panic) become `ERROR` records for that
//! document only.

use crate::adapters::validator::RemoteSignatureValidator;
use crate::domain::validation::{DocumentInput, RecordHeader, ValidationRecord};
use crate::infra::config::{BatchConfig, ValidatorConfig};
use crate::infra::error::ValidationError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct BatchValidator {
    validator: Arc<dyn RemoteSignatureValidator>,
    hard_timeout: Duration,
    max_documents: Option<usize>,
    cancel: CancellationToken,
}

enum Slot {
    Submitted(RecordHeader, JoinHandle<ValidationRecord>),
    OverCap(RecordHeader, usize),
}

impl BatchValidator {
    #[must_use]
    pub fn new(validator: Arc<dyn RemoteSignatureValidator>, hard_timeout: Duration) -> Self {
        Self {
            validator,
            hard_timeout,
            max_documents: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Build with the hard timeout and cap from configuration.
    #[must_use]
    pub fn from_config(
        validator: Arc<dyn RemoteSignatureValidator>,
        validator_config: &ValidatorConfig,
        batch_config: &BatchConfig,
    ) -> Self {
        Self::new(validator, validator_config.hard_timeout())
            .with_max_documents(batch_config.max_documents)
    }

    #[must_use]
    pub fn with_max_documents(mut self, max_documents: Option<usize>) -> Self {
        self.max_documents = max_documents;
        self
    }

    /// Use a caller-owned token; cancelling it ends every pending document
    /// with a degraded `ERROR` record.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Validate all documents, at most `max_concurrency` at a time.
    ///
    /// Returns one record per input, in input order. A concurrency of zero is
    /// treated as one.
    pub async fn validate_many(
        &self,
        documents: Vec<DocumentInput>,
        max_concurrency: usize,
    ) -> Vec<ValidationRecord> {
        let total = documents.len();
        let permits = max_concurrency.max(1);
        log::info!(
            "Validating {total} document(s) with {} (concurrency {permits})",
            self.validator.name()
        );

        let semaphore = Arc::new(Semaphore::new(permits));
        let mut slots = Vec::with_capacity(total);
        for (index, document) in documents.into_iter().enumerate() {
            let header = document.header();
            if let Some(cap) = self.max_documents.filter(|cap| index >= *cap) {
                log::warn!("Skipping {}: batch limit of {cap} reached", header.filename);
                slots.push(Slot::OverCap(header, cap));
                continue;
            }

            let worker = Worker {
                validator: Arc::clone(&self.validator),
                semaphore: Arc::clone(&semaphore),
                cancel: self.cancel.clone(),
                hard_timeout: self.hard_timeout,
            };
            slots.push(Slot::Submitted(header, tokio::spawn(worker.run(document))));
        }

        let mut records = Vec::with_capacity(total);
        for slot in slots {
            let record = match slot {
                Slot::Submitted(header, handle) => match handle.await {
                    Ok(record) => record,
                    Err(e) => {
                        log::error!("Validation worker for {} failed: {e}", header.filename);
                        ValidationRecord::failed(header, format!("validation worker failed: {e}"))
                    }
                },
                Slot::OverCap(header, cap) => ValidationRecord::failed(
                    header,
                    format!("not submitted: batch limit of {cap} documents exceeded"),
                ),
            };
            records.push(record);
        }

        let validated = records.iter().filter(|r| r.is_validated()).count();
        log::info!("Batch finished: {validated}/{total} validated");
        records
    }
}

struct Worker {
    validator: Arc<dyn RemoteSignatureValidator>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    hard_timeout: Duration,
}

impl Worker {
    async fn run(self, document: DocumentInput) -> ValidationRecord {
        let header = document.header();

        let _permit = tokio::select! {
            () = self.cancel.cancelled() => {
                return ValidationRecord::timed_out(header, "cancelled before submission");
            }
            permit = Arc::clone(&self.semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return ValidationRecord::failed(header, "worker pool closed"),
            },
        };

        let outcome = tokio::select! {
            () = self.cancel.cancelled() => {
                Err(ValidationError::Timeout("batch cancelled".to_string()))
            }
            result = tokio::time::timeout(
                self.hard_timeout,
                self.validator.validate(&document, &self.cancel),
            ) => result.unwrap_or_else(|_| {
                Err(ValidationError::Timeout(format!(
                    "hard timeout of {}s exceeded",
                    self.hard_timeout.as_secs()
                )))
            }),
        };

        match outcome {
            Ok(record) => record,
            Err(ValidationError::Timeout(reason)) => {
                log::warn!("{}: {reason}", header.filename);
                ValidationRecord::timed_out(header, &reason)
            }
            Err(error) => {
                log::warn!("{}: {error}", header.filename);
                ValidationRecord::from_error(header, &error)
            }
        }
    }
}
