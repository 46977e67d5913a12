//! Browser-driven `RemoteSignatureValidator`.
//!
//! Per document: stage the bytes in a private temp directory, open a fresh
//! session, upload through the page's file input, then poll the results
//! container until a marker-bearing read is repeated unchanged twice. If the page
//! never settles, one grace read is taken and the record is flagged as
//! degraded. The session is closed on every exit path.

use crate::adapters::validator::{AutomationSession, RemoteSignatureValidator, SessionFactory};
use crate::domain::validation::{DocumentInput, RecordHeader, ValidationRecord};
use crate::infra::config::{MarkerConfig, ValidatorConfig};
use crate::infra::error::{ValidationError, ValidationResult};
use crate::services::result_extractor::ResultExtractor;
use crate::services::stability::{
    poll_until_stable, PollOutcome, StabilityPolicy, StabilitySampler,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const FALLBACK_UPLOAD_NAME: &str = "document.pdf";

pub struct BrowserSignatureValidator<F> {
    factory: F,
    config: ValidatorConfig,
    markers: MarkerConfig,
    extractor: ResultExtractor,
}

impl<F: SessionFactory> BrowserSignatureValidator<F> {
    pub fn new(
        factory: F,
        config: ValidatorConfig,
        markers: MarkerConfig,
    ) -> ValidationResult<Self> {
        let extractor = ResultExtractor::new(&markers)?;
        Ok(Self {
            factory,
            config,
            markers,
            extractor,
        })
    }

    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Consume the validator, returning the factory (e.g. to shut it down).
    pub fn into_factory(self) -> F {
        self.factory
    }

    fn stability_policy(&self) -> StabilityPolicy {
        StabilityPolicy::new(
            self.config.poll_interval(),
            self.config.stable_samples,
            self.config.max_wait(),
        )
    }

    async fn drive(
        &self,
        session: &mut Box<dyn AutomationSession>,
        header: RecordHeader,
        upload: &Path,
        cancel: &CancellationToken,
    ) -> ValidationResult<ValidationRecord> {
        session.navigate(&self.config.validation_url).await?;
        session
            .upload(&self.markers.file_input_selector, upload)
            .await?;

        let mut sampler = MarkupSampler {
            session,
            container: &self.markers.results_container_selector,
            extractor: &self.extractor,
        };
        match poll_until_stable(&mut sampler, &self.stability_policy(), cancel).await {
            PollOutcome::Stable(markup) => Ok(self.extractor.extract(&markup, header)),
            PollOutcome::Cancelled => Err(ValidationError::Timeout(
                "cancelled while waiting for results".to_string(),
            )),
            PollOutcome::TimedOut { last } => {
                tokio::select! {
                    () = cancel.cancelled() => {
                        return Err(ValidationError::Timeout(
                            "cancelled during grace delay".to_string(),
                        ));
                    }
                    () = tokio::time::sleep(self.config.grace_delay()) => {}
                }

                let grace = sampler.read_container().await;
                let markup = grace.or(last).ok_or_else(|| {
                    ValidationError::Timeout(format!(
                        "results container never appeared within {}s",
                        self.config.max_wait_secs
                    ))
                })?;
                log::warn!(
                    "Results for {} did not stabilize; using grace read",
                    header.filename
                );
                let mut record = self.extractor.extract(&markup, header);
                record.mark_degraded(&format!(
                    "results did not stabilize within {}s",
                    self.config.max_wait_secs
                ));
                Ok(record)
            }
        }
    }
}

#[async_trait]
impl<F: SessionFactory> RemoteSignatureValidator for BrowserSignatureValidator<F> {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn validate(
        &self,
        document: &DocumentInput,
        cancel: &CancellationToken,
    ) -> ValidationResult<ValidationRecord> {
        let header = document.header();
        log::info!(
            "Validating {} ({} bytes)",
            header.filename,
            header.size_bytes
        );

        let staged = StagedUpload::write(document)?;
        let mut guard = SessionGuard::new(self.factory.open_session().await?);
        let result = self
            .drive(guard.session()?, header, staged.path(), cancel)
            .await;
        guard.release().await;

        if let Ok(record) = &result {
            log::info!(
                "{}: {} (score {})",
                record.filename,
                record.final_verdict,
                record.score
            );
        }
        result
    }
}

/// Reads the results container and reports it only once all markers show.
struct MarkupSampler<'a> {
    session: &'a mut Box<dyn AutomationSession>,
    container: &'a str,
    extractor: &'a ResultExtractor,
}

impl MarkupSampler<'_> {
    async fn read_container(&mut self) -> Option<String> {
        match self.session.results_markup(self.container).await {
            Ok(markup) => markup,
            Err(e) => {
                log::warn!("Reading results container failed: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl<'a> StabilitySampler for MarkupSampler<'a> {
    type Output = String;

    async fn sample(&mut self) -> Option<String> {
        let markup = self.read_container().await?;
        self.extractor.markers_present(&markup).then_some(markup)
    }
}

/// Closes the session when released, or in the background if dropped early
/// (timeout or cancellation of the owning future).
struct SessionGuard {
    session: Option<Box<dyn AutomationSession>>,
}

impl SessionGuard {
    fn new(session: Box<dyn AutomationSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    fn session(&mut self) -> ValidationResult<&mut Box<dyn AutomationSession>> {
        self.session.as_mut().ok_or_else(|| {
            ValidationError::AutomationFailure("session already released".to_string())
        })
    }

    async fn release(mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.close().await {
                log::warn!("Failed to close automation session: {e}");
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                log::debug!("Closing abandoned automation session");
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        log::warn!("Failed to close abandoned session: {e}");
                    }
                });
            }
            Err(_) => log::warn!("No runtime available to close automation session"),
        }
    }
}

/// The document written under its own (sanitized) name in a private temp
/// directory, removed on drop.
struct StagedUpload {
    _dir: TempDir,
    path: PathBuf,
}

impl StagedUpload {
    fn write(document: &DocumentInput) -> ValidationResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("pdf-trust-upload-")
            .tempdir()
            .map_err(|e| {
                ValidationError::AutomationFailure(format!(
                    "Failed to create upload directory: {e}"
                ))
            })?;
        let path = dir.path().join(sanitize_filename(&document.filename));
        std::fs::write(&path, &document.bytes).map_err(|e| {
            ValidationError::AutomationFailure(format!("Failed to stage upload: {e}"))
        })?;
        Ok(Self { _dir: dir, path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// Keep the last path component with a conservative character set.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_UPLOAD_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}
