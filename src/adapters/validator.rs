//! Seams between the validation workflow and the outside world.
//!
//! `RemoteSignatureValidator` is what callers depend on. The browser-driven
//! implementation is built from an `AutomationSession` per document, opened
//! through a `SessionFactory`, so a different transport (or a scripted fake)
//! can be substituted without touching callers.

use crate::domain::validation::{DocumentInput, ValidationRecord};
use crate::infra::error::ValidationResult;
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Something that can judge a document's signature.
#[async_trait]
pub trait RemoteSignatureValidator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Validate one document. Implementations must stop waiting promptly once
    /// `cancel` fires.
    async fn validate(
        &self,
        document: &DocumentInput,
        cancel: &CancellationToken,
    ) -> ValidationResult<ValidationRecord>;
}

/// One exclusively owned browser session.
#[async_trait]
pub trait AutomationSession: Send {
    async fn navigate(&mut self, url: &str) -> ValidationResult<()>;

    /// Submit `file` through the native file input matched by `input_selector`.
    async fn upload(&mut self, input_selector: &str, file: &Path) -> ValidationResult<()>;

    /// Markup of the results container, or `None` if it is not in the page.
    async fn results_markup(&mut self, container_selector: &str)
        -> ValidationResult<Option<String>>;

    /// End the session. Called exactly once.
    async fn close(self: Box<Self>) -> ValidationResult<()>;
}

/// Opens a fresh session for each document. Sessions are never reused.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open_session(&self) -> ValidationResult<Box<dyn AutomationSession>>;
}
