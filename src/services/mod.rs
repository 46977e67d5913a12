//! Service layer module root.
//! Contains extraction, certificate, CMS and PDF signing services.

pub mod a3_hash;
pub mod certificate_loader;
pub mod cms_builder;
pub mod pdf_incremental;
pub mod pdf_signer;
pub mod result_extractor;
pub mod stability;
pub mod stamp;

pub use a3_hash::A3HashPreparer;
pub use certificate_loader::CertificateLoader;
pub use cms_builder::CmsBuilderService;
pub use pdf_signer::PdfSigner;
pub use result_extractor::{ResultExtractor, SlotState, UNSIGNED_HINT};
pub use stability::{
    poll_until_stable, PollOutcome, StabilityPolicy, StabilitySampler, StabilityTracker,
};
pub use stamp::{StampGeometry, StampRect};
