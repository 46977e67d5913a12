//! Workflow pipelines orchestrating stateless services.

pub mod batch;
pub mod sign;

pub use batch::BatchValidator;
pub use sign::{sign_pdf_file, SignOptions, SignOutcome, SignWorkflow};
