pub mod a3;
pub mod certificate;
pub mod constants;
pub mod crypto;
pub mod der; // minimal DER writer for CMS assembly
pub mod signing;
pub mod validation;
