//! docsign: sign PDF documents with a PKCS#12 certificate
//!
//! Run options come from three layers: built-in defaults, an optional JSON
//! config file and command-line options. The resolved configuration is
//! validated, then a visible signature field is placed on the requested page
//! and signed.

pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod redact;
pub mod sign;

pub use domain::{Configuration, PositionSpec, SignatureConfig};
pub use error::SignError;
pub use sign::sign_document;
