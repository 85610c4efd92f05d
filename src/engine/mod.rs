//! Document and signing engines
//!
//! The signing run talks to documents and certificates only through these
//! traits. [`pdf::PdfEngine`] and [`pkcs12::Pkcs12Engine`] are the
//! implementations used by the binary.

use std::path::Path;
use thiserror::Error;

use crate::domain::{Rectangle, SignatureConfig};

pub mod appearance;
pub mod pdf;
pub mod pkcs12;

pub use pdf::PdfEngine;
pub use pkcs12::Pkcs12Engine;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("certificate error: {0}")]
    Crypto(#[from] openssl::error::ErrorStack),

    #[error("signature image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Document(String),
}

/// Opens documents of a given MIME type.
pub trait DocumentEngine {
    type Document: Document;

    /// Whether `path` is a readable document of `mime_type`. Never fails.
    fn probe(&self, path: &Path, mime_type: &str) -> bool;

    fn open(&self, path: &Path, mime_type: &str) -> Result<Self::Document, EngineError>;
}

/// An open document that can carry signature fields.
pub trait Document {
    type Page;
    type Field;

    fn count_pages(&self) -> Result<usize, EngineError>;

    fn load_page(&mut self, index: usize) -> Result<Self::Page, EngineError>;

    fn create_signature_field(
        &mut self,
        page: &Self::Page,
        name: &str,
    ) -> Result<Self::Field, EngineError>;

    fn set_rect(&mut self, field: &Self::Field, rect: &Rectangle) -> Result<(), EngineError>;

    /// Attach a signature to `field`. The signature value itself may only be
    /// computed when the document is saved.
    fn sign(
        &mut self,
        field: &Self::Field,
        signer: Box<dyn Signer>,
        appearance: &Appearance<'_>,
    ) -> Result<(), EngineError>;

    fn save(&mut self, path: &Path) -> Result<(), EngineError>;
}

/// Builds signers from certificate files.
pub trait SigningEngine {
    fn create_signer(&self, cert: &Path, password: &str) -> Result<Box<dyn Signer>, EngineError>;
}

pub trait Signer {
    /// Signer name shown in the widget.
    fn common_name(&self) -> String;

    fn distinguished_name(&self) -> String;

    /// Detached signature (DER) over `data`.
    fn sign_detached(&self, data: &[u8]) -> Result<Vec<u8>, EngineError>;
}

/// Visual options and metadata for one signature.
#[derive(Debug, Clone, Copy)]
pub struct Appearance<'a> {
    pub options: &'a SignatureConfig,
    pub image: Option<&'a [u8]>,
    pub reason: &'a str,
    pub location: &'a str,
}
