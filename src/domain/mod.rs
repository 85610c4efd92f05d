//! Core data types

pub mod config;
pub mod position;

pub use config::{Configuration, SignatureConfig};
pub use position::{parse_position, Point, PositionSpec, Rectangle};

/// MIME type handed to the document engine for input files.
pub const PDF_MIME_TYPE: &str = "application/pdf";
