//! Error types shared by the resolution, validation and signing stages.

use std::path::PathBuf;
use thiserror::Error;

use crate::engine::EngineError;

/// A failure at any stage of a signing run.
///
/// Every stage returns one of these as a value; only the CLI prints it and
/// picks the exit code.
#[derive(Debug, Error)]
pub enum SignError {
    #[error("{field}: missing argument")]
    MissingArgument { field: &'static str },

    #[error("{field}: {path} : No such file")]
    FileNotFound { field: &'static str, path: String },

    #[error("{field}: {path} is not a PDF file")]
    NotExpectedFileType { field: &'static str, path: String },

    #[error("{0}")]
    MalformedPosition(String),

    /// Never fatal: the resolver logs it and keeps going.
    #[error("Could not parse '{}' as JSON: {reason}", path.display())]
    ConfigFileUnreadable { path: PathBuf, reason: String },

    #[error("page {page} is out of range [0-{count})")]
    PageOutOfRange { page: i64, count: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl SignError {
    pub(crate) fn wrong_field_count(spec: &str) -> Self {
        Self::MalformedPosition(format!("where: '{spec}': wrong number of fields (5 expected)"))
    }

    pub(crate) fn unparsable_position() -> Self {
        Self::MalformedPosition("could not parse signature position".to_string())
    }
}
