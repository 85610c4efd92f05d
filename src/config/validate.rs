//! Validation of a resolved configuration before signing.

use std::fs::File;
use std::path::Path;

use crate::domain::{Configuration, PDF_MIME_TYPE};
use crate::engine::DocumentEngine;
use crate::error::SignError;

/// Check the configuration in a fixed order, stopping at the first failure:
/// input exists, input is a PDF, certificate exists, image (if any) exists.
pub fn validate<E: DocumentEngine>(config: &Configuration, engine: &E) -> Result<(), SignError> {
    let input = require_file("input", config.input.as_deref())?;

    if !engine.probe(Path::new(input), PDF_MIME_TYPE) {
        return Err(SignError::NotExpectedFileType { field: "input", path: input.to_string() });
    }

    require_file("cert", config.cert.as_deref())?;

    if config.img.is_some() {
        require_file("img", config.img.as_deref())?;
    }

    Ok(())
}

fn require_file<'a>(field: &'static str, value: Option<&'a str>) -> Result<&'a str, SignError> {
    let path = value.ok_or(SignError::MissingArgument { field })?;
    if !file_exists(Path::new(path)) {
        return Err(SignError::FileNotFound { field, path: path.to_string() });
    }
    Ok(path)
}

/// A path "exists" when it can be opened for reading as a regular file.
pub fn file_exists(path: &Path) -> bool {
    File::open(path).and_then(|f| f.metadata()).map(|m| m.is_file()).unwrap_or(false)
}
