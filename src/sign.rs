//! Signing run over a validated configuration.

use std::fs;
use std::path::Path;

use crate::domain::{parse_position, Configuration, PDF_MIME_TYPE};
use crate::engine::{Appearance, Document, DocumentEngine, SigningEngine};
use crate::error::SignError;

/// Place and sign the signature field, then save the result to `output`.
///
/// Expects a configuration that already passed
/// [`validate`](crate::config::validate); missing `input`/`cert` are still
/// reported rather than assumed.
pub fn sign_document<E, S>(config: &Configuration, documents: &E, signing: &S) -> Result<(), SignError>
where
    E: DocumentEngine,
    S: SigningEngine,
{
    let position = parse_position(&config.where_)?;
    let input = config.input.as_deref().ok_or(SignError::MissingArgument { field: "input" })?;
    let cert = config.cert.as_deref().ok_or(SignError::MissingArgument { field: "cert" })?;

    let mut doc = documents.open(Path::new(input), PDF_MIME_TYPE)?;
    let page_count = doc.count_pages()?;
    let page_index = match usize::try_from(position.page) {
        Ok(index) if index < page_count => index,
        _ => return Err(SignError::PageOutOfRange { page: position.page, count: page_count }),
    };

    tracing::info!(
        "Signing page {} (index {}) of {}",
        page_index + 1,
        page_index,
        page_count
    );
    let rect = position.rect;
    tracing::info!(
        "Signing in rectangle: ({}, {}), ({}, {})",
        rect.top_left.x,
        rect.top_left.y,
        rect.bottom_right.x,
        rect.bottom_right.y
    );

    let page = doc.load_page(page_index)?;
    let field = doc.create_signature_field(&page, &config.signature_name)?;
    doc.set_rect(&field, &rect)?;

    let signer = signing.create_signer(Path::new(cert), config.pass.as_deref().unwrap_or(""))?;

    let image = match config.img.as_deref() {
        Some(img) => Some(fs::read(img).map_err(|_| SignError::FileNotFound {
            field: "img",
            path: img.to_string(),
        })?),
        None => None,
    };

    let appearance = Appearance {
        options: &config.signature_config,
        image: image.as_deref(),
        reason: &config.reason,
        location: &config.location,
    };
    doc.sign(&field, signer, &appearance)?;
    doc.save(Path::new(&config.output))?;

    tracing::info!("Signed document written to {}", config.output);
    Ok(())
}
