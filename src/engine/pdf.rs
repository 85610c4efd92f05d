//! PDF document engine backed by `lopdf`.
//!
//! Signing happens in two steps. [`Document::sign`] attaches a `/Sig`
//! dictionary with a zero-filled `/Contents` placeholder and a dummy
//! `/ByteRange`. [`Document::save`] serializes the file, patches the real byte
//! range in place, signs everything outside the placeholder and writes the
//! hex-encoded signature into it.

use chrono::Utc;
use lopdf::{dictionary, Document as LoDocument, Object, ObjectId, StringFormat};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use super::appearance::{build_appearance, SignerDetails};
use super::{Appearance, Document, DocumentEngine, EngineError, Signer};
use crate::domain::{Rectangle, PDF_MIME_TYPE};

/// Bytes reserved for the DER-encoded signature.
pub const SIGNATURE_CAPACITY: usize = 16 * 1024;
const BYTE_RANGE_PLACEHOLDER: i64 = 9_999_999_999;
/// The header may be preceded by junk within the first kilobyte.
const HEADER_WINDOW: usize = 1024;
/// US Letter, used when no page in the tree declares a MediaBox.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];
const MAX_TREE_DEPTH: usize = 64;
/// Print | Locked
const WIDGET_FLAGS: i64 = 4 | 128;
/// SignaturesExist | AppendOnly
const SIG_FLAGS: i64 = 3;

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfEngine;

impl DocumentEngine for PdfEngine {
    type Document = PdfDocument;

    fn probe(&self, path: &Path, mime_type: &str) -> bool {
        mime_type == PDF_MIME_TYPE && has_pdf_header(path) && LoDocument::load(path).is_ok()
    }

    fn open(&self, path: &Path, mime_type: &str) -> Result<PdfDocument, EngineError> {
        if mime_type != PDF_MIME_TYPE {
            return Err(EngineError::Document(format!("unsupported document type '{mime_type}'")));
        }
        let doc = LoDocument::load(path)?;
        tracing::debug!("opened {} ({} objects)", path.display(), doc.objects.len());
        Ok(PdfDocument { doc, pending: None })
    }
}

fn has_pdf_header(path: &Path) -> bool {
    let mut head = Vec::with_capacity(HEADER_WINDOW);
    let read = File::open(path)
        .and_then(|f| f.take(HEADER_WINDOW as u64).read_to_end(&mut head))
        .is_ok();
    read && find(&head, b"%PDF-").is_some()
}

pub struct PdfDocument {
    doc: LoDocument,
    pending: Option<Box<dyn Signer>>,
}

#[derive(Debug, Clone, Copy)]
pub struct PdfPage {
    id: ObjectId,
    media_box: [f64; 4],
}

#[derive(Debug, Clone, Copy)]
pub struct SignatureField {
    id: ObjectId,
    media_box: [f64; 4],
}

impl PdfDocument {
    fn media_box(&self, page_id: ObjectId) -> [f64; 4] {
        let mut current = Some(page_id);
        for _ in 0..MAX_TREE_DEPTH {
            let Some(id) = current else { break };
            let Ok(dict) = self.doc.get_object(id).and_then(Object::as_dict) else { break };
            if let Some(media_box) = dict.get(b"MediaBox").ok().and_then(|o| self.number_array(o)) {
                return media_box;
            }
            current = dict.get(b"Parent").and_then(Object::as_reference).ok();
        }
        DEFAULT_MEDIA_BOX
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        match object {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn number_array(&self, object: &Object) -> Option<[f64; 4]> {
        let items = self.resolve(object)?.as_array().ok()?;
        if items.len() != 4 {
            return None;
        }
        let mut out = [0.0; 4];
        for (slot, item) in out.iter_mut().zip(items) {
            *slot = number(self.resolve(item)?)?;
        }
        Some(out)
    }

    fn catalog_id(&self) -> Result<ObjectId, EngineError> {
        Ok(self.doc.trailer.get(b"Root")?.as_reference()?)
    }

    fn add_annotation(&mut self, page_id: ObjectId, annot_id: ObjectId) -> Result<(), EngineError> {
        let existing = self.doc.get_object(page_id)?.as_dict()?.get(b"Annots").ok().cloned();
        match existing {
            Some(Object::Reference(array_id)) => {
                self.doc.get_object_mut(array_id)?.as_array_mut()?.push(Object::Reference(annot_id));
            }
            Some(Object::Array(mut items)) => {
                items.push(Object::Reference(annot_id));
                self.doc.get_object_mut(page_id)?.as_dict_mut()?.set("Annots", items);
            }
            _ => {
                self.doc
                    .get_object_mut(page_id)?
                    .as_dict_mut()?
                    .set("Annots", vec![Object::Reference(annot_id)]);
            }
        }
        Ok(())
    }

    /// Register `field_id` in the catalog's `/AcroForm`, creating it if needed.
    fn register_field(&mut self, field_id: ObjectId) -> Result<(), EngineError> {
        let catalog_id = self.catalog_id()?;
        let existing = self.doc.get_object(catalog_id)?.as_dict()?.get(b"AcroForm").ok().cloned();
        let form_id = match existing {
            Some(Object::Reference(id)) => id,
            Some(Object::Dictionary(dict)) => self.doc.add_object(dict),
            _ => self.doc.add_object(dictionary! { "Fields" => Vec::<Object>::new() }),
        };
        self.doc.get_object_mut(catalog_id)?.as_dict_mut()?.set("AcroForm", form_id);

        let form = self.doc.get_object_mut(form_id)?.as_dict_mut()?;
        form.set("SigFlags", Object::Integer(SIG_FLAGS));
        let fields = form.get(b"Fields").ok().cloned();
        match fields {
            Some(Object::Reference(array_id)) => {
                self.doc.get_object_mut(array_id)?.as_array_mut()?.push(Object::Reference(field_id));
            }
            Some(Object::Array(mut items)) => {
                items.push(Object::Reference(field_id));
                form.set("Fields", items);
            }
            _ => {
                form.set("Fields", vec![Object::Reference(field_id)]);
            }
        }
        Ok(())
    }

    fn field_size(&self, field: &SignatureField) -> Result<(f64, f64), EngineError> {
        let dict = self.doc.get_object(field.id)?.as_dict()?;
        let rect = dict
            .get(b"Rect")
            .ok()
            .and_then(|o| self.number_array(o))
            .ok_or_else(|| EngineError::Document("signature field has no /Rect".to_string()))?;
        Ok(((rect[2] - rect[0]).abs(), (rect[3] - rect[1]).abs()))
    }
}

impl Document for PdfDocument {
    type Page = PdfPage;
    type Field = SignatureField;

    fn count_pages(&self) -> Result<usize, EngineError> {
        Ok(self.doc.get_pages().len())
    }

    fn load_page(&mut self, index: usize) -> Result<PdfPage, EngineError> {
        let id = self
            .doc
            .get_pages()
            .values()
            .nth(index)
            .copied()
            .ok_or_else(|| EngineError::Document(format!("no page at index {index}")))?;
        Ok(PdfPage { id, media_box: self.media_box(id) })
    }

    fn create_signature_field(
        &mut self,
        page: &PdfPage,
        name: &str,
    ) -> Result<SignatureField, EngineError> {
        let zero = || Object::Integer(0);
        let field_id = self.doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Sig",
            "T" => Object::string_literal(name),
            "F" => Object::Integer(WIDGET_FLAGS),
            "P" => page.id,
            "Rect" => vec![zero(), zero(), zero(), zero()],
        });
        self.add_annotation(page.id, field_id)?;
        self.register_field(field_id)?;
        tracing::debug!("created signature field '{}' as object {:?}", name, field_id);
        Ok(SignatureField { id: field_id, media_box: page.media_box })
    }

    fn set_rect(&mut self, field: &SignatureField, rect: &Rectangle) -> Result<(), EngineError> {
        let user_space = to_user_space(rect, &field.media_box);
        let rect_object: Vec<Object> = user_space.iter().map(|v| Object::from(*v as f32)).collect();
        self.doc.get_object_mut(field.id)?.as_dict_mut()?.set("Rect", rect_object);
        Ok(())
    }

    fn sign(
        &mut self,
        field: &SignatureField,
        signer: Box<dyn Signer>,
        appearance: &Appearance<'_>,
    ) -> Result<(), EngineError> {
        if self.pending.is_some() {
            return Err(EngineError::Document(
                "only one signature can be applied per save".to_string(),
            ));
        }

        let name = signer.common_name();
        let distinguished_name = signer.distinguished_name();
        let now = Utc::now();
        let display_date = now.format("%Y.%m.%d %H:%M:%S %:z").to_string();

        let (width, height) = self.field_size(field)?;
        let details = SignerDetails {
            name: &name,
            distinguished_name: &distinguished_name,
            date: &display_date,
            reason: appearance.reason,
            location: appearance.location,
        };
        let ap_id = build_appearance(
            &mut self.doc,
            width,
            height,
            appearance.options,
            &details,
            appearance.image,
        )?;

        let placeholder = Object::Integer(BYTE_RANGE_PLACEHOLDER);
        let sig_id = self.doc.add_object(dictionary! {
            "Type" => "Sig",
            "Filter" => "Adobe.PPKLite",
            "SubFilter" => "adbe.pkcs7.detached",
            "ByteRange" => vec![
                Object::Integer(0),
                placeholder.clone(),
                placeholder.clone(),
                placeholder,
            ],
            "Contents" => Object::String(vec![0u8; SIGNATURE_CAPACITY], StringFormat::Hexadecimal),
            "M" => Object::string_literal(now.format("D:%Y%m%d%H%M%S+00'00'").to_string()),
            "Name" => Object::string_literal(name.as_str()),
            "Reason" => Object::string_literal(appearance.reason),
            "Location" => Object::string_literal(appearance.location),
        });

        let widget = self.doc.get_object_mut(field.id)?.as_dict_mut()?;
        widget.set("V", sig_id);
        widget.set("AP", dictionary! { "N" => ap_id });

        self.pending = Some(signer);
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<(), EngineError> {
        let mut buffer = Vec::new();
        self.doc.save_to(&mut buffer)?;

        if let Some(signer) = self.pending.take() {
            embed_signature(&mut buffer, signer.as_ref())?;
        }

        fs::write(path, &buffer)?;
        tracing::debug!("wrote {} bytes to {}", buffer.len(), path.display());
        Ok(())
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// Top-left-origin page rectangle to PDF user space `[llx lly urx ury]`.
pub fn to_user_space(rect: &Rectangle, media_box: &[f64; 4]) -> [f64; 4] {
    let left = media_box[0].min(media_box[2]);
    let top = media_box[1].max(media_box[3]);
    let xs = [left + rect.top_left.x, left + rect.bottom_right.x];
    let ys = [top - rect.top_left.y, top - rect.bottom_right.y];
    [xs[0].min(xs[1]), ys[0].min(ys[1]), xs[0].max(xs[1]), ys[0].max(ys[1])]
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Locate the `[` and `]` of the `/ByteRange` that belongs to the same object
/// as the contents placeholder at `start..end`.
fn find_byte_range(buffer: &[u8], start: usize, end: usize) -> Option<(usize, usize)> {
    let key = b"/ByteRange";
    let before = rfind(&buffer[..start], key).filter(|&at| find(&buffer[at..start], b"endobj").is_none());
    let at = match before {
        Some(at) => at,
        None => {
            let object_end = find(&buffer[end..], b"endobj").map_or(buffer.len(), |o| end + o);
            end + find(&buffer[end..object_end], key)?
        }
    };
    let open = at + find(&buffer[at..], b"[")?;
    let close = open + find(&buffer[open..], b"]")?;
    Some((open, close))
}

/// Patch `/ByteRange` and `/Contents` of the pending signature in `buffer`.
pub(crate) fn embed_signature(buffer: &mut [u8], signer: &dyn Signer) -> Result<(), EngineError> {
    let mut needle = Vec::with_capacity(SIGNATURE_CAPACITY * 2 + 2);
    needle.push(b'<');
    needle.resize(SIGNATURE_CAPACITY * 2 + 1, b'0');
    needle.push(b'>');

    let missing = || EngineError::Document("signature placeholder not found in output".to_string());
    let start = rfind(buffer, &needle).ok_or_else(missing)?;
    let end = start + needle.len();
    let (open, close) = find_byte_range(buffer, start, end).ok_or_else(missing)?;

    let ranges = format!("0 {} {} {}", start, end, buffer.len() - end);
    let slot = &mut buffer[open + 1..close];
    if ranges.len() > slot.len() {
        return Err(EngineError::Document("byte range does not fit its placeholder".to_string()));
    }
    slot.fill(b' ');
    slot[..ranges.len()].copy_from_slice(ranges.as_bytes());

    let mut signed = Vec::with_capacity(buffer.len() - needle.len());
    signed.extend_from_slice(&buffer[..start]);
    signed.extend_from_slice(&buffer[end..]);
    let der = signer.sign_detached(&signed)?;
    if der.len() > SIGNATURE_CAPACITY {
        return Err(EngineError::Document(format!(
            "signature is {} bytes; only {} reserved",
            der.len(),
            SIGNATURE_CAPACITY
        )));
    }

    let encoded = hex::encode_upper(&der);
    buffer[start + 1..start + 1 + encoded.len()].copy_from_slice(encoded.as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Point, SignatureConfig};
    use lopdf::{Dictionary, Stream};
    use tempfile::TempDir;

    const FAKE_DER: &[u8] = &[0x30, 0x03, 0x02, 0x01, 0x05];

    struct FixedSigner;

    impl Signer for FixedSigner {
        fn common_name(&self) -> String {
            "Test Signer".to_string()
        }
        fn distinguished_name(&self) -> String {
            "CN=Test Signer".to_string()
        }
        fn sign_detached(&self, data: &[u8]) -> Result<Vec<u8>, EngineError> {
            assert!(!data.is_empty());
            Ok(FAKE_DER.to_vec())
        }
    }

    fn sample_pdf(path: &Path, pages: usize) {
        let mut doc = LoDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for _ in 0..pages {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), b"".to_vec()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(pages as i64),
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ],
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).expect("save sample pdf");
    }

    fn rect(x1: f64, y1: f64, x2: f64, y2: f64) -> Rectangle {
        Rectangle { top_left: Point { x: x1, y: y1 }, bottom_right: Point { x: x2, y: y2 } }
    }

    #[test]
    fn probe_accepts_pdf_and_rejects_text() {
        let tmp = TempDir::new().expect("tmp");
        let pdf = tmp.path().join("doc.pdf");
        let txt = tmp.path().join("doc.txt");
        sample_pdf(&pdf, 1);
        fs::write(&txt, "hello").expect("write");

        assert!(PdfEngine.probe(&pdf, PDF_MIME_TYPE));
        assert!(!PdfEngine.probe(&txt, PDF_MIME_TYPE));
        assert!(!PdfEngine.probe(&pdf, "image/png"));
        assert!(!PdfEngine.probe(&tmp.path().join("missing.pdf"), PDF_MIME_TYPE));
    }

    #[test]
    fn counts_and_loads_pages_with_inherited_media_box() {
        let tmp = TempDir::new().expect("tmp");
        let pdf = tmp.path().join("doc.pdf");
        sample_pdf(&pdf, 3);

        let mut doc = PdfEngine.open(&pdf, PDF_MIME_TYPE).expect("open");
        assert_eq!(doc.count_pages().expect("count"), 3);
        let page = doc.load_page(2).expect("page");
        assert_eq!(page.media_box, [0.0, 0.0, 595.0, 842.0]);
        assert!(doc.load_page(3).is_err());
    }

    #[test]
    fn converts_top_left_rectangles_to_user_space() {
        let converted = to_user_space(&rect(10.0, 20.0, 110.0, 70.0), &[0.0, 0.0, 595.0, 842.0]);
        assert_eq!(converted, [10.0, 772.0, 110.0, 822.0]);
    }

    #[test]
    fn field_is_registered_on_page_and_form() {
        let tmp = TempDir::new().expect("tmp");
        let pdf = tmp.path().join("doc.pdf");
        let out = tmp.path().join("out.pdf");
        sample_pdf(&pdf, 1);

        let mut doc = PdfEngine.open(&pdf, PDF_MIME_TYPE).expect("open");
        let page = doc.load_page(0).expect("page");
        let field = doc.create_signature_field(&page, "approval").expect("field");
        doc.set_rect(&field, &rect(0.0, 0.0, 100.0, 200.0)).expect("rect");
        doc.save(&out).expect("save");

        let saved = LoDocument::load(&out).expect("reload");
        let page_id = *saved.get_pages().values().next().expect("page");
        let annots = saved.get_dictionary(page_id).expect("page").get(b"Annots").expect("annots");
        assert_eq!(annots.as_array().expect("array").len(), 1);

        let catalog_id = saved.trailer.get(b"Root").and_then(Object::as_reference).expect("root");
        let catalog = saved.get_dictionary(catalog_id).expect("catalog");
        let form_id = catalog.get(b"AcroForm").and_then(Object::as_reference).expect("form");
        let form = saved.get_dictionary(form_id).expect("form dict");
        assert_eq!(form.get(b"SigFlags").and_then(Object::as_i64).expect("flags"), SIG_FLAGS);
        let fields = form.get(b"Fields").and_then(Object::as_array).expect("fields");
        let field_id = fields[0].as_reference().expect("ref");
        let widget = saved.get_dictionary(field_id).expect("widget");
        assert_eq!(widget.get(b"FT").and_then(Object::as_name).expect("ft"), b"Sig".as_slice());
        let rect_values: Vec<f64> = widget
            .get(b"Rect")
            .and_then(Object::as_array)
            .expect("rect")
            .iter()
            .filter_map(number)
            .collect();
        assert_eq!(rect_values, vec![0.0, 642.0, 100.0, 842.0]);
    }

    #[test]
    fn signed_save_patches_byte_range_and_contents() {
        let tmp = TempDir::new().expect("tmp");
        let pdf = tmp.path().join("doc.pdf");
        let out = tmp.path().join("signed.pdf");
        sample_pdf(&pdf, 1);

        let mut doc = PdfEngine.open(&pdf, PDF_MIME_TYPE).expect("open");
        let page = doc.load_page(0).expect("page");
        let field = doc.create_signature_field(&page, "signature").expect("field");
        doc.set_rect(&field, &rect(0.0, 0.0, 200.0, 60.0)).expect("rect");
        let options = SignatureConfig { show_text_name: true, ..SignatureConfig::default() };
        let appearance =
            Appearance { options: &options, image: None, reason: "Approved", location: "Lab" };
        doc.sign(&field, Box::new(FixedSigner), &appearance).expect("sign");
        doc.save(&out).expect("save");

        let bytes = fs::read(&out).expect("read output");
        let saved = LoDocument::load(&out).expect("reload signed output");

        let widget = saved.get_dictionary(field.id).expect("widget");
        let sig_id = widget.get(b"V").and_then(Object::as_reference).expect("sig ref");
        let sig = saved.get_dictionary(sig_id).expect("sig");
        let range: Vec<i64> = sig
            .get(b"ByteRange")
            .and_then(Object::as_array)
            .expect("range")
            .iter()
            .map(|o| o.as_i64().expect("int"))
            .collect();

        assert_eq!(range.len(), 4);
        assert_eq!(range[0], 0);
        let (gap_start, gap_end) = (range[1] as usize, range[2] as usize);
        assert_eq!(gap_end + range[3] as usize, bytes.len());
        assert_eq!(bytes[gap_start], b'<');
        assert_eq!(bytes[gap_end - 1], b'>');
        assert!(bytes[gap_start + 1..].starts_with(b"3003020105"));
        assert!(widget.has(b"AP"));
    }

    #[test]
    fn second_signature_before_save_is_rejected() {
        let tmp = TempDir::new().expect("tmp");
        let pdf = tmp.path().join("doc.pdf");
        sample_pdf(&pdf, 1);

        let mut doc = PdfEngine.open(&pdf, PDF_MIME_TYPE).expect("open");
        let page = doc.load_page(0).expect("page");
        let field = doc.create_signature_field(&page, "signature").expect("field");
        doc.set_rect(&field, &rect(0.0, 0.0, 50.0, 50.0)).expect("rect");
        let options = SignatureConfig::default();
        let appearance = Appearance { options: &options, image: None, reason: "", location: "" };

        doc.sign(&field, Box::new(FixedSigner), &appearance).expect("first");
        assert!(doc.sign(&field, Box::new(FixedSigner), &appearance).is_err());
    }
}
