//! Appearance stream for a signature widget.
//!
//! The widget is split in two halves when a graphic (signer name or image) is
//! shown: graphic on the left, text on the right. Otherwise the text uses the
//! whole rectangle. Text is set in the base-14 Helvetica font.

use encoding_rs::WINDOWS_1252;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::EngineError;
use crate::domain::SignatureConfig;

const FONT_RESOURCE: &str = "Helv";
const IMAGE_RESOURCE: &str = "Im1";
const LINE_SPACING: f64 = 1.2;
const MAX_TEXT_SIZE: f64 = 12.0;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH: f64 = 0.5;
const PADDING: f64 = 2.0;
const JPEG_QUALITY: u8 = 90;

/// Text shown next to the signature.
#[derive(Debug, Clone)]
pub struct SignerDetails<'a> {
    pub name: &'a str,
    pub distinguished_name: &'a str,
    pub date: &'a str,
    pub reason: &'a str,
    pub location: &'a str,
}

/// Add a form XObject of `width` x `height` points to `doc` and return its id.
pub fn build_appearance(
    doc: &mut Document,
    width: f64,
    height: f64,
    options: &SignatureConfig,
    details: &SignerDetails<'_>,
    image: Option<&[u8]>,
) -> Result<ObjectId, EngineError> {
    let mut operations = Vec::new();
    let mut xobjects = Dictionary::new();
    let mut has_xobjects = false;

    if options.show_logo {
        operations.extend(frame(width, height));
    }

    let prepared = image.map(prepare_image).transpose()?;
    let has_graphic = prepared.is_some() || options.show_graphic_name;
    let text_x = if has_graphic { width / 2.0 } else { 0.0 };
    let half = Area { x: 0.0, y: 0.0, width: width / 2.0, height };

    if let Some(prepared) = prepared {
        let mut stream = prepared.stream;
        if let Some(mask) = prepared.mask {
            let mask_id = doc.add_object(mask);
            stream.dict.set("SMask", mask_id);
        }
        let image_id = doc.add_object(stream);
        xobjects.set(IMAGE_RESOURCE, image_id);
        has_xobjects = true;
        operations.extend(draw_image(&half, prepared.width, prepared.height));
    } else if options.show_graphic_name {
        operations.extend(fitted_line(&half, details.name));
    }

    let lines = text_lines(options, details);
    let text_area = Area { x: text_x, y: 0.0, width: width - text_x, height };
    operations.extend(text_block(&text_area, &lines));

    let content = Content { operations }.encode()?;

    let mut resources = dictionary! {
        "Font" => dictionary! {
            FONT_RESOURCE => dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            },
        },
    };
    if has_xobjects {
        resources.set("XObject", xobjects);
    }

    let form = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => vec![real(0.0), real(0.0), real(width), real(height)],
        "Resources" => resources,
    };
    Ok(doc.add_object(Stream::new(form, content)))
}

#[derive(Debug, Clone, Copy)]
struct Area {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

fn real(value: f64) -> Object {
    Object::from(value as f32)
}

fn frame(width: f64, height: f64) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new("G", vec![real(0.8)]),
        Operation::new("w", vec![real(1.0)]),
        Operation::new(
            "re",
            vec![real(0.5), real(0.5), real((width - 1.0).max(0.0)), real((height - 1.0).max(0.0))],
        ),
        Operation::new("S", vec![]),
        Operation::new("Q", vec![]),
    ]
}

fn text_lines(options: &SignatureConfig, details: &SignerDetails<'_>) -> Vec<String> {
    let label = |label: &str, value: &str| {
        if options.show_labels {
            format!("{label}{value}")
        } else {
            value.to_string()
        }
    };

    let mut lines = Vec::new();
    if options.show_text_name {
        lines.push(label("Digitally signed by ", details.name));
    }
    if options.show_dn {
        lines.push(label("DN: ", details.distinguished_name));
    }
    if !details.reason.is_empty() {
        lines.push(label("Reason: ", details.reason));
    }
    if !details.location.is_empty() {
        lines.push(label("Location: ", details.location));
    }
    if options.show_date {
        lines.push(label("Date: ", details.date));
    }
    lines
}

/// Font size that fits `lines` into `area`.
fn font_size(area: &Area, lines: &[String]) -> f64 {
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0).max(1) as f64;
    let usable_width = (area.width - 2.0 * PADDING).max(1.0);
    let usable_height = (area.height - 2.0 * PADDING).max(1.0);
    let by_width = usable_width / (longest * GLYPH_WIDTH);
    let by_height = usable_height / (lines.len().max(1) as f64 * LINE_SPACING);
    by_width.min(by_height).min(MAX_TEXT_SIZE)
}

fn text_block(area: &Area, lines: &[String]) -> Vec<Operation> {
    if lines.is_empty() {
        return Vec::new();
    }
    let size = font_size(area, lines);
    let leading = size * LINE_SPACING;
    let top = area.y + area.height - PADDING - size;

    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![FONT_RESOURCE.into(), real(size)]),
        Operation::new("TL", vec![real(leading)]),
        Operation::new("Td", vec![real(area.x + PADDING), real(top)]),
    ];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            ops.push(Operation::new("T*", vec![]));
        }
        ops.push(Operation::new("Tj", vec![win_ansi_string(line)]));
    }
    ops.push(Operation::new("ET", vec![]));
    ops
}

/// One line scaled to fill `area`, vertically centred.
fn fitted_line(area: &Area, text: &str) -> Vec<Operation> {
    let usable_width = (area.width - 2.0 * PADDING).max(1.0);
    let usable_height = (area.height - 2.0 * PADDING).max(1.0);
    let glyphs = text.chars().count().max(1) as f64;
    let size = (usable_width / (glyphs * GLYPH_WIDTH)).min(usable_height);
    let baseline = area.y + (area.height - size) / 2.0;

    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![FONT_RESOURCE.into(), real(size)]),
        Operation::new("Td", vec![real(area.x + PADDING), real(baseline)]),
        Operation::new("Tj", vec![win_ansi_string(text)]),
        Operation::new("ET", vec![]),
    ]
}

/// `text` in WinAnsiEncoding, the encoding of the widget font.
/// Characters outside the code page become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut utf8 = [0u8; 4];
    for ch in text.chars() {
        let (bytes, _, unmappable) = WINDOWS_1252.encode(ch.encode_utf8(&mut utf8));
        if unmappable {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}

fn win_ansi_string(text: &str) -> Object {
    Object::String(win_ansi(text), StringFormat::Literal)
}

/// Dimensions and colour layout of a JPEG, read from its SOF segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegInfo {
    pub width: u16,
    pub height: u16,
    pub components: u8,
}

pub fn jpeg_info(data: &[u8]) -> Option<JpegInfo> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut i = 2;
    while i + 4 <= data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        match marker {
            0xFF => {
                i += 1;
                continue;
            }
            0x01 | 0xD0..=0xD8 => {
                i += 2;
                continue;
            }
            0xD9 | 0xDA => return None,
            _ => {}
        }

        let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            // precision, height, width, components
            let segment = data.get(i + 4..i + 2 + length)?;
            if segment.len() < 6 {
                return None;
            }
            let info = JpegInfo {
                height: u16::from_be_bytes([segment[1], segment[2]]),
                width: u16::from_be_bytes([segment[3], segment[4]]),
                components: segment[5],
            };
            return (info.width > 0 && info.height > 0).then_some(info);
        }
        i += 2 + length;
    }
    None
}

/// Image XObject for the widget, with a soft mask when the source has alpha.
struct SignatureImage {
    width: u32,
    height: u32,
    stream: Stream,
    mask: Option<Stream>,
}

/// JPEG bytes are embedded as they are. Any other format `image` can decode
/// is re-encoded as JPEG, its alpha channel kept as a DeviceGray `/SMask`.
fn prepare_image(data: &[u8]) -> Result<SignatureImage, EngineError> {
    if let Some(info) = jpeg_info(data) {
        let color_space = match info.components {
            1 => "DeviceGray",
            4 => "DeviceCMYK",
            _ => "DeviceRGB",
        };
        let (width, height) = (u32::from(info.width), u32::from(info.height));
        return Ok(SignatureImage {
            width,
            height,
            stream: jpeg_xobject(data.to_vec(), width, height, color_space),
            mask: None,
        });
    }

    let decoded = image::load_from_memory(data)?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(EngineError::Document("signature image is empty".to_string()));
    }

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode_image(&decoded.to_rgb8())?;
    let mask = decoded.color().has_alpha().then(|| alpha_mask(&decoded));
    tracing::debug!("re-encoded {}x{} signature image as JPEG", width, height);

    Ok(SignatureImage {
        width,
        height,
        stream: jpeg_xobject(jpeg, width, height, "DeviceRGB"),
        mask,
    })
}

fn jpeg_xobject(jpeg: Vec<u8>, width: u32, height: u32, color_space: &str) -> Stream {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => Object::Integer(i64::from(width)),
        "Height" => Object::Integer(i64::from(height)),
        "ColorSpace" => color_space,
        "BitsPerComponent" => Object::Integer(8),
        "Filter" => "DCTDecode",
    };
    Stream::new(dict, jpeg)
}

fn alpha_mask(image: &DynamicImage) -> Stream {
    let rgba = image.to_rgba8();
    let alpha: Vec<u8> = rgba.pixels().map(|pixel| pixel.0[3]).collect();
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => Object::Integer(i64::from(rgba.width())),
        "Height" => Object::Integer(i64::from(rgba.height())),
        "ColorSpace" => "DeviceGray",
        "BitsPerComponent" => Object::Integer(8),
    };
    Stream::new(dict, alpha)
}

/// Scale the image into `area` keeping its aspect ratio.
fn draw_image(area: &Area, width: u32, height: u32) -> Vec<Operation> {
    let usable_w = (area.width - 2.0 * PADDING).max(1.0);
    let usable_h = (area.height - 2.0 * PADDING).max(1.0);
    let scale = (usable_w / f64::from(width)).min(usable_h / f64::from(height));
    let w = f64::from(width) * scale;
    let h = f64::from(height) * scale;
    let x = area.x + (area.width - w) / 2.0;
    let y = area.y + (area.height - h) / 2.0;

    vec![
        Operation::new("q", vec![]),
        Operation::new("cm", vec![real(w), real(0.0), real(0.0), real(h), real(x), real(y)]),
        Operation::new("Do", vec![IMAGE_RESOURCE.into()]),
        Operation::new("Q", vec![]),
    ]
}
