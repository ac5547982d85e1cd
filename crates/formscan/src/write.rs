//! Blueprint consumers backed by lopdf: widget creation, filling and listing.
//!
//! Blueprint coordinates are normalised with a top-left origin; PDF user
//! space has a bottom-left origin relative to the page's MediaBox, so every
//! rectangle is denormalised with the page's own width and height and then
//! flipped.

use std::collections::BTreeMap;

use formscan_core::{BBox, Blueprint, FormField, PageSize};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat, dictionary};
use thiserror::Error;
use tracing::{debug, warn};

/// Default appearance for created text widgets: auto-sized Helvetica, black.
const DEFAULT_APPEARANCE: &str = "/Helv 0 Tf 0 g";
/// Annotation flag bit 3 (Print).
const ANNOT_FLAG_PRINT: i64 = 4;
/// Guard against cyclic /Parent or /Kids chains.
const MAX_TREE_DEPTH: usize = 64;

/// Errors from reading or writing PDF forms.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The PDF could not be parsed or a required object is malformed.
    #[error("PDF parse error: {0}")]
    Parse(String),
    /// Serialising the output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A blueprint field targets a page the document does not have.
    #[error("page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },
    /// A page listed in the page tree could not be resolved.
    #[error("page {0} is missing from the document")]
    MissingPage(u32),
    /// The blueprint cannot be materialised.
    #[error("invalid blueprint: {0}")]
    InvalidBlueprint(String),
}

fn parse_err(e: lopdf::Error) -> WriteError {
    WriteError::Parse(e.to_string())
}

/// A page's object id and MediaBox.
#[derive(Debug, Clone, Copy)]
struct PageBox {
    id: ObjectId,
    origin_x: f64,
    origin_y: f64,
    size: PageSize,
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// MediaBox of a page, inherited through /Parent when absent.
fn media_box(doc: &Document, page_id: ObjectId) -> Option<[f64; 4]> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(obj) = current.get(b"MediaBox") {
            let arr = resolve(doc, obj).as_array().ok()?;
            if arr.len() != 4 {
                return None;
            }
            let mut out = [0.0; 4];
            for (slot, v) in out.iter_mut().zip(arr) {
                *slot = number(resolve(doc, v))?;
            }
            return Some(out);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn page_table(doc: &Document) -> Result<Vec<PageBox>, WriteError> {
    doc.get_pages()
        .into_iter()
        .map(|(number, id)| {
            let [x0, y0, x1, y1] = media_box(doc, id).ok_or(WriteError::MissingPage(number))?;
            Ok(PageBox {
                id,
                origin_x: x0.min(x1),
                origin_y: y0.min(y1),
                size: PageSize::new((x1 - x0).abs(), (y1 - y0).abs()),
            })
        })
        .collect()
}

fn save(doc: &mut Document) -> Result<Vec<u8>, WriteError> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| WriteError::Io(std::io::Error::other(e.to_string())))?;
    Ok(buf)
}

/// Per-page MediaBox dimensions in points, in page order.
pub fn page_boxes(pdf: &[u8]) -> Result<Vec<PageSize>, WriteError> {
    let doc = Document::load_mem(pdf).map_err(parse_err)?;
    Ok(page_table(&doc)?.into_iter().map(|p| p.size).collect())
}

/// Outcome of [`apply_blueprint`].
#[derive(Debug, Clone)]
pub struct ApplyReport {
    /// The modified PDF.
    pub pdf: Vec<u8>,
    /// Names of widgets created, in blueprint order.
    pub created: Vec<String>,
    /// Names of fields skipped because their page does not exist.
    pub skipped: Vec<String>,
}

/// Encode a text string: plain literal for ASCII, UTF-16BE with BOM otherwise.
fn text_string(s: &str) -> Object {
    if s.is_ascii() {
        return Object::string_literal(s);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

fn catalog_id(doc: &Document) -> Result<ObjectId, WriteError> {
    doc.trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(parse_err)
}

/// The AcroForm dictionary's object id, creating or hoisting it as needed.
fn acroform_id(doc: &mut Document) -> Result<ObjectId, WriteError> {
    let catalog = catalog_id(doc)?;
    let existing = doc
        .get_dictionary(catalog)
        .map_err(parse_err)?
        .get(b"AcroForm")
        .ok()
        .cloned();
    let form = match existing {
        Some(Object::Reference(id)) => return Ok(id),
        Some(Object::Dictionary(dict)) => dict,
        _ => {
            let font = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
            });
            dictionary! {
                "Fields" => Vec::<Object>::new(),
                "DA" => Object::string_literal(DEFAULT_APPEARANCE),
                "DR" => dictionary! {
                    "Font" => dictionary! { "Helv" => Object::Reference(font) },
                },
            }
        }
    };
    let id = doc.add_object(form);
    doc.get_dictionary_mut(catalog)
        .map_err(parse_err)?
        .set("AcroForm", Object::Reference(id));
    Ok(id)
}

/// Append a reference to the array stored under `key` in `holder`, which may
/// be inline, indirect, or absent.
fn append_reference(
    doc: &mut Document,
    holder: ObjectId,
    key: &[u8],
    item: ObjectId,
) -> Result<(), WriteError> {
    let entry = doc
        .get_dictionary(holder)
        .map_err(parse_err)?
        .get(key)
        .ok()
        .cloned();
    match entry {
        Some(Object::Reference(array_id)) => {
            doc.get_object_mut(array_id)
                .and_then(Object::as_array_mut)
                .map_err(parse_err)?
                .push(Object::Reference(item));
        }
        Some(Object::Array(mut items)) => {
            items.push(Object::Reference(item));
            doc.get_dictionary_mut(holder)
                .map_err(parse_err)?
                .set(key.to_vec(), Object::Array(items));
        }
        _ => {
            doc.get_dictionary_mut(holder)
                .map_err(parse_err)?
                .set(key.to_vec(), vec![Object::Reference(item)]);
        }
    }
    Ok(())
}

/// The PDF-space `/Rect` (llx, lly, urx, ury) of a blueprint field.
fn widget_rect(field: &FormField, page: &PageBox) -> Result<[f64; 4], WriteError> {
    if field.coordinates.len() < 4 {
        return Err(WriteError::InvalidBlueprint(format!(
            "field '{}' has {} vertices, expected 4",
            field.field_name,
            field.coordinates.len()
        )));
    }
    let rect: BBox = field
        .page_rect(page.size.width, page.size.height)
        .filter(|r| !r.is_degenerate())
        .ok_or_else(|| {
            WriteError::InvalidBlueprint(format!("field '{}' has no area", field.field_name))
        })?;
    Ok([
        page.origin_x + rect.x0,
        page.origin_y + page.size.height - rect.bottom,
        page.origin_x + rect.x1,
        page.origin_y + page.size.height - rect.top,
    ])
}

fn page_for(field: &FormField, pages: &[PageBox]) -> Result<PageBox, WriteError> {
    field
        .page_number
        .checked_sub(1)
        .and_then(|i| pages.get(i))
        .copied()
        .ok_or(WriteError::PageOutOfRange {
            page: field.page_number,
            page_count: pages.len(),
        })
}

/// Create one empty widget per blueprint field.
///
/// Fields whose page does not exist are skipped with a warning.
///
/// # Errors
///
/// [`WriteError::InvalidBlueprint`] for a field with fewer than four
/// vertices or no area; parse and I/O errors from lopdf.
pub fn apply_blueprint(pdf: &[u8], blueprint: &Blueprint) -> Result<ApplyReport, WriteError> {
    let mut doc = Document::load_mem(pdf).map_err(parse_err)?;
    let pages = page_table(&doc)?;
    let form = acroform_id(&mut doc)?;

    let mut created = Vec::new();
    let mut skipped = Vec::new();
    for field in &blueprint.form_fields {
        let page = match page_for(field, &pages) {
            Ok(page) => page,
            Err(e) => {
                warn!(field = %field.field_name, "skipping field: {e}");
                skipped.push(field.field_name.clone());
                continue;
            }
        };
        let [llx, lly, urx, ury] = widget_rect(field, &page)?;

        let widget = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => Object::Name(field.field_type.as_pdf_name().as_bytes().to_vec()),
            "T" => text_string(&field.field_name),
            "V" => Object::string_literal(""),
            "DA" => Object::string_literal(DEFAULT_APPEARANCE),
            "Rect" => vec![
                Object::Real(llx as _),
                Object::Real(lly as _),
                Object::Real(urx as _),
                Object::Real(ury as _),
            ],
            "F" => Object::Integer(ANNOT_FLAG_PRINT),
            "P" => Object::Reference(page.id),
        });
        append_reference(&mut doc, page.id, b"Annots", widget)?;
        append_reference(&mut doc, form, b"Fields", widget)?;
        debug!(field = %field.field_name, page = field.page_number, "created widget");
        created.push(field.field_name.clone());
    }

    Ok(ApplyReport {
        pdf: save(&mut doc)?,
        created,
        skipped,
    })
}

/// A terminal field of the AcroForm tree.
#[derive(Debug, Clone)]
struct FieldNode {
    id: ObjectId,
    name: String,
    field_type: Option<Vec<u8>>,
}

fn collect_fields(doc: &Document) -> Vec<FieldNode> {
    let Ok(catalog) = catalog_id(doc).and_then(|id| doc.get_dictionary(id).map_err(parse_err)) else {
        return Vec::new();
    };
    let Ok(form) = catalog.get(b"AcroForm") else {
        return Vec::new();
    };
    let Ok(form) = resolve(doc, form).as_dict() else {
        return Vec::new();
    };
    let Ok(fields) = form.get(b"Fields") else {
        return Vec::new();
    };
    let Ok(fields) = resolve(doc, fields).as_array() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for entry in fields {
        if let Object::Reference(id) = entry {
            walk_field(doc, *id, None, None, 0, &mut out);
        }
    }
    out
}

fn walk_field(
    doc: &Document,
    id: ObjectId,
    parent_name: Option<&str>,
    inherited_ft: Option<&[u8]>,
    depth: usize,
    out: &mut Vec<FieldNode>,
) {
    if depth >= MAX_TREE_DEPTH {
        return;
    }
    let Ok(dict) = doc.get_dictionary(id) else {
        return;
    };

    let partial = match dict.get(b"T").map(|o| resolve(doc, o)) {
        Ok(Object::String(bytes, _)) => Some(decode_text_string(bytes)),
        _ => None,
    };
    let name = match (parent_name, partial) {
        (Some(parent), Some(part)) => format!("{parent}.{part}"),
        (Some(parent), None) => parent.to_string(),
        (None, Some(part)) => part,
        (None, None) => String::new(),
    };
    let field_type = match dict.get(b"FT") {
        Ok(Object::Name(n)) => Some(n.as_slice()),
        _ => inherited_ft,
    };

    let child_fields: Vec<ObjectId> = dict
        .get(b"Kids")
        .map(|k| resolve(doc, k))
        .and_then(Object::as_array)
        .map(|kids| {
            kids.iter()
                .filter_map(|k| k.as_reference().ok())
                .filter(|kid| is_named_field(doc, *kid))
                .collect()
        })
        .unwrap_or_default();

    if child_fields.is_empty() {
        out.push(FieldNode {
            id,
            name,
            field_type: field_type.map(<[u8]>::to_vec),
        });
        return;
    }
    for kid in child_fields {
        walk_field(doc, kid, Some(&name), field_type, depth + 1, out);
    }
}

fn is_named_field(doc: &Document, id: ObjectId) -> bool {
    doc.get_dictionary(id).is_ok_and(|d| d.has(b"T"))
}

/// Names of every terminal interactive field, in AcroForm order.
pub fn list_fields(pdf: &[u8]) -> Result<Vec<String>, WriteError> {
    let doc = Document::load_mem(pdf).map_err(parse_err)?;
    Ok(collect_fields(&doc)
        .into_iter()
        .map(|f| f.name)
        .filter(|n| !n.is_empty())
        .collect())
}

/// Outcome of [`fill_fields`].
#[derive(Debug, Clone)]
pub struct FillReport {
    /// The modified PDF.
    pub pdf: Vec<u8>,
    /// Field names that received a value.
    pub filled: Vec<String>,
    /// Requested names with no matching text field.
    pub not_found: Vec<String>,
}

/// Set `/V` on every terminal text field named in `values`.
///
/// Stale appearance streams are removed and `/NeedAppearances` is set so
/// viewers regenerate them.
pub fn fill_fields(pdf: &[u8], values: &BTreeMap<String, String>) -> Result<FillReport, WriteError> {
    let mut doc = Document::load_mem(pdf).map_err(parse_err)?;
    let fields = collect_fields(&doc);

    let mut filled = Vec::new();
    for field in fields {
        if field.field_type.as_deref() != Some(b"Tx".as_slice()) {
            continue;
        }
        let Some(value) = values.get(&field.name) else {
            continue;
        };
        let dict: &mut Dictionary = doc.get_dictionary_mut(field.id).map_err(parse_err)?;
        dict.set("V", text_string(value));
        dict.remove(b"AP");
        debug!(field = %field.name, "filled");
        filled.push(field.name);
    }

    let form = acroform_id(&mut doc)?;
    doc.get_dictionary_mut(form)
        .map_err(parse_err)?
        .set("NeedAppearances", Object::Boolean(true));

    let not_found = values
        .keys()
        .filter(|k| !filled.contains(k))
        .cloned()
        .collect();

    Ok(FillReport {
        pdf: save(&mut doc)?,
        filled,
        not_found,
    })
}
