//! PDF page engine built on lopdf
//!
//! Every page-level tool reduces to [`rebuild`]: produce a document whose
//! page tree is exactly a list of original pages, in order, each optionally
//! turned by a multiple of 90 degrees. Inheritable page attributes are
//! pushed down onto each page first so pages survive being moved directly
//! under the root `Pages` node.

mod crop;
mod images;
mod merge;
mod metadata;
mod page_numbers;
mod split;

pub use crop::crop_pages;
pub use images::{images_to_pdf, ImagePdf};
pub use merge::merge_documents;
pub use metadata::{read_metadata, write_metadata};
pub use page_numbers::{add_page_numbers, format_page_label, to_roman};
pub use split::{plan_split, split_document, SplitPart};

use std::collections::HashSet;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{PdfToolError, Result};
use crate::page_ranges::PageSelection;
use crate::requests::PageInstruction;
use crate::validation::ensure_pages_remain;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guard against cyclic `Parent` chains in malformed files.
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used when a page has no MediaBox anywhere in its ancestry.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// One page of a rebuilt document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePlacement {
    /// 1-based page number in the source document.
    pub page: u32,
    /// Extra clockwise rotation in degrees; must be a multiple of 90.
    pub rotation: i32,
}

impl PagePlacement {
    pub fn unrotated(page: u32) -> Self {
        Self { page, rotation: 0 }
    }
}

/// Parse a PDF held in memory. Encrypted documents are rejected.
pub fn load_bytes(bytes: &[u8]) -> Result<Document> {
    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        // lopdf could not get past the encryption; only the raw bytes are left
        Err(err) if mentions_encrypt(bytes) => {
            return Err(PdfToolError::EncryptedDocument(format!(
                "PDF is encrypted. Please unlock it first ({})",
                err
            )))
        }
        Err(err) => return Err(err.into()),
    };

    if is_encrypted(&doc) {
        return Err(PdfToolError::EncryptedDocument(
            "PDF is encrypted. Please unlock it first.".into(),
        ));
    }
    Ok(doc)
}

/// Read and parse a PDF from disk.
pub fn load(path: &Path) -> Result<Document> {
    if !path.is_file() {
        return Err(PdfToolError::FileNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    load_bytes(&bytes)
}

/// True when the trailer carries an `/Encrypt` dictionary.
pub fn is_encrypted(doc: &Document) -> bool {
    doc.is_encrypted() || doc.trailer.get(b"Encrypt").is_ok()
}

/// Fallback for documents lopdf fails to parse at all.
fn mentions_encrypt(bytes: &[u8]) -> bool {
    bytes.windows(b"/Encrypt".len()).any(|w| w == b"/Encrypt")
}

pub fn page_count(doc: &Document) -> u32 {
    doc.get_pages().len() as u32
}

/// Compress and serialize a document.
pub fn save(doc: &mut Document) -> Result<Vec<u8>> {
    doc.compress();
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfToolError::Unexpected(format!("failed to write PDF: {}", e)))?;
    Ok(buffer)
}

/// Build a new document containing exactly `placements`, in order.
///
/// Pages listed more than once are cloned so each occurrence can carry its
/// own rotation. Objects no longer reachable from the trailer are pruned.
pub fn rebuild(doc: &Document, placements: &[PagePlacement]) -> Result<Document> {
    ensure_pages_remain(placements.len())?;

    let mut out = doc.clone();
    let page_ids = flatten_pages(&mut out)?;
    let total = page_ids.len() as u32;

    let mut prepared: Vec<(ObjectId, Dictionary)> = Vec::with_capacity(placements.len());
    for placement in placements {
        if placement.page < 1 || placement.page > total {
            return Err(PdfToolError::PageOutOfRange {
                token: placement.page.to_string(),
                page: placement.page,
                total,
            });
        }
        if placement.rotation % 90 != 0 {
            return Err(PdfToolError::InvalidArgument(format!(
                "rotation must be a multiple of 90 degrees, got {}",
                placement.rotation
            )));
        }

        let page_id = page_ids[(placement.page - 1) as usize];
        let mut dict = out.get_dictionary(page_id)?.clone();
        if placement.rotation != 0 {
            let current = dict.get(b"Rotate").and_then(Object::as_i64).unwrap_or(0);
            let turned = (current + placement.rotation as i64).rem_euclid(360);
            dict.set("Rotate", Object::Integer(turned));
        }
        prepared.push((page_id, dict));
    }

    let mut used = HashSet::new();
    let mut kids = Vec::with_capacity(prepared.len());
    for (page_id, dict) in prepared {
        if used.insert(page_id) {
            out.objects.insert(page_id, Object::Dictionary(dict));
            kids.push(page_id);
        } else {
            kids.push(out.add_object(dict));
        }
    }

    install_page_tree(&mut out, &kids)?;
    out.prune_objects();
    Ok(out)
}

/// Keep only the selected pages, in ascending order.
pub fn select_pages(doc: &Document, selection: &PageSelection) -> Result<Document> {
    let placements: Vec<_> = selection.iter().map(PagePlacement::unrotated).collect();
    rebuild(doc, &placements)
}

/// Drop the selected pages and keep the rest in their original order.
pub fn remove_pages(doc: &Document, selection: &PageSelection) -> Result<Document> {
    let keep = selection.complement();
    ensure_pages_remain(keep.len())?;
    select_pages(doc, &keep)
}

/// Reorder, duplicate and rotate pages.
pub fn organize(doc: &Document, instructions: &[PageInstruction]) -> Result<Document> {
    let placements: Vec<_> = instructions
        .iter()
        .map(|i| PagePlacement {
            page: i.page_number,
            rotation: i.rotation,
        })
        .collect();
    rebuild(doc, &placements)
}

/// Copy inherited attributes onto every page and return the page ids in
/// document order.
pub(crate) fn flatten_pages(doc: &mut Document) -> Result<Vec<ObjectId>> {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

    for &page_id in &page_ids {
        let mut inherited = Vec::new();
        {
            let page = doc.get_dictionary(page_id)?;
            for key in INHERITABLE {
                if page.has(key) {
                    continue;
                }
                if let Some(value) = inherited_attribute(doc, page, key) {
                    inherited.push((key, value));
                }
            }
        }

        if inherited.is_empty() {
            continue;
        }
        let page = doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?;
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }

    Ok(page_ids)
}

fn inherited_attribute(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut current = page;
    for _ in 0..MAX_TREE_DEPTH {
        let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
    }
    None
}

/// Object id of the root `Pages` node.
pub(crate) fn pages_root_id(doc: &Document) -> Result<ObjectId> {
    let catalog_id = doc.trailer.get(b"Root")?.as_reference()?;
    let pages_id = doc.get_dictionary(catalog_id)?.get(b"Pages")?.as_reference()?;
    Ok(pages_id)
}

/// Point the root `Pages` node at `kids` and re-parent each kid.
pub(crate) fn install_page_tree(doc: &mut Document, kids: &[ObjectId]) -> Result<()> {
    let pages_id = pages_root_id(doc)?;

    let root = doc.get_object_mut(pages_id).and_then(Object::as_dict_mut)?;
    root.set(
        "Kids",
        Object::Array(kids.iter().map(|&id| Object::Reference(id)).collect()),
    );
    root.set("Count", Object::Integer(kids.len() as i64));

    for &kid in kids {
        let page = doc.get_object_mut(kid).and_then(Object::as_dict_mut)?;
        page.set("Parent", Object::Reference(pages_id));
    }
    Ok(())
}

/// Page size as `[llx, lly, urx, ury]`, resolving references and inheritance.
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return DEFAULT_MEDIA_BOX;
    };
    let value = match page.get(b"MediaBox") {
        Ok(value) => Some(value.clone()),
        Err(_) => inherited_attribute(doc, page, b"MediaBox"),
    };
    value
        .and_then(|v| rect_from_object(doc, &v))
        .unwrap_or(DEFAULT_MEDIA_BOX)
}

pub(crate) fn rect_from_object(doc: &Document, object: &Object) -> Option<[f32; 4]> {
    let object = match object {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let items = object.as_array().ok()?;
    if items.len() != 4 {
        return None;
    }
    let mut rect = [0.0f32; 4];
    for (slot, item) in rect.iter_mut().zip(items) {
        *slot = number(item)?;
    }
    Some(rect)
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

pub(crate) fn rect_object(rect: [f32; 4]) -> Object {
    Object::Array(rect.iter().map(|&v| Object::Real(v)).collect())
}

/// Append a content stream to a page, keeping the existing contents intact.
///
/// The existing contents are wrapped in `q`/`Q` so graphics state they leave
/// behind does not leak into the appended operators.
pub(crate) fn append_page_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let existing = doc.get_dictionary(page_id)?.get(b"Contents").ok().cloned();

    let mut streams: Vec<Object> = Vec::new();
    if let Some(existing) = existing {
        let save_id = doc.add_object(lopdf::Stream::new(Dictionary::new(), b"q\n".to_vec()));
        streams.push(Object::Reference(save_id));
        match existing {
            Object::Array(items) => streams.extend(items),
            other => streams.push(other),
        }
        let mut restored = b"Q\n".to_vec();
        restored.extend(content);
        let content_id = doc.add_object(lopdf::Stream::new(Dictionary::new(), restored));
        streams.push(Object::Reference(content_id));
    } else {
        let content_id = doc.add_object(lopdf::Stream::new(Dictionary::new(), content));
        streams.push(Object::Reference(content_id));
    }

    let page = doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?;
    page.set("Contents", Object::Array(streams));
    Ok(())
}

/// Register a resource (font, XObject) on a page under `category`/`name`.
pub(crate) fn add_page_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &[u8],
    name: &[u8],
    value: Object,
) -> Result<()> {
    // Resolve the page's Resources into an owned dictionary so shared
    // resource objects are never mutated for other pages.
    let resources = match doc.get_dictionary(page_id)?.get(b"Resources") {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id)?.clone(),
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    let mut resources = resources;

    let mut entries = match resources.get(category) {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id)?.clone(),
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    entries.set(name.to_vec(), value);
    resources.set(category.to_vec(), Object::Dictionary(entries));

    let page = doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, Stream};

    /// Build an N-page Letter PDF. Each page carries a `TestLabel` entry
    /// ("P1", "P2", ...) so tests can check page identity after a rebuild.
    pub fn create_test_pdf(num_pages: u32) -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut page_ids = Vec::new();
        for i in 0..num_pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                    Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                    Operation::new(
                        "Tj",
                        vec![Object::String(
                            format!("Page {}", i + 1).into_bytes(),
                            lopdf::StringFormat::Literal,
                        )],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

            let page = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Contents", Object::Reference(content_id)),
                (
                    "TestLabel",
                    Object::String(format!("P{}", i + 1).into_bytes(), lopdf::StringFormat::Literal),
                ),
            ]);
            page_ids.push(doc.add_object(page));
        }

        // MediaBox and Resources live on the root so rebuilds must push them down
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(num_pages as i64)),
            (
                "Kids",
                Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
            ),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
            ("Resources", Object::Dictionary(Dictionary::new())),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]);
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    pub fn create_test_pdf_bytes(num_pages: u32) -> Vec<u8> {
        let mut doc = create_test_pdf(num_pages);
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    /// `TestLabel` of every page, in page-tree order.
    pub fn page_labels(doc: &Document) -> Vec<String> {
        doc.get_pages()
            .values()
            .map(|&id| {
                match doc.get_dictionary(id).unwrap().get(b"TestLabel").unwrap() {
                    Object::String(bytes, _) => String::from_utf8(bytes.clone()).unwrap(),
                    other => panic!("unexpected label {:?}", other),
                }
            })
            .collect()
    }

    pub fn page_rotation(doc: &Document, page: u32) -> i64 {
        let id = doc.get_pages()[&page];
        doc.get_dictionary(id)
            .unwrap()
            .get(b"Rotate")
            .and_then(Object::as_i64)
            .unwrap_or(0)
    }
}
