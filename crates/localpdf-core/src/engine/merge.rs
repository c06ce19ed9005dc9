//! Concatenate documents into one.

use lopdf::{Document, Object, ObjectId};
use tracing::debug;

use super::{flatten_pages, install_page_tree};
use crate::error::{PdfToolError, Result};

/// Merge documents in the given order.
///
/// Objects of each later document are renumbered past the current maximum
/// id, then every page is hung directly off the first document's page tree.
/// The other documents' catalogs become unreachable and are pruned.
pub fn merge_documents(documents: Vec<Document>) -> Result<Document> {
    let mut documents = documents.into_iter();
    let mut dest = documents
        .next()
        .ok_or_else(|| PdfToolError::MissingArgument("files".into()))?;

    let mut page_ids = flatten_pages(&mut dest)?;

    for (index, mut source) in documents.enumerate() {
        let source_pages = flatten_pages(&mut source)?;
        let offset = dest.max_id;
        let source_max = source.max_id;

        for (id, object) in std::mem::take(&mut source.objects) {
            dest.objects.insert(shift(id, offset), remap_object_refs(object, offset));
        }
        page_ids.extend(source_pages.into_iter().map(|id| shift(id, offset)));
        dest.max_id = dest.max_id.max(source_max + offset);

        debug!(document = index + 2, offset, "merged document objects");
    }

    install_page_tree(&mut dest, &page_ids)?;
    dest.prune_objects();
    Ok(dest)
}

fn shift(id: ObjectId, offset: u32) -> ObjectId {
    (id.0 + offset, id.1)
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference(shift(id, offset)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}
