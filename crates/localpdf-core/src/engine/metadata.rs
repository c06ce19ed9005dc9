//! Document information dictionary access.
//!
//! Reading falls back in three steps: the trailer's `Info` dictionary, then
//! the catalog's XMP packet, then a handful of non-standard keys some
//! producers write instead of the standard ones.

use lazy_static::lazy_static;
use lopdf::{Dictionary, Document, Object, StringFormat};
use regex::Regex;
use tracing::{debug, warn};

use super::page_count;
use crate::error::Result;
use crate::requests::PdfMetadata;

lazy_static! {
    static ref XML_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
}

pub fn read_metadata(doc: &Document) -> PdfMetadata {
    let mut metadata = PdfMetadata {
        page_count: page_count(doc),
        ..Default::default()
    };

    let info = info_dictionary(doc);
    if let Some(info) = info {
        metadata.title = text_value(doc, info, b"Title");
        metadata.author = text_value(doc, info, b"Author");
        metadata.subject = text_value(doc, info, b"Subject");
        metadata.keywords = text_value(doc, info, b"Keywords");
        metadata.creator = text_value(doc, info, b"Creator");
        metadata.producer = text_value(doc, info, b"Producer");
        metadata.creation_date = text_value(doc, info, b"CreationDate");
        metadata.modification_date = text_value(doc, info, b"ModDate");
    }

    if metadata.is_empty() {
        debug!("info dictionary empty, trying XMP metadata");
        if let Some(xmp) = xmp_packet(doc) {
            fill_from_xmp(&xmp, &mut metadata);
        }
    }

    if metadata.is_empty() {
        if let Some(info) = info {
            debug!("trying alternative metadata keys");
            metadata.author = metadata.author.or_else(|| text_value(doc, info, b"Authors"));
            metadata.creator = metadata
                .creator
                .or_else(|| text_value(doc, info, b"SourceApplication"));
            metadata.producer = metadata
                .producer
                .or_else(|| text_value(doc, info, b"PDFProducer"));
        }
    }

    metadata
}

/// Set or clear each descriptive field. Absent or blank values remove the
/// entry; dates and page count are never written.
pub fn write_metadata(doc: &mut Document, metadata: &PdfMetadata) -> Result<()> {
    let fields: [(&str, &Option<String>); 6] = [
        ("Title", &metadata.title),
        ("Author", &metadata.author),
        ("Subject", &metadata.subject),
        ("Keywords", &metadata.keywords),
        ("Creator", &metadata.creator),
        ("Producer", &metadata.producer),
    ];

    let info = info_dictionary_mut(doc)?;
    for (key, value) in fields {
        match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            Some(text) => info.set(key, encode_text_string(text)),
            None => {
                info.remove(key.as_bytes());
            }
        }
    }
    Ok(())
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn info_dictionary_mut(doc: &mut Document) -> Result<&mut Dictionary> {
    let info_id = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => *id,
        Ok(Object::Dictionary(dict)) => {
            let dict = dict.clone();
            let id = doc.add_object(dict);
            doc.trailer.set("Info", Object::Reference(id));
            id
        }
        _ => {
            let id = doc.add_object(Dictionary::new());
            doc.trailer.set("Info", Object::Reference(id));
            id
        }
    };
    Ok(doc.get_object_mut(info_id).and_then(Object::as_dict_mut)?)
}

fn text_value(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    let value = match dict.get(key).ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let text = match value {
        Object::String(bytes, _) => decode_text_string(bytes),
        Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
        Object::Integer(i) => i.to_string(),
        Object::Real(r) => r.to_string(),
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Decode a PDF text string: UTF-16BE with a byte order mark, otherwise
/// treated as single-byte.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn xmp_packet(doc: &Document) -> Option<String> {
    let catalog_id = doc.trailer.get(b"Root").ok()?.as_reference().ok()?;
    let metadata_id = doc
        .get_dictionary(catalog_id)
        .ok()?
        .get(b"Metadata")
        .ok()?
        .as_reference()
        .ok()?;

    let stream = match doc.get_object(metadata_id) {
        Ok(Object::Stream(stream)) => stream,
        _ => return None,
    };

    let is_xml = stream.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"XML".as_slice());
    if !is_xml {
        return None;
    }

    let content = match stream.decompressed_content() {
        Ok(content) => content,
        Err(_) => stream.content.clone(),
    };
    match String::from_utf8(content) {
        Ok(xml) => Some(xml),
        Err(err) => {
            warn!(error = %err, "XMP packet is not valid UTF-8");
            None
        }
    }
}

fn fill_from_xmp(xmp: &str, metadata: &mut PdfMetadata) {
    let targets: [(&mut Option<String>, &str); 6] = [
        (&mut metadata.title, "dc:title"),
        (&mut metadata.author, "dc:creator"),
        (&mut metadata.subject, "dc:description"),
        (&mut metadata.keywords, "pdf:Keywords"),
        (&mut metadata.creator, "xmp:CreatorTool"),
        (&mut metadata.producer, "pdf:Producer"),
    ];
    for (slot, tag) in targets {
        if slot.as_deref().map_or(true, str::is_empty) {
            *slot = xmp_value(xmp, tag);
        }
    }
}

/// Text content of the first `<tag>` element, with nested markup such as
/// `rdf:Alt`/`rdf:li` stripped.
fn xmp_value(xmp: &str, tag: &str) -> Option<String> {
    let open = xmp.find(&format!("<{}", tag))?;
    let body_start = open + xmp[open..].find('>')? + 1;
    let body_end = body_start + xmp[body_start..].find(&format!("</{}>", tag))?;

    let mut body = xmp[body_start..body_end].trim();
    if let Some(inner) = body
        .strip_prefix("<![CDATA[")
        .and_then(|b| b.strip_suffix("]]>"))
    {
        body = inner;
    }

    let text = XML_TAG.replace_all(body, " ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}
