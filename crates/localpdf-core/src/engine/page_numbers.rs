//! Stamp page numbers onto pages with the standard Helvetica font.

use lopdf::{Dictionary, Document, Object};
use tracing::info;

use super::{add_page_resource, append_page_content, media_box};
use crate::error::{PdfToolError, Result};
use crate::requests::{AddPageNumbersRequest, PageNumberFormat, PageNumberPosition};

/// Distance from the page edge, in points.
const MARGIN: f32 = 20.0;

/// Resource name the stamped font is registered under.
const FONT_NAME: &[u8] = b"LPNum";

const ROMAN: [(u32, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Upper-case roman numeral. Numbers outside 1..=3999 stay decimal.
pub fn to_roman(mut number: u32) -> String {
    if !(1..=3999).contains(&number) {
        return number.to_string();
    }
    let mut out = String::new();
    for (value, numeral) in ROMAN {
        while number >= value {
            number -= value;
            out.push_str(numeral);
        }
    }
    out
}

pub fn format_page_label(current: u32, total: u32, format: PageNumberFormat) -> String {
    match format {
        PageNumberFormat::Number => current.to_string(),
        PageNumberFormat::PageOfTotal => format!("Page {} of {}", current, total),
        PageNumberFormat::NumberWithDash => format!("-{}-", current),
        PageNumberFormat::RomanLower => to_roman(current).to_lowercase(),
        PageNumberFormat::RomanUpper => to_roman(current),
    }
}

/// Number every page from `start_page` on, counting from `start_number`.
/// Returns how many pages were stamped.
pub fn add_page_numbers(doc: &mut Document, request: &AddPageNumbersRequest) -> Result<usize> {
    let pages = doc.get_pages();
    let total = pages.len() as u32;
    if request.start_page > total {
        return Err(PdfToolError::PageOutOfRange {
            token: format!("startPage {}", request.start_page),
            page: request.start_page,
            total,
        });
    }
    // The last label must still fit in a u32
    if request.start_number.checked_add(total - request.start_page).is_none() {
        return Err(PdfToolError::InvalidArgument(format!(
            "startNumber {} is too large for a {}-page document",
            request.start_number, total
        )));
    }
    let font_size = request.font_size as f32;

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]));

    let mut stamped = 0;
    for (&page, &page_id) in pages.range(request.start_page..) {
        let current = request.start_number + (page - request.start_page);
        let label = format_page_label(current, total, request.format);

        let text_width = text_width(&label, font_size);
        let (x, y) = place(media_box(doc, page_id), text_width, font_size, request.position);

        let content = format!(
            "BT /{} {} Tf 0 g {:.2} {:.2} Td ({}) Tj ET\n",
            String::from_utf8_lossy(FONT_NAME),
            request.font_size,
            x,
            y,
            label
        );

        add_page_resource(doc, page_id, b"Font", FONT_NAME, Object::Reference(font_id))?;
        append_page_content(doc, page_id, content.into_bytes())?;
        stamped += 1;
    }

    info!(total_pages = total, stamped, "page numbers added");
    Ok(stamped)
}

/// Baseline origin of the label inside `[x1, y1, x2, y2]`.
fn place(rect: [f32; 4], text_width: f32, font_size: f32, position: PageNumberPosition) -> (f32, f32) {
    let [x1, y1, x2, y2] = rect;
    let left = x1 + MARGIN;
    let center = x1 + (x2 - x1 - text_width) / 2.0;
    let right = x2 - MARGIN - text_width;
    let top = y2 - MARGIN - font_size;
    let bottom = y1 + MARGIN;

    match position {
        PageNumberPosition::TopLeft => (left, top),
        PageNumberPosition::TopCenter => (center, top),
        PageNumberPosition::TopRight => (right, top),
        PageNumberPosition::BottomLeft => (left, bottom),
        PageNumberPosition::BottomCenter => (center, bottom),
        PageNumberPosition::BottomRight => (right, bottom),
    }
}

/// Approximate Helvetica advance width of `text` at `font_size`.
fn text_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(helvetica_advance).sum();
    units as f32 * font_size / 1000.0
}

fn helvetica_advance(ch: char) -> u32 {
    match ch {
        ' ' | 'f' | 't' | 'I' => 278,
        '-' => 333,
        'i' | 'l' => 222,
        'v' | 'x' | 'c' => 500,
        'm' | 'M' => 833,
        'P' | 'V' | 'X' => 667,
        'C' | 'D' => 722,
        _ => 556,
    }
}
