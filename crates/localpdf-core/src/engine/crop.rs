use lopdf::{Document, Object};
use tracing::{info, warn};

use super::{media_box, rect_object};
use crate::error::Result;
use crate::page_ranges::PageSelection;
use crate::requests::CropMargins;

/// Set each selected page's CropBox to its MediaBox inset by `margins`.
///
/// Pages whose margins leave no visible area are left untouched and
/// logged. Returns the number of pages actually cropped.
pub fn crop_pages(doc: &mut Document, selection: &PageSelection, margins: &CropMargins) -> Result<usize> {
    let pages = doc.get_pages();
    let mut cropped = 0;

    for page in selection.iter() {
        let Some(&page_id) = pages.get(&page) else {
            continue;
        };

        let [x1, y1, x2, y2] = media_box(doc, page_id);
        let crop = [
            x1 + margins.left,
            y1 + margins.bottom,
            x2 - margins.right,
            y2 - margins.top,
        ];

        if crop[2] <= crop[0] || crop[3] <= crop[1] {
            warn!(page, "crop margins leave no visible area, page skipped");
            continue;
        }

        let dict = doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?;
        dict.set("CropBox", rect_object(crop));
        cropped += 1;
    }

    info!(
        total_pages = pages.len(),
        cropped,
        "crop completed"
    );
    Ok(cropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rect_from_object;
    use crate::engine::testing::create_test_pdf;

    fn crop_box(doc: &Document, page: u32) -> Option<[f32; 4]> {
        let id = doc.get_pages()[&page];
        let value = doc.get_dictionary(id).unwrap().get(b"CropBox").ok()?;
        rect_from_object(doc, value)
    }

    #[test]
    fn test_crop_insets_media_box() {
        let mut doc = create_test_pdf(3);
        let margins = CropMargins {
            top: 10.0,
            right: 20.0,
            bottom: 30.0,
            left: 40.0,
        };
        let selection = PageSelection::from_pages([2], 3).unwrap();

        assert_eq!(crop_pages(&mut doc, &selection, &margins).unwrap(), 1);
        assert_eq!(crop_box(&doc, 2), Some([40.0, 30.0, 592.0, 782.0]));
        assert_eq!(crop_box(&doc, 1), None);
        assert_eq!(crop_box(&doc, 3), None);
    }

    #[test]
    fn test_crop_skips_pages_with_no_area_left() {
        let mut doc = create_test_pdf(2);
        let margins = CropMargins {
            left: 400.0,
            right: 300.0,
            ..Default::default()
        };
        assert_eq!(crop_pages(&mut doc, &PageSelection::all(2), &margins).unwrap(), 0);
        assert_eq!(crop_box(&doc, 1), None);
    }
}
