//! Convert raster images into PDF pages.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use lopdf::{Dictionary, Document, Object, Stream};
use tracing::{debug, info};

use super::{rect_object, save};
use crate::error::{PdfToolError, Result};
use crate::requests::{ImageFileData, ImageToPdfRequest, Orientation, PageSize};

const POINTS_PER_INCH: f32 = 72.0;
/// Pixel density assumed for "fit" pages.
const ASSUMED_DPI: f32 = 96.0;
const A4: (f32, f32) = (595.276, 841.89);
const LETTER: (f32, f32) = (612.0, 792.0);

/// Result of an image conversion.
#[derive(Debug)]
pub enum ImagePdf {
    /// Every image as one page of a single document.
    Merged(Vec<u8>),
    /// One document per image, named after the image.
    Separate(Vec<(String, Vec<u8>)>),
}

struct EncodedImage {
    width: u32,
    height: u32,
    jpeg: Vec<u8>,
}

pub fn images_to_pdf(request: &ImageToPdfRequest) -> Result<ImagePdf> {
    let quality = request.quality.clamp(1, 100) as u8;
    let encoded = request
        .images
        .iter()
        .map(|image| encode_jpeg(image, quality))
        .collect::<Result<Vec<_>>>()?;

    info!(
        images = encoded.len(),
        merge_all = request.merge_all,
        "converting images to PDF"
    );

    if request.merge_all {
        let bytes = build_document(&encoded, request.page_size, request.orientation)?;
        return Ok(ImagePdf::Merged(bytes));
    }

    request
        .images
        .iter()
        .zip(&encoded)
        .map(|(source, image)| {
            let stem = Path::new(&source.file_name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("image");
            let bytes = build_document(std::slice::from_ref(image), request.page_size, request.orientation)?;
            Ok((format!("{}.pdf", stem), bytes))
        })
        .collect::<Result<Vec<_>>>()
        .map(ImagePdf::Separate)
}

fn encode_jpeg(source: &ImageFileData, quality: u8) -> Result<EncodedImage> {
    let decoded = image::load_from_memory(&source.content).map_err(|e| {
        PdfToolError::InvalidArgument(format!("failed to read image {}: {}", source.file_name, e))
    })?;
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());

    let mut jpeg = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, quality))?;
    debug!(
        file = %source.file_name,
        original = source.content.len(),
        encoded = jpeg.len(),
        "re-encoded image"
    );

    Ok(EncodedImage {
        width: rgb.width(),
        height: rgb.height(),
        jpeg,
    })
}

/// Page dimensions in points.
pub(crate) fn page_dimensions(size: PageSize, orientation: Orientation, width_px: u32, height_px: u32) -> (f32, f32) {
    let (w, h) = match size {
        PageSize::A4 => A4,
        PageSize::Letter => LETTER,
        PageSize::Fit => (
            width_px as f32 / ASSUMED_DPI * POINTS_PER_INCH,
            height_px as f32 / ASSUMED_DPI * POINTS_PER_INCH,
        ),
    };
    let (short, long) = if w <= h { (w, h) } else { (h, w) };
    match orientation {
        Orientation::Portrait => (short, long),
        Orientation::Landscape => (long, short),
    }
}

/// Largest aspect-preserving box inside the page, centred:
/// `(width, height, x, y)`.
pub(crate) fn fit_image(width_px: u32, height_px: u32, page_w: f32, page_h: f32) -> (f32, f32, f32, f32) {
    let scale = (page_w / width_px as f32).min(page_h / height_px as f32);
    let draw_w = width_px as f32 * scale;
    let draw_h = height_px as f32 * scale;
    (draw_w, draw_h, (page_w - draw_w) / 2.0, (page_h - draw_h) / 2.0)
}

fn build_document(images: &[EncodedImage], size: PageSize, orientation: Orientation) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::with_capacity(images.len());
    for image in images {
        let (page_w, page_h) = page_dimensions(size, orientation, image.width, image.height);
        let (draw_w, draw_h, x, y) = fit_image(image.width, image.height, page_w, page_h);

        let mut xobject = Stream::new(
            Dictionary::from_iter(vec![
                ("Type", Object::Name(b"XObject".to_vec())),
                ("Subtype", Object::Name(b"Image".to_vec())),
                ("Width", Object::Integer(image.width as i64)),
                ("Height", Object::Integer(image.height as i64)),
                ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
                ("BitsPerComponent", Object::Integer(8)),
                ("Filter", Object::Name(b"DCTDecode".to_vec())),
            ]),
            image.jpeg.clone(),
        );
        // Already JPEG; deflating it again gains nothing
        xobject.allows_compression = false;
        let image_id = doc.add_object(xobject);

        let content = format!(
            "q {:.4} 0 0 {:.4} {:.4} {:.4} cm /Im0 Do Q\n",
            draw_w, draw_h, x, y
        );
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let resources = Dictionary::from_iter(vec![(
            "XObject",
            Object::Dictionary(Dictionary::from_iter(vec![("Im0", Object::Reference(image_id))])),
        )]);
        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("MediaBox", rect_object([0.0, 0.0, page_w, page_h])),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]);
        kids.push(doc.add_object(page));
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(kids.len() as i64)),
        (
            "Kids",
            Object::Array(kids.iter().map(|&id| Object::Reference(id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    save(&mut doc)
}
