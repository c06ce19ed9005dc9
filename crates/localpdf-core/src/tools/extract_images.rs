//! Image extraction and removal through the bundled helper.
//!
//! The helper takes a single argument, the path of a JSON request file, and
//! answers with base64 image or PDF payloads.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{run_helper, EXTRACT_IMAGES_HELPER};
use crate::archive::{no_images_archive, zip_entries};
use crate::bridge::TempFile;
use crate::error::{PdfToolError, Result};
use crate::page_ranges::PageSelection;
use crate::requests::ImageMode;
use crate::toolbox::ToolConfig;

#[derive(Debug, Serialize)]
struct HelperRequest<'a> {
    file_path: &'a str,
    pages: Option<Vec<u32>>,
    page_ranges: Option<Vec<String>>,
    mode: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedImage {
    pub page: u32,
    pub index: u32,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub format: String,
    pub data: String,
}

impl ExtractedImage {
    pub fn file_name(&self) -> String {
        let extension = if self.format.eq_ignore_ascii_case("jpg") || self.format.eq_ignore_ascii_case("jpeg") {
            "jpg"
        } else {
            "png"
        };
        format!("page_{}_image_{:04}.{}", self.page, self.index, extension)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractReport {
    #[serde(default)]
    pub extracted_count: u32,
    #[serde(default)]
    pub processed_pages: u32,
    #[serde(default)]
    pub images: Vec<ExtractedImage>,
    #[serde(default)]
    pub pdf_data: Option<String>,
    #[serde(default)]
    pub removed_images_count: u32,
}

#[derive(Debug, Clone)]
pub enum ImagesOutput {
    /// ZIP of extracted images, or of a note when there were none.
    Archive(Vec<u8>),
    /// The document with its images removed.
    Pdf(Vec<u8>),
}

/// Serialize the helper request. An empty selection means every page.
fn helper_request(file_path: &str, selection: &PageSelection, mode: ImageMode) -> Result<Vec<u8>> {
    let (pages, page_ranges) = if selection.is_empty() {
        (None, None)
    } else {
        let ranges = selection
            .to_range_string()
            .split(',')
            .map(str::to_string)
            .collect();
        (Some(selection.to_vec()), Some(ranges))
    };
    let request = HelperRequest {
        file_path,
        pages,
        page_ranges,
        mode: mode.as_str(),
    };
    Ok(serde_json::to_vec(&request)?)
}

fn decode(field: &str, data: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(data.trim())
        .map_err(|e| PdfToolError::SubprocessFailure(format!("invalid base64 in {}: {}", field, e)))
}

/// Turn a successful helper report into the response payload.
pub(crate) fn package(report: ExtractReport, mode: ImageMode) -> Result<ImagesOutput> {
    match mode {
        ImageMode::Extract => {
            if report.images.is_empty() {
                warn!("no images found to extract");
                return Ok(ImagesOutput::Archive(no_images_archive()?));
            }
            let entries = report
                .images
                .iter()
                .map(|image| Ok((image.file_name(), decode("image data", &image.data)?)))
                .collect::<Result<Vec<_>>>()?;
            info!(
                extracted = report.extracted_count,
                pages = report.processed_pages,
                "images extracted"
            );
            Ok(ImagesOutput::Archive(zip_entries(entries)?))
        }
        ImageMode::Remove => {
            let data = report
                .pdf_data
                .as_deref()
                .filter(|d| !d.is_empty())
                .ok_or_else(|| PdfToolError::SubprocessFailure("no PDF data returned from image removal".into()))?;
            let pdf = decode("pdf_data", data)?;
            info!(
                removed = report.removed_images_count,
                pages = report.processed_pages,
                size = pdf.len(),
                "images removed"
            );
            Ok(ImagesOutput::Pdf(pdf))
        }
    }
}

pub async fn process_images(
    config: &ToolConfig,
    file_path: &str,
    selection: &PageSelection,
    mode: ImageMode,
) -> Result<ImagesOutput> {
    let request = TempFile::with_contents(
        &config.temp_dir,
        "_extract_request.json",
        &helper_request(file_path, selection, mode)?,
    )
    .await?;

    let report: ExtractReport = run_helper(
        config,
        EXTRACT_IMAGES_HELPER,
        vec![request.path().as_os_str().to_owned()],
    )
    .await?;
    package(report, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    fn image(page: u32, index: u32, format: &str, data: &[u8]) -> ExtractedImage {
        ExtractedImage {
            page,
            index,
            width: 1,
            height: 1,
            format: format.into(),
            data: STANDARD.encode(data),
        }
    }

    #[test]
    fn test_helper_request_uses_canonical_pages() {
        let selection = PageSelection::from_pages([1, 2, 3, 7], 10).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&helper_request("/in.pdf", &selection, ImageMode::Extract).unwrap()).unwrap();
        assert_eq!(json["file_path"], "/in.pdf");
        assert_eq!(json["pages"], serde_json::json!([1, 2, 3, 7]));
        assert_eq!(json["page_ranges"], serde_json::json!(["1-3", "7"]));
        assert_eq!(json["mode"], "extract");
    }

    #[test]
    fn test_empty_selection_means_all_pages() {
        let json: serde_json::Value = serde_json::from_slice(
            &helper_request("/in.pdf", &PageSelection::empty(4), ImageMode::Remove).unwrap(),
        )
        .unwrap();
        assert!(json["pages"].is_null());
        assert!(json["page_ranges"].is_null());
        assert_eq!(json["mode"], "remove");
    }

    #[test]
    fn test_extracted_images_zipped_by_page_and_index() {
        let report = ExtractReport {
            images: vec![image(3, 1, "png", b"png-bytes"), image(1, 12, "jpeg", b"jpg-bytes")],
            extracted_count: 2,
            ..Default::default()
        };
        let ImagesOutput::Archive(bytes) = package(report, ImageMode::Extract).unwrap() else {
            panic!("expected archive");
        };
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = Vec::new();
        archive
            .by_name("page_1_image_0012.jpg")
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"jpg-bytes");
        assert!(archive.by_name("page_3_image_0001.png").is_ok());
    }

    #[test]
    fn test_no_images_gives_note_archive() {
        let ImagesOutput::Archive(bytes) = package(ExtractReport::default(), ImageMode::Extract).unwrap() else {
            panic!("expected archive");
        };
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert!(archive.by_name(crate::archive::NO_IMAGES_ENTRY).is_ok());
    }

    #[test]
    fn test_remove_mode_decodes_pdf() {
        let report = ExtractReport {
            pdf_data: Some(STANDARD.encode(b"%PDF-1.7")),
            removed_images_count: 4,
            ..Default::default()
        };
        assert!(matches!(
            package(report, ImageMode::Remove).unwrap(),
            ImagesOutput::Pdf(pdf) if pdf == b"%PDF-1.7"
        ));

        assert!(matches!(
            package(ExtractReport::default(), ImageMode::Remove),
            Err(PdfToolError::SubprocessFailure(_))
        ));
    }

    #[test]
    fn test_bad_base64_is_a_helper_failure() {
        let report = ExtractReport {
            images: vec![ExtractedImage {
                data: "***".into(),
                ..image(1, 0, "png", b"")
            }],
            ..Default::default()
        };
        assert!(matches!(
            package(report, ImageMode::Extract),
            Err(PdfToolError::SubprocessFailure(_))
        ));
    }
}
