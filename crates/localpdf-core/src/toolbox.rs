//! Runs one [`OperationRequest`] end to end.
//!
//! lopdf work happens on the blocking pool; external tools are awaited on
//! the runtime. Every result is either a file to download or a JSON body.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::archive::zip_entries;
use crate::bridge::DEFAULT_MAX_OUTPUT_BYTES;
use crate::engine::{self, ImagePdf};
use crate::error::{PdfToolError, Result};
use crate::page_ranges::{expand_every_nth, expand_parity, parse_comma_list, union, PageSelection};
use crate::requests::*;
use crate::tools::extract_images::{process_images, ImagesOutput};
use crate::tools::ghostscript::{self, GhostscriptStatus};
use crate::tools::{qpdf, rasterize, redact, watermark};
use crate::validation::check_redaction_area;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Where the external tools live and how far to trust their output.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Ghostscript executable; searched for on the platform's usual names
    /// when unset.
    pub ghostscript: Option<PathBuf>,
    pub qpdf: PathBuf,
    /// Directory holding the bundled helper executables.
    pub scripts_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub max_output_bytes: usize,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ghostscript: None,
            qpdf: PathBuf::from("qpdf"),
            scripts_dir: PathBuf::from("scripts"),
            temp_dir: std::env::temp_dir(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ToolOutput {
    File {
        bytes: Vec<u8>,
        file_name: String,
        content_type: &'static str,
        headers: Vec<(String, String)>,
    },
    Json(serde_json::Value),
}

impl ToolOutput {
    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        ToolOutput::File {
            bytes,
            file_name: file_name.into(),
            content_type: PDF_CONTENT_TYPE,
            headers: Vec::new(),
        }
    }

    pub fn zip(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        ToolOutput::File {
            bytes,
            file_name: file_name.into(),
            content_type: ZIP_CONTENT_TYPE,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl ToString) -> Self {
        if let ToolOutput::File { headers, .. } = &mut self {
            headers.push((name.to_string(), value.to_string()));
        }
        self
    }
}

/// File name without directory or extension.
pub fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document")
        .to_string()
}

async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| PdfToolError::Unexpected(format!("worker task failed: {}", e)))?
}

/// Load `path` and run `edit` on it, returning the saved bytes.
async fn edit_document<F>(path: &str, edit: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut lopdf::Document) -> Result<()> + Send + 'static,
{
    let path = PathBuf::from(path);
    blocking(move || {
        let mut doc = engine::load(&path)?;
        edit(&mut doc)?;
        engine::save(&mut doc)
    })
    .await
}

async fn count_pages(path: &str) -> Result<u32> {
    let path = PathBuf::from(path);
    blocking(move || engine::load(&path).map(|doc| engine::page_count(&doc))).await
}

/// Pages named by an explicit list and/or range strings.
pub(crate) fn listed_pages(pages: Option<&[u32]>, ranges: Option<&[String]>, total_pages: u32) -> Result<PageSelection> {
    let mut selections = Vec::new();
    if let Some(pages) = pages.filter(|p| !p.is_empty()) {
        selections.push(PageSelection::from_pages(pages.iter().copied(), total_pages)?);
    }
    for range in ranges.unwrap_or_default() {
        selections.push(parse_comma_list(range, total_pages)?);
    }
    union(total_pages, selections)
}

/// Every page matched by any removal criterion.
pub(crate) fn removal_selection(options: &RemoveOptions, total_pages: u32) -> Result<PageSelection> {
    let mut selection = listed_pages(options.pages.as_deref(), options.page_ranges.as_deref(), total_pages)?;
    selection = selection.union(&expand_parity(
        total_pages,
        options.remove_even_pages,
        options.remove_odd_pages,
    ))?;
    if let Some(n) = options.remove_every_nth_page {
        selection = selection.union(&expand_every_nth(total_pages, n, options.start_from_page)?)?;
    }
    Ok(selection)
}

pub(crate) fn crop_selection(request: &CropRequest, total_pages: u32) -> Result<PageSelection> {
    match request.pages_range {
        CropScope::All => Ok(PageSelection::all(total_pages)),
        CropScope::Current => {
            let page = request
                .current_page
                .ok_or_else(|| PdfToolError::MissingArgument("currentPage".into()))?;
            PageSelection::from_pages([page], total_pages)
        }
        CropScope::Custom => {
            let pages = request
                .custom_pages
                .as_deref()
                .ok_or_else(|| PdfToolError::MissingArgument("customPages".into()))?;
            parse_comma_list(pages, total_pages)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toolbox {
    config: Arc<ToolConfig>,
}

impl Toolbox {
    pub fn new(config: ToolConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    pub async fn ghostscript_status(&self) -> GhostscriptStatus {
        ghostscript::status(&self.config).await
    }

    /// Validate and execute `request`.
    pub async fn run(&self, request: OperationRequest) -> Result<ToolOutput> {
        request.validate()?;
        info!(operation = request.name(), "running tool");

        match request {
            OperationRequest::AddPageNumbers(r) => self.add_page_numbers(r).await,
            OperationRequest::Crop(r) => self.crop(r).await,
            OperationRequest::Metadata(r) => self.metadata(r).await,
            OperationRequest::LockUnlock(r) => self.lock_unlock(r).await,
            OperationRequest::Merge(r) => self.merge(r).await,
            OperationRequest::Organize(r) => self.organize(r).await,
            OperationRequest::Remove(r) => self.remove(r).await,
            OperationRequest::Split(r) => self.split(r).await,
            OperationRequest::Compress(r) => self.compress(r).await,
            OperationRequest::ExtractImages(r) => self.extract_images(r).await,
            OperationRequest::PdfToImage(r) => self.pdf_to_image(r).await,
            OperationRequest::Redact(r) => self.redact(r).await,
            OperationRequest::Watermark(r) => self.watermark(r).await,
            OperationRequest::ImageToPdf(r) => self.image_to_pdf(r).await,
        }
    }

    async fn add_page_numbers(&self, request: AddPageNumbersRequest) -> Result<ToolOutput> {
        let name = format!("{}_numbered.pdf", file_stem(&request.file_path));
        let path = request.file_path.clone();
        let bytes = edit_document(&path, move |doc| engine::add_page_numbers(doc, &request).map(|_| ())).await?;
        Ok(ToolOutput::pdf(name, bytes))
    }

    async fn crop(&self, request: CropRequest) -> Result<ToolOutput> {
        let name = format!("{}_cropped.pdf", file_stem(&request.file_path));
        let path = request.file_path.clone();
        let bytes = edit_document(&path, move |doc| {
            let selection = crop_selection(&request, engine::page_count(doc))?;
            engine::crop_pages(doc, &selection, &request.margins).map(|_| ())
        })
        .await?;
        Ok(ToolOutput::pdf(name, bytes))
    }

    async fn metadata(&self, request: MetadataRequest) -> Result<ToolOutput> {
        match request.operation {
            MetadataOperation::Read => {
                let path = PathBuf::from(&request.file_path);
                let metadata = blocking(move || engine::load(&path).map(|doc| engine::read_metadata(&doc))).await?;
                Ok(ToolOutput::Json(json!({
                    "success": true,
                    "metadata": metadata,
                    "message": "Metadata retrieved successfully",
                })))
            }
            MetadataOperation::Write => {
                let name = format!("{}_metadata.pdf", file_stem(&request.file_path));
                let metadata = request
                    .metadata
                    .ok_or_else(|| PdfToolError::MissingArgument("metadata".into()))?;
                let bytes = edit_document(&request.file_path, move |doc| engine::write_metadata(doc, &metadata)).await?;
                Ok(ToolOutput::pdf(name, bytes))
            }
        }
    }

    async fn lock_unlock(&self, request: LockUnlockRequest) -> Result<ToolOutput> {
        let stem = file_stem(&request.file_path);
        let input = Path::new(&request.file_path);
        match request.operation {
            LockOperation::Lock => {
                let options = request
                    .lock_options
                    .as_ref()
                    .ok_or_else(|| PdfToolError::MissingArgument("lockOptions".into()))?;
                let bytes = qpdf::lock(&self.config, input, options).await?;
                Ok(ToolOutput::pdf(format!("{}_locked.pdf", stem), bytes))
            }
            LockOperation::Unlock => {
                let options = request
                    .unlock_options
                    .as_ref()
                    .ok_or_else(|| PdfToolError::MissingArgument("unlockOptions".into()))?;
                let bytes = qpdf::unlock(&self.config, input, options).await?;
                Ok(ToolOutput::pdf(format!("{}_unlocked.pdf", stem), bytes))
            }
        }
    }

    async fn merge(&self, request: MergeRequest) -> Result<ToolOutput> {
        let files = request.files;
        let bytes = blocking(move || {
            let documents = files
                .iter()
                .map(|file| engine::load(Path::new(file)))
                .collect::<Result<Vec<_>>>()?;
            let mut merged = engine::merge_documents(documents)?;
            info!(files = files.len(), pages = engine::page_count(&merged), "documents merged");
            engine::save(&mut merged)
        })
        .await?;
        Ok(ToolOutput::pdf("merged.pdf", bytes))
    }

    async fn organize(&self, request: OrganizeRequest) -> Result<ToolOutput> {
        let name = format!("{}_organized.pdf", file_stem(&request.file_path));
        let path = PathBuf::from(&request.file_path);
        let order = request.options.map(|o| o.page_order).unwrap_or_default();
        let bytes = blocking(move || {
            let doc = engine::load(&path)?;
            let mut organized = engine::organize(&doc, &order)?;
            engine::save(&mut organized)
        })
        .await?;
        Ok(ToolOutput::pdf(name, bytes))
    }

    async fn remove(&self, request: RemoveRequest) -> Result<ToolOutput> {
        let name = format!("{}_removed_pages.pdf", file_stem(&request.file_path));
        let path = PathBuf::from(&request.file_path);
        let options = request.options;
        let bytes = blocking(move || {
            let doc = engine::load(&path)?;
            let selection = removal_selection(&options, engine::page_count(&doc))?;
            info!(pages = %selection, "removing pages");
            let mut remaining = engine::remove_pages(&doc, &selection)?;
            engine::save(&mut remaining)
        })
        .await?;
        Ok(ToolOutput::pdf(name, bytes))
    }

    async fn split(&self, request: SplitRequest) -> Result<ToolOutput> {
        let stem = file_stem(&request.file_path);
        let name = format!("{}_split.zip", stem);
        let path = PathBuf::from(&request.file_path);
        let bytes = blocking(move || {
            let doc = engine::load(&path)?;
            let parts = engine::split_document(&doc, &stem, request.method, &request.options)?;
            info!(parts = parts.len(), "document split");
            zip_entries(parts.into_iter().map(|part| (part.file_name, part.bytes)))
        })
        .await?;
        Ok(ToolOutput::zip(name, bytes))
    }

    async fn compress(&self, request: CompressRequest) -> Result<ToolOutput> {
        let name = format!("{}_compressed.pdf", file_stem(&request.file_path));
        let result = ghostscript::compress(&self.config, Path::new(&request.file_path), &request.options).await?;
        Ok(ToolOutput::pdf(name, result.bytes)
            .with_header("X-Original-Size", result.original_size)
            .with_header("X-Compressed-Size", result.compressed_size)
            .with_header("X-Compression-Ratio", result.ratio))
    }

    async fn extract_images(&self, request: ExtractImagesRequest) -> Result<ToolOutput> {
        let options = request
            .options
            .ok_or_else(|| PdfToolError::MissingArgument("options".into()))?;

        let has_pages = options.pages.as_ref().is_some_and(|p| !p.is_empty())
            || options.page_ranges.as_ref().is_some_and(|r| !r.is_empty());
        let selection = if has_pages {
            let total = count_pages(&request.file_path).await?;
            listed_pages(options.pages.as_deref(), options.page_ranges.as_deref(), total)?
        } else {
            PageSelection::empty(0)
        };

        match process_images(&self.config, &request.file_path, &selection, options.mode).await? {
            ImagesOutput::Archive(zip) => Ok(ToolOutput::zip("extracted_images.zip", zip)),
            ImagesOutput::Pdf(pdf) => Ok(ToolOutput::pdf("images_removed.pdf", pdf)),
        }
    }

    async fn pdf_to_image(&self, request: PdfToImageRequest) -> Result<ToolOutput> {
        let name = format!("{}_images.zip", file_stem(&request.file_path));
        let zip = rasterize::pdf_to_images(&self.config, &request).await?;
        Ok(ToolOutput::zip(name, zip))
    }

    async fn redact(&self, request: RedactRequest) -> Result<ToolOutput> {
        let name = format!("{}_redacted.pdf", file_stem(&request.file_path));
        let total = count_pages(&request.file_path).await?;
        request
            .redactions
            .iter()
            .enumerate()
            .try_for_each(|(index, area)| check_redaction_area(index, area, Some(total)))?;

        let (bytes, _) = redact::redact(&self.config, Path::new(&request.file_path), &request.redactions).await?;
        Ok(ToolOutput::pdf(name, bytes))
    }

    async fn watermark(&self, request: WatermarkRequest) -> Result<ToolOutput> {
        let name = format!("{}_watermarked.pdf", file_stem(&request.file_path));
        let custom_pages = match (request.pages_range, request.custom_pages.as_deref()) {
            (PagesRange::Custom, Some(pages)) => {
                let total = count_pages(&request.file_path).await?;
                Some(parse_comma_list(pages, total)?.to_range_string())
            }
            _ => None,
        };

        let (bytes, _) = watermark::add_watermark(&self.config, &request, custom_pages.as_deref()).await?;
        Ok(ToolOutput::pdf(name, bytes))
    }

    async fn image_to_pdf(&self, request: ImageToPdfRequest) -> Result<ToolOutput> {
        match blocking(move || engine::images_to_pdf(&request)).await? {
            ImagePdf::Merged(bytes) => Ok(ToolOutput::pdf("converted.pdf", bytes)),
            ImagePdf::Separate(files) => Ok(ToolOutput::zip("converted_images.zip", zip_entries(files)?)),
        }
    }
}
