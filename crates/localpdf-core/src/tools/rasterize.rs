use std::ffi::OsString;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::{run_helper, RASTERIZE_HELPER};
use crate::bridge::TempFile;
use crate::error::Result;
use crate::requests::PdfToImageRequest;
use crate::toolbox::ToolConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RasterizeReport {
    #[serde(default)]
    pub page_count: u32,
}

pub(crate) fn rasterize_args(request: &PdfToImageRequest, input: &Path, output_zip: &Path) -> Vec<OsString> {
    let mut args = vec![
        input.as_os_str().to_owned(),
        output_zip.as_os_str().to_owned(),
        "--dpi".into(),
        request.dpi.to_string().into(),
        "--format".into(),
        request.format.extension().into(),
        "--json".into(),
    ];
    if request.include_page_numbers {
        args.push("--include-page-numbers".into());
    }
    args
}

/// Render every page to an image; returns the ZIP the helper wrote.
pub async fn pdf_to_images(config: &ToolConfig, request: &PdfToImageRequest) -> Result<Vec<u8>> {
    let output = TempFile::new(&config.temp_dir, "_pdf_images.zip");
    let args = rasterize_args(request, Path::new(&request.file_path), output.path());

    let report: RasterizeReport = run_helper(config, RASTERIZE_HELPER, args).await?;
    let zip = output.read().await?;
    info!(
        pages = report.page_count,
        format = request.format.extension(),
        dpi = request.dpi,
        size_kb = zip.len() / 1024,
        "pages rendered to images"
    );
    Ok(zip)
}
