use std::ffi::OsString;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::{run_helper, WATERMARK_HELPER};
use crate::bridge::TempFile;
use crate::error::Result;
use crate::requests::WatermarkRequest;
use crate::toolbox::ToolConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatermarkReport {
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub watermarked_pages: u32,
}

/// Helper command line. `custom_pages` is the already validated page list.
pub(crate) fn watermark_args(
    request: &WatermarkRequest,
    custom_pages: Option<&str>,
    input: &Path,
    output: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![input.as_os_str().to_owned(), output.as_os_str().to_owned()];
    let options = [
        ("--watermark-type", request.kind.as_str().to_string()),
        ("--text", request.text.clone()),
        ("--position", request.position.as_str().to_string()),
        ("--rotation", request.rotation.to_string()),
        ("--opacity", request.opacity.to_string()),
        ("--font-size", request.font_size.to_string()),
        ("--text-color", request.text_color.clone()),
        ("--image-scale", request.image_scale.to_string()),
        ("--start-page", request.start_page.to_string()),
        ("--end-page", request.end_page.to_string()),
        ("--pages-range", request.pages_range.as_str().to_string()),
    ];
    for (flag, value) in options {
        args.push(flag.into());
        args.push(value.into());
    }
    args.push("--json".into());

    if let Some(image_path) = request.image_path.as_deref().filter(|p| !p.is_empty()) {
        args.push("--image-path".into());
        args.push(image_path.into());
    }
    if let Some(pages) = custom_pages {
        args.push("--custom-pages".into());
        args.push(pages.into());
    }
    args
}

pub async fn add_watermark(
    config: &ToolConfig,
    request: &WatermarkRequest,
    custom_pages: Option<&str>,
) -> Result<(Vec<u8>, WatermarkReport)> {
    let output = TempFile::new(&config.temp_dir, "_watermarked.pdf");
    let args = watermark_args(request, custom_pages, Path::new(&request.file_path), output.path());

    let report: WatermarkReport = run_helper(config, WATERMARK_HELPER, args).await?;
    let bytes = output.read().await?;
    info!(
        kind = request.kind.as_str(),
        pages = report.page_count,
        watermarked = report.watermarked_pages,
        size_kb = bytes.len() / 1024,
        "watermark added"
    );
    Ok((bytes, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::{PagesRange, WatermarkKind, WatermarkPosition};

    fn request() -> WatermarkRequest {
        serde_json::from_value(serde_json::json!({ "filePath": "/docs/in.pdf" })).unwrap()
    }

    fn value_after(args: &[OsString], flag: &str) -> Option<String> {
        let index = args.iter().position(|a| a == flag)?;
        args.get(index + 1).map(|a| a.to_string_lossy().into_owned())
    }

    #[test]
    fn test_text_watermark_args_use_defaults() {
        let args = watermark_args(&request(), None, Path::new("/docs/in.pdf"), Path::new("/tmp/out.pdf"));
        assert_eq!(args[0], "/docs/in.pdf");
        assert_eq!(args[1], "/tmp/out.pdf");
        assert_eq!(value_after(&args, "--watermark-type").as_deref(), Some("text"));
        assert_eq!(value_after(&args, "--text").as_deref(), Some("CONFIDENTIAL"));
        assert_eq!(value_after(&args, "--position").as_deref(), Some("Center"));
        assert_eq!(value_after(&args, "--rotation").as_deref(), Some("45"));
        assert_eq!(value_after(&args, "--text-color").as_deref(), Some("#3498db"));
        assert_eq!(value_after(&args, "--pages-range").as_deref(), Some("all"));
        assert!(args.iter().any(|a| a == "--json"));
        assert!(!args.iter().any(|a| a == "--image-path" || a == "--custom-pages"));
    }

    #[test]
    fn test_text_with_spaces_stays_one_argument() {
        let mut req = request();
        req.text = "DO NOT \"COPY\"".into();
        let args = watermark_args(&req, None, Path::new("in.pdf"), Path::new("out.pdf"));
        assert_eq!(value_after(&args, "--text").as_deref(), Some("DO NOT \"COPY\""));
    }

    #[test]
    fn test_image_watermark_with_custom_pages() {
        let mut req = request();
        req.kind = WatermarkKind::Image;
        req.position = WatermarkPosition::Tiled;
        req.pages_range = PagesRange::Custom;
        req.image_path = Some("/tmp/logo.png".into());

        let args = watermark_args(&req, Some("1-3,7"), Path::new("in.pdf"), Path::new("out.pdf"));
        assert_eq!(value_after(&args, "--watermark-type").as_deref(), Some("image"));
        assert_eq!(value_after(&args, "--position").as_deref(), Some("Tiled"));
        assert_eq!(value_after(&args, "--image-path").as_deref(), Some("/tmp/logo.png"));
        assert_eq!(value_after(&args, "--custom-pages").as_deref(), Some("1-3,7"));
    }
}
