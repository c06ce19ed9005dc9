//! Compression through Ghostscript's `pdfwrite` device.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::bridge::{invoke, TempFile};
use crate::error::{PdfToolError, Result};
use crate::requests::{CompressOptions, CompressionQuality};
use crate::toolbox::ToolConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GhostscriptStatus {
    pub available: bool,
    pub version: Option<String>,
}

/// Outcome of a compression run.
#[derive(Debug, Clone)]
pub struct CompressedPdf {
    pub bytes: Vec<u8>,
    pub original_size: u64,
    pub compressed_size: u64,
    /// Percentage saved, rounded to two decimals. Negative when the output
    /// grew.
    pub ratio: f64,
}

/// Executables to try, in order.
fn candidate_programs(config: &ToolConfig) -> Vec<PathBuf> {
    if let Some(configured) = &config.ghostscript {
        return vec![configured.clone()];
    }
    let names: &[&str] = if cfg!(windows) {
        &["gswin64c.exe", "gswin32c.exe", "gs.exe"]
    } else if cfg!(target_os = "macos") {
        &["/opt/homebrew/bin/gs", "/usr/local/bin/gs", "/opt/local/bin/gs", "gs", "ghostscript"]
    } else {
        &["gs", "ghostscript"]
    };
    names.iter().map(PathBuf::from).collect()
}

/// First Ghostscript that answers `--version`, with that version.
async fn locate(config: &ToolConfig) -> Option<(PathBuf, String)> {
    for program in candidate_programs(config) {
        match invoke(&program, ["--version"]).await {
            Ok(output) if output.success() && !output.stdout_text().is_empty() => {
                let version = output.stdout_text();
                debug!(program = %program.display(), %version, "found ghostscript");
                return Some((program, version));
            }
            Ok(_) => {}
            Err(e) => debug!(program = %program.display(), error = %e, "ghostscript candidate unusable"),
        }
    }
    None
}

pub async fn status(config: &ToolConfig) -> GhostscriptStatus {
    match locate(config).await {
        Some((_, version)) => GhostscriptStatus {
            available: true,
            version: Some(version),
        },
        None => GhostscriptStatus {
            available: false,
            version: None,
        },
    }
}

fn pdf_settings(quality: CompressionQuality) -> &'static str {
    match quality {
        CompressionQuality::High => "prepress",
        CompressionQuality::Low => "screen",
        CompressionQuality::Medium | CompressionQuality::Custom => "ebook",
    }
}

/// Target image resolution for a 1-100 quality value.
fn downsample_dpi(quality: u32) -> u32 {
    match quality {
        q if q >= 80 => 150,
        q if q >= 60 => 120,
        _ => 96,
    }
}

pub(crate) fn compression_args(input: &Path, output: &Path, options: &CompressOptions) -> Vec<OsString> {
    let dpi = downsample_dpi(options.quality_value());

    let mut args: Vec<OsString> = [
        "-dNOPAUSE".to_string(),
        "-dBATCH".to_string(),
        "-dSAFER".to_string(),
        "-dCompatibilityLevel=1.4".to_string(),
        "-dDetectDuplicateImages=true".to_string(),
        "-sDEVICE=pdfwrite".to_string(),
        format!("-dPDFSETTINGS=/{}", pdf_settings(options.quality)),
        "-dEmbedAllFonts=true".to_string(),
        "-dSubsetFonts=true".to_string(),
        "-dColorImageDownsampleType=/Bicubic".to_string(),
        format!("-dColorImageResolution={}", dpi),
        "-dGrayImageDownsampleType=/Bicubic".to_string(),
        format!("-dGrayImageResolution={}", dpi),
        "-dMonoImageDownsampleType=/Bicubic".to_string(),
        format!("-dMonoImageResolution={}", dpi),
    ]
    .into_iter()
    .map(OsString::from)
    .collect();

    let mut output_arg = OsString::from("-sOutputFile=");
    output_arg.push(output);
    args.push(output_arg);
    args.push(input.as_os_str().to_owned());
    args
}

fn compression_ratio(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    let ratio = (original as f64 - compressed as f64) / original as f64 * 100.0;
    (ratio * 100.0).round() / 100.0
}

pub async fn compress(config: &ToolConfig, input: &Path, options: &CompressOptions) -> Result<CompressedPdf> {
    let (program, version) = locate(config).await.ok_or_else(|| {
        PdfToolError::SubprocessFailure(
            "Ghostscript is not available. Please install Ghostscript to use compression features.".into(),
        )
    })?;

    let original_size = tokio::fs::metadata(input).await?.len();
    let output = TempFile::new(&config.temp_dir, "_compressed.pdf");

    info!(
        file = %input.display(),
        quality = ?options.quality,
        ghostscript = %version,
        "compressing PDF"
    );
    invoke(&program, compression_args(input, output.path(), options))
        .await?
        .ensure_success()?;

    let bytes = output.read().await?;
    let compressed_size = bytes.len() as u64;
    let ratio = compression_ratio(original_size, compressed_size);
    info!(original_size, compressed_size, ratio, "compression finished");

    Ok(CompressedPdf {
        bytes,
        original_size,
        compressed_size,
        ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(quality: CompressionQuality, custom: Option<u32>) -> CompressOptions {
        CompressOptions {
            quality,
            custom_quality: custom,
        }
    }

    fn arg_strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_dpi_follows_quality() {
        assert_eq!(downsample_dpi(90), 150);
        assert_eq!(downsample_dpi(80), 150);
        assert_eq!(downsample_dpi(75), 120);
        assert_eq!(downsample_dpi(59), 96);
    }

    #[test]
    fn test_args_for_low_quality() {
        let args = arg_strings(&compression_args(
            Path::new("/in/a b.pdf"),
            Path::new("/tmp/out.pdf"),
            &options(CompressionQuality::Low, None),
        ));
        assert!(args.contains(&"-dPDFSETTINGS=/screen".to_string()));
        assert!(args.contains(&"-dColorImageResolution=96".to_string()));
        assert_eq!(args[args.len() - 2], "-sOutputFile=/tmp/out.pdf");
        assert_eq!(args.last().unwrap(), "/in/a b.pdf");
    }

    #[test]
    fn test_args_for_custom_quality() {
        let args = arg_strings(&compression_args(
            Path::new("in.pdf"),
            Path::new("out.pdf"),
            &options(CompressionQuality::Custom, Some(85)),
        ));
        assert!(args.contains(&"-dPDFSETTINGS=/ebook".to_string()));
        assert!(args.contains(&"-dMonoImageResolution=150".to_string()));
    }

    #[test]
    fn test_ratio() {
        assert_eq!(compression_ratio(1000, 250), 75.0);
        assert_eq!(compression_ratio(3, 2), 33.33);
        assert_eq!(compression_ratio(0, 10), 0.0);
        assert!(compression_ratio(100, 150) < 0.0);
    }

    #[test]
    fn test_configured_program_is_the_only_candidate() {
        let config = ToolConfig {
            ghostscript: Some(PathBuf::from("/opt/gs/bin/gs")),
            ..Default::default()
        };
        assert_eq!(candidate_programs(&config), vec![PathBuf::from("/opt/gs/bin/gs")]);
    }

    #[tokio::test]
    async fn test_missing_ghostscript_reports_unavailable() {
        let config = ToolConfig {
            ghostscript: Some(PathBuf::from("localpdf-no-such-gs")),
            ..Default::default()
        };
        assert_eq!(
            status(&config).await,
            GhostscriptStatus {
                available: false,
                version: None
            }
        );

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        std::fs::write(&input, b"%PDF-1.4").unwrap();
        let result = compress(&config, &input, &options(CompressionQuality::Medium, None)).await;
        assert!(matches!(result, Err(PdfToolError::SubprocessFailure(msg)) if msg.contains("not available")));
    }
}
