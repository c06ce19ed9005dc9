//! Adapters for the external engines: Ghostscript, qpdf and the bundled
//! helper executables.

pub mod extract_images;
pub mod ghostscript;
pub mod qpdf;
pub mod rasterize;
pub mod redact;
pub mod watermark;

use std::ffi::OsString;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::bridge::{invoke, parse_envelope, resolve_helper};
use crate::error::Result;
use crate::toolbox::ToolConfig;

pub const WATERMARK_HELPER: &str = "add_watermark";
pub const REDACT_HELPER: &str = "redact_pdf";
pub const RASTERIZE_HELPER: &str = "convert_pdf_images";
pub const EXTRACT_IMAGES_HELPER: &str = "extract_images";

/// Run bundled helper `name` and decode its JSON envelope.
pub(crate) async fn run_helper<T: DeserializeOwned>(config: &ToolConfig, name: &str, args: Vec<OsString>) -> Result<T> {
    let program = resolve_helper(&config.scripts_dir, name)?;
    let output = invoke(&program, &args).await?;
    // Image payloads can be large; only the head is worth logging
    let head: String = output.stdout_text().chars().take(500).collect();
    debug!(helper = name, stdout = %head, "helper finished");
    parse_envelope(&output, config.max_output_bytes)
}
