use std::ffi::OsString;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::{run_helper, REDACT_HELPER};
use crate::bridge::TempFile;
use crate::error::Result;
use crate::toolbox::ToolConfig;
use crate::validation::RedactionArea;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedactReport {
    #[serde(default)]
    pub total_redactions: u32,
    #[serde(default)]
    pub pages_redacted: u32,
    #[serde(default)]
    pub pages_list: Vec<u32>,
}

pub(crate) fn redact_args(areas: &[RedactionArea], input: &Path, output: &Path) -> Result<Vec<OsString>> {
    let redactions = serde_json::to_string(areas)?;
    Ok(vec![
        input.as_os_str().to_owned(),
        output.as_os_str().to_owned(),
        "--redactions".into(),
        redactions.into(),
        "--json".into(),
    ])
}

/// Paint every area opaquely and remove the content beneath it.
pub async fn redact(config: &ToolConfig, input: &Path, areas: &[RedactionArea]) -> Result<(Vec<u8>, RedactReport)> {
    let output = TempFile::new(&config.temp_dir, "_redacted.pdf");
    let args = redact_args(areas, input, output.path())?;

    let report: RedactReport = run_helper(config, REDACT_HELPER, args).await?;
    let bytes = output.read().await?;
    info!(
        redactions = report.total_redactions,
        pages = ?report.pages_list,
        "redaction applied"
    );
    Ok((bytes, report))
}
