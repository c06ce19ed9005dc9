//! Run external executables and read their results.
//!
//! Arguments are passed as a vector straight to the OS, never through a
//! shell, so paths and JSON payloads need no quoting. Helpers report back
//! with a single JSON object on stdout of the form
//! `{"success": bool, "error": string?, ...payload}`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{PdfToolError, Result};

/// Default cap on helper stdout, 256 MiB.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 256 * 1024 * 1024;

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub program: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    /// Turn a non-zero exit into `SubprocessFailure`, preferring stderr as
    /// the diagnostic.
    pub fn ensure_success(self) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        let detail = first_non_empty([self.stderr.trim().to_string(), self.stdout_text()])
            .unwrap_or_else(|| "no diagnostic output".to_string());
        Err(PdfToolError::SubprocessFailure(format!(
            "{} exited with {}: {}",
            self.program,
            describe_exit(self.exit_code),
            detail
        )))
    }
}

/// Spawn `program` with `args`, wait for it, and capture both streams.
pub async fn invoke<I, S>(program: impl AsRef<OsStr>, args: I) -> Result<ProcessOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref();
    let name = program.to_string_lossy().into_owned();
    debug!(program = %name, "spawning process");

    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| PdfToolError::SubprocessFailure(format!("failed to start {}: {}", name, e)))?;

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !stderr.trim().is_empty() {
        warn!(program = %name, stderr = %stderr.trim(), "process wrote to stderr");
    }
    debug!(
        program = %name,
        exit_code = ?output.status.code(),
        stdout_bytes = output.stdout.len(),
        "process finished"
    );

    Ok(ProcessOutput {
        program: name,
        exit_code: output.status.code(),
        stdout: output.stdout,
        stderr,
    })
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

/// Decode a helper's JSON envelope into its payload type.
///
/// Oversized output, a non-zero exit, empty output, unparseable JSON and
/// `"success": false` are all reported as `SubprocessFailure`.
pub fn parse_envelope<T: DeserializeOwned>(output: &ProcessOutput, max_output_bytes: usize) -> Result<T> {
    if output.stdout.len() > max_output_bytes {
        return Err(PdfToolError::SubprocessFailure(format!(
            "{} produced {} bytes of output, more than the {} byte limit",
            output.program,
            output.stdout.len(),
            max_output_bytes
        )));
    }

    let stdout = output.stdout_text();
    let envelope = json_line(&stdout);

    if !output.success() {
        let detail = first_non_empty([
            output.stderr.trim().to_string(),
            envelope.as_ref().and_then(|e| e.error.clone()).unwrap_or_default(),
        ])
        .unwrap_or_else(|| "no diagnostic output".to_string());
        return Err(PdfToolError::SubprocessFailure(format!(
            "{} exited with {}: {}",
            output.program,
            describe_exit(output.exit_code),
            detail
        )));
    }

    if stdout.is_empty() {
        let detail = first_non_empty([output.stderr.trim().to_string()])
            .unwrap_or_else(|| "no output".to_string());
        return Err(PdfToolError::SubprocessFailure(format!(
            "{} returned no result: {}",
            output.program, detail
        )));
    }

    let Some(envelope) = envelope else {
        return Err(PdfToolError::SubprocessFailure(format!(
            "{} returned output that is not a JSON result: {}",
            output.program,
            truncate(&stdout, 200)
        )));
    };

    if !envelope.success {
        let detail = first_non_empty([
            envelope.error.unwrap_or_default(),
            output.stderr.trim().to_string(),
        ])
        .unwrap_or_else(|| "unknown error".to_string());
        return Err(PdfToolError::SubprocessFailure(detail));
    }

    serde_json::from_value(Value::Object(envelope.payload)).map_err(|e| {
        PdfToolError::SubprocessFailure(format!("{} returned an unexpected result: {}", output.program, e))
    })
}

/// The whole output, or failing that its last line, as an envelope.
fn json_line(stdout: &str) -> Option<Envelope> {
    serde_json::from_str(stdout).ok().or_else(|| {
        stdout
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .and_then(|line| serde_json::from_str(line.trim()).ok())
    })
}

fn first_non_empty<const N: usize>(candidates: [String; N]) -> Option<String> {
    candidates.into_iter().find(|s| !s.is_empty())
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// A uniquely named file in a scratch directory, removed on drop.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    /// Reserve a name `{uuid}{suffix}` in `dir` without creating the file.
    pub fn new(dir: &Path, suffix: &str) -> Self {
        Self {
            path: dir.join(format!("{}{}", Uuid::new_v4(), suffix)),
        }
    }

    /// Create the file with `contents`.
    pub async fn with_contents(dir: &Path, suffix: &str, contents: &[u8]) -> Result<Self> {
        let file = Self::new(dir, suffix);
        tokio::fs::write(&file.path, contents).await?;
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file back, failing with `SubprocessFailure` when the tool
    /// that was meant to write it did not.
    pub async fn read(&self) -> Result<Vec<u8>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PdfToolError::SubprocessFailure(
                format!("expected output {} was not created", self.path.display()),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove temp file"),
        }
    }
}

/// Locate a bundled helper executable named `name` under `dir`, either
/// directly or in a directory of the same name.
pub fn resolve_helper(dir: &Path, name: &str) -> Result<PathBuf> {
    let file_name = format!("{}{}", name, std::env::consts::EXE_SUFFIX);
    let candidates = [dir.join(&file_name), dir.join(name).join(&file_name)];

    candidates
        .iter()
        .find(|path| path.is_file())
        .cloned()
        .ok_or_else(|| {
            PdfToolError::SubprocessFailure(format!(
                "helper '{}' not found in {}",
                name,
                dir.display()
            ))
        })
}
