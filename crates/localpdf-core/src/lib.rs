//! LocalPDF toolkit core
//!
//! Page selection, request validation and the tool implementations behind
//! the LocalPDF HTTP API:
//! - `page_ranges` / `validation` / `requests`: pure request handling
//! - `engine`: in-process page manipulation on lopdf
//! - `bridge` / `tools`: Ghostscript, qpdf and the bundled helper executables
//! - `toolbox`: runs one request end to end

pub mod archive;
pub mod bridge;
pub mod engine;
pub mod error;
pub mod page_ranges;
pub mod requests;
pub mod toolbox;
pub mod tools;
pub mod validation;

pub use error::{PdfToolError, Result};
pub use page_ranges::{PageSelection, RangeToken};
pub use requests::OperationRequest;
pub use toolbox::{ToolConfig, ToolOutput, Toolbox};
pub use tools::ghostscript::GhostscriptStatus;

/// Parse PDF bytes and return the page count.
pub fn get_page_count(bytes: &[u8]) -> Result<u32> {
    engine::load_bytes(bytes).map(|doc| engine::page_count(&doc))
}
