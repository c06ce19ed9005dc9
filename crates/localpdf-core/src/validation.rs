//! Request validation shared by every tool entry point
//!
//! These checks run before any PDF is parsed or any helper is spawned.
//! The only filesystem access is the existence check in [`require_file`].

use std::fmt::Display;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PdfToolError, Result};

lazy_static! {
    static ref HEX_COLOR: Regex = Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap();
}

pub const WATERMARK_FONT_SIZE: (u32, u32) = (8, 144);
pub const PAGE_NUMBER_FONT_SIZE: (u32, u32) = (8, 72);
pub const OPACITY: (u32, u32) = (1, 100);
pub const QUALITY: (u32, u32) = (1, 100);
pub const IMAGE_SCALE: (u32, u32) = (10, 100);
pub const MAX_DPI: u32 = 600;
pub const MIN_PASSWORD_LEN: usize = 3;

/// The path must be non-empty and point at an existing file.
pub fn require_file(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(PdfToolError::MissingArgument("filePath".into()));
    }
    let path = Path::new(path);
    if !path.is_file() {
        return Err(PdfToolError::FileNotFound(path.to_path_buf()));
    }
    Ok(())
}

/// Fails with `MissingArgument(field)` when the value is absent or blank.
pub fn require_present<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(PdfToolError::MissingArgument(field.to_string())),
    }
}

/// Inclusive bounds check.
pub fn check_range<T>(field: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + Display + Copy,
{
    if value < min || value > max {
        return Err(PdfToolError::InvalidArgument(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, value
        )));
    }
    Ok(())
}

/// DPI must lie in `(0, 600]`.
pub fn check_dpi(dpi: u32) -> Result<()> {
    if dpi == 0 || dpi > MAX_DPI {
        return Err(PdfToolError::InvalidArgument(format!(
            "dpi must be greater than 0 and at most {}, got {}",
            MAX_DPI, dpi
        )));
    }
    Ok(())
}

pub fn check_hex_color(field: &str, color: &str) -> Result<()> {
    if !HEX_COLOR.is_match(color) {
        return Err(PdfToolError::InvalidArgument(format!(
            "{} must be a hex color like #1A2B3C, got '{}'",
            field, color
        )));
    }
    Ok(())
}

/// One rectangle to black out, in unit-square coordinates of its page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionArea {
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_redaction_color")]
    pub color: String,
}

fn default_redaction_color() -> String {
    "#000000".to_string()
}

/// Validate one redaction rectangle. `total_pages` is checked when known.
pub fn check_redaction_area(index: usize, area: &RedactionArea, total_pages: Option<u32>) -> Result<()> {
    let invalid = |reason: &str| {
        Err(PdfToolError::InvalidArgument(format!(
            "redaction {}: {}",
            index + 1,
            reason
        )))
    };

    if area.page < 1 {
        return invalid("page must be at least 1");
    }
    if let Some(total) = total_pages {
        if area.page > total {
            return Err(PdfToolError::PageOutOfRange {
                token: format!("redaction {}", index + 1),
                page: area.page,
                total,
            });
        }
    }

    let coords = [area.x, area.y, area.width, area.height];
    if coords.iter().any(|v| !v.is_finite()) {
        return invalid("coordinates must be finite numbers");
    }
    if !(0.0..=1.0).contains(&area.x) || !(0.0..=1.0).contains(&area.y) {
        return invalid("x and y must be between 0 and 1");
    }
    if area.width <= 0.0 || area.width > 1.0 || area.height <= 0.0 || area.height > 1.0 {
        return invalid("width and height must be greater than 0 and at most 1");
    }
    if area.x + area.width > 1.0 || area.y + area.height > 1.0 {
        return invalid("area extends beyond the page");
    }

    check_hex_color("color", &area.color)
}

/// A page operation must never produce an empty document.
pub fn ensure_pages_remain(remaining: usize) -> Result<()> {
    if remaining == 0 {
        return Err(PdfToolError::InvalidOperation(
            "the operation would leave the document with no pages".into(),
        ));
    }
    Ok(())
}
