//! Per-tool request models
//!
//! Each tool gets its own request struct deserialized from camelCase JSON.
//! Mode strings ("lock"/"unlock", "extract"/"remove", "read"/"write", ...)
//! are closed enums, so an unknown mode fails deserialization instead of
//! reaching a tool. [`OperationRequest`] wraps every request so callers can
//! validate and dispatch them uniformly.
//!
//! `validate()` covers everything that can be checked without opening the
//! PDF. Checks that need the page count (custom page lists, split points)
//! run once the document is loaded.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PdfToolError, Result};
use crate::validation::{
    check_dpi, check_hex_color, check_range, check_redaction_area, require_file, require_present,
    RedactionArea, IMAGE_SCALE, MIN_PASSWORD_LEN, OPACITY, PAGE_NUMBER_FONT_SIZE, QUALITY,
    WATERMARK_FONT_SIZE,
};

/// An enum value as it arrives on the wire: the variant name, or its
/// zero-based index in declaration order.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NameOrIndex {
    Index(u32),
    Name(String),
}

impl std::fmt::Display for NameOrIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameOrIndex::Index(index) => write!(f, "{}", index),
            NameOrIndex::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// `TryFrom<NameOrIndex>` for a unit enum; variants must be listed in
/// declaration order.
macro_rules! name_or_index {
    ($ty:ident, $field:literal, [$($variant:ident),+ $(,)?]) => {
        impl TryFrom<NameOrIndex> for $ty {
            type Error = PdfToolError;

            fn try_from(value: NameOrIndex) -> Result<Self> {
                const VARIANTS: &[(&str, $ty)] = &[$((stringify!($variant), $ty::$variant)),+];
                let found = match &value {
                    NameOrIndex::Index(index) => VARIANTS.get(*index as usize),
                    NameOrIndex::Name(name) => VARIANTS
                        .iter()
                        .find(|(variant, _)| variant.eq_ignore_ascii_case(name.trim())),
                };
                found.map(|&(_, variant)| variant).ok_or_else(|| {
                    PdfToolError::InvalidArgument(format!("{} has no option {}", $field, value))
                })
            }
        }
    };
}

/// Image extensions accepted by image-to-PDF.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

// ============================================================================
// Shared enums
// ============================================================================

/// Which pages a watermark is applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PagesRange {
    #[default]
    All,
    First,
    Last,
    Custom,
}

impl PagesRange {
    pub fn as_str(self) -> &'static str {
        match self {
            PagesRange::All => "all",
            PagesRange::First => "first",
            PagesRange::Last => "last",
            PagesRange::Custom => "custom",
        }
    }
}

/// Which pages a crop is applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropScope {
    #[default]
    All,
    Current,
    Custom,
}

// ============================================================================
// Add page numbers
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NameOrIndex")]
pub enum PageNumberPosition {
    TopLeft,
    TopCenter,
    TopRight,
    BottomLeft,
    #[default]
    BottomCenter,
    BottomRight,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NameOrIndex")]
pub enum PageNumberFormat {
    /// `7`
    #[default]
    Number,
    /// `Page 7 of 12`
    PageOfTotal,
    /// `-7-`
    NumberWithDash,
    /// `vii`
    RomanLower,
    /// `VII`
    RomanUpper,
}

name_or_index!(
    PageNumberPosition,
    "position",
    [TopLeft, TopCenter, TopRight, BottomLeft, BottomCenter, BottomRight]
);
name_or_index!(
    PageNumberFormat,
    "format",
    [Number, PageOfTotal, NumberWithDash, RomanLower, RomanUpper]
);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPageNumbersRequest {
    pub file_path: String,
    #[serde(default)]
    pub position: PageNumberPosition,
    #[serde(default)]
    pub format: PageNumberFormat,
    #[serde(default = "default_page_number_font_size")]
    pub font_size: u32,
    #[serde(default = "default_one")]
    pub start_page: u32,
    #[serde(default = "default_one")]
    pub start_number: u32,
}

impl AddPageNumbersRequest {
    pub fn validate(&self) -> Result<()> {
        require_file(&self.file_path)?;
        let (min, max) = PAGE_NUMBER_FONT_SIZE;
        check_range("fontSize", self.font_size, min, max)?;
        if self.start_page < 1 {
            return Err(PdfToolError::InvalidArgument("startPage must be at least 1".into()));
        }
        if self.start_number < 1 {
            return Err(PdfToolError::InvalidArgument("startNumber must be at least 1".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Crop
// ============================================================================

/// Margins in PDF points, trimmed from each edge of the MediaBox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropMargins {
    #[serde(default)]
    pub top: f32,
    #[serde(default)]
    pub right: f32,
    #[serde(default)]
    pub bottom: f32,
    #[serde(default)]
    pub left: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropRequest {
    pub file_path: String,
    #[serde(default)]
    pub pages_range: CropScope,
    #[serde(default)]
    pub custom_pages: Option<String>,
    #[serde(default)]
    pub margins: CropMargins,
    #[serde(default)]
    pub current_page: Option<u32>,
}

impl CropRequest {
    pub fn validate(&self) -> Result<()> {
        require_file(&self.file_path)?;

        let m = &self.margins;
        for (field, value) in [("top", m.top), ("right", m.right), ("bottom", m.bottom), ("left", m.left)] {
            if !value.is_finite() || value < 0.0 {
                return Err(PdfToolError::InvalidArgument(format!(
                    "margins.{} must be a non-negative number",
                    field
                )));
            }
        }

        match self.pages_range {
            CropScope::All => Ok(()),
            CropScope::Custom => require_present("customPages", self.custom_pages.as_deref()).map(|_| ()),
            CropScope::Current => match self.current_page {
                Some(_) => Ok(()),
                None => Err(PdfToolError::MissingArgument("currentPage".into())),
            },
        }
    }
}

// ============================================================================
// Metadata
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataOperation {
    Read,
    Write,
}

/// Document information fields. `None` on write removes the entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub producer: Option<String>,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub modification_date: Option<String>,
    #[serde(default)]
    pub page_count: u32,
}

impl PdfMetadata {
    /// True when none of the descriptive text fields carry a value.
    pub fn is_empty(&self) -> bool {
        [
            &self.title,
            &self.author,
            &self.subject,
            &self.keywords,
            &self.creator,
            &self.producer,
        ]
        .iter()
        .all(|field| field.as_deref().map_or(true, str::is_empty))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRequest {
    pub file_path: String,
    pub operation: MetadataOperation,
    #[serde(default)]
    pub metadata: Option<PdfMetadata>,
}

impl MetadataRequest {
    pub fn validate(&self) -> Result<()> {
        require_file(&self.file_path)?;
        if self.operation == MetadataOperation::Write && self.metadata.is_none() {
            return Err(PdfToolError::MissingArgument("metadata".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Lock / unlock
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockOperation {
    Lock,
    Unlock,
}

/// Encryption strength; travels as the number 40 or 128.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum EncryptionLevel {
    Bits40,
    #[default]
    Bits128,
}

impl EncryptionLevel {
    pub fn bits(self) -> u32 {
        match self {
            EncryptionLevel::Bits40 => 40,
            EncryptionLevel::Bits128 => 128,
        }
    }
}

impl TryFrom<u32> for EncryptionLevel {
    type Error = PdfToolError;

    fn try_from(bits: u32) -> Result<Self> {
        match bits {
            40 => Ok(EncryptionLevel::Bits40),
            128 => Ok(EncryptionLevel::Bits128),
            other => Err(PdfToolError::InvalidArgument(format!(
                "encryptionLevel must be 40 or 128, got {}",
                other
            ))),
        }
    }
}

impl From<EncryptionLevel> for u32 {
    fn from(level: EncryptionLevel) -> Self {
        level.bits()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockOptions {
    pub open_password: String,
    #[serde(default)]
    pub encryption_level: EncryptionLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockOptions {
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockUnlockRequest {
    pub file_path: String,
    pub operation: LockOperation,
    #[serde(default)]
    pub lock_options: Option<LockOptions>,
    #[serde(default)]
    pub unlock_options: Option<UnlockOptions>,
}

impl LockUnlockRequest {
    pub fn validate(&self) -> Result<()> {
        require_file(&self.file_path)?;
        match self.operation {
            LockOperation::Lock => {
                let options = self
                    .lock_options
                    .as_ref()
                    .ok_or_else(|| PdfToolError::MissingArgument("lockOptions".into()))?;
                let password = require_present("openPassword", Some(options.open_password.as_str()))?;
                if password.chars().count() < MIN_PASSWORD_LEN {
                    return Err(PdfToolError::InvalidArgument(format!(
                        "openPassword must be at least {} characters long",
                        MIN_PASSWORD_LEN
                    )));
                }
            }
            LockOperation::Unlock => {
                let options = self
                    .unlock_options
                    .as_ref()
                    .ok_or_else(|| PdfToolError::MissingArgument("unlockOptions".into()))?;
                require_present("password", Some(options.password.as_str()))?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Merge
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    #[serde(default)]
    pub files: Vec<String>,
}

impl MergeRequest {
    pub fn validate(&self) -> Result<()> {
        if self.files.is_empty() {
            return Err(PdfToolError::MissingArgument("files".into()));
        }
        self.files.iter().try_for_each(|file| require_file(file))
    }
}

// ============================================================================
// Organize
// ============================================================================

/// One output page: which original page, and how much to turn it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInstruction {
    pub page_number: u32,
    #[serde(default)]
    pub rotation: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizeOptions {
    #[serde(default)]
    pub page_order: Vec<PageInstruction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizeRequest {
    pub file_path: String,
    #[serde(default)]
    pub options: Option<OrganizeOptions>,
}

impl OrganizeRequest {
    pub fn validate(&self) -> Result<()> {
        require_file(&self.file_path)?;
        let order = self
            .options
            .as_ref()
            .map(|o| o.page_order.as_slice())
            .unwrap_or_default();
        if order.is_empty() {
            return Err(PdfToolError::MissingArgument("pageOrder".into()));
        }
        for instruction in order {
            if instruction.rotation % 90 != 0 {
                return Err(PdfToolError::InvalidArgument(format!(
                    "rotation must be a multiple of 90 degrees, got {}",
                    instruction.rotation
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Remove
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveOptions {
    #[serde(default)]
    pub pages: Option<Vec<u32>>,
    #[serde(default)]
    pub page_ranges: Option<Vec<String>>,
    #[serde(default)]
    pub remove_even_pages: bool,
    #[serde(default)]
    pub remove_odd_pages: bool,
    #[serde(default)]
    pub remove_every_nth_page: Option<u32>,
    #[serde(default)]
    pub start_from_page: Option<u32>,
}

impl RemoveOptions {
    /// False when no criterion would select a single page.
    pub fn has_removal_criteria(&self) -> bool {
        self.pages.as_ref().is_some_and(|p| !p.is_empty())
            || self
                .page_ranges
                .as_ref()
                .is_some_and(|r| r.iter().any(|s| !s.trim().is_empty()))
            || self.remove_even_pages
            || self.remove_odd_pages
            || self.remove_every_nth_page.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRequest {
    pub file_path: String,
    #[serde(default)]
    pub options: RemoveOptions,
}

impl RemoveRequest {
    pub fn validate(&self) -> Result<()> {
        require_file(&self.file_path)?;
        if !self.options.has_removal_criteria() {
            return Err(PdfToolError::MissingArgument(
                "at least one of pages, pageRanges, removeEvenPages, removeOddPages or removeEveryNthPage".into(),
            ));
        }
        if self.options.remove_every_nth_page == Some(0) {
            return Err(PdfToolError::InvalidArgument(
                "removeEveryNthPage must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Split
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NameOrIndex")]
pub enum SplitMethod {
    ByPageRanges,
    AtSpecificPages,
    EveryNPages,
    ExtractAllPages,
}

name_or_index!(
    SplitMethod,
    "method",
    [ByPageRanges, AtSpecificPages, EveryNPages, ExtractAllPages]
);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitOptions {
    #[serde(default)]
    pub page_ranges: Option<Vec<String>>,
    #[serde(default)]
    pub split_pages: Option<Vec<u32>>,
    #[serde(default)]
    pub page_interval: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitRequest {
    pub file_path: String,
    pub method: SplitMethod,
    #[serde(default)]
    pub options: SplitOptions,
}

impl SplitRequest {
    pub fn validate(&self) -> Result<()> {
        require_file(&self.file_path)?;
        let options = &self.options;
        match self.method {
            SplitMethod::ByPageRanges => {
                if options.page_ranges.as_ref().map_or(true, Vec::is_empty) {
                    return Err(PdfToolError::MissingArgument("pageRanges".into()));
                }
            }
            SplitMethod::AtSpecificPages => {
                if options.split_pages.as_ref().map_or(true, Vec::is_empty) {
                    return Err(PdfToolError::MissingArgument("splitPages".into()));
                }
            }
            SplitMethod::EveryNPages => match options.page_interval {
                None => return Err(PdfToolError::MissingArgument("pageInterval".into())),
                Some(0) => {
                    return Err(PdfToolError::InvalidArgument(
                        "pageInterval must be greater than zero".into(),
                    ))
                }
                Some(_) => {}
            },
            SplitMethod::ExtractAllPages => {}
        }
        Ok(())
    }
}

// ============================================================================
// Compress
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionQuality {
    Low,
    #[default]
    Medium,
    High,
    Custom,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressOptions {
    #[serde(default)]
    pub quality: CompressionQuality,
    #[serde(default)]
    pub custom_quality: Option<u32>,
}

impl CompressOptions {
    /// Numeric quality on a 1-100 scale.
    pub fn quality_value(&self) -> u32 {
        match self.quality {
            CompressionQuality::Low => 50,
            CompressionQuality::Medium => 75,
            CompressionQuality::High => 90,
            CompressionQuality::Custom => self.custom_quality.unwrap_or(75),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressRequest {
    pub file_path: String,
    #[serde(default)]
    pub options: CompressOptions,
}

impl CompressRequest {
    pub fn validate(&self) -> Result<()> {
        require_file(&self.file_path)?;
        if let (CompressionQuality::Custom, Some(custom)) =
            (self.options.quality, self.options.custom_quality)
        {
            let (min, max) = QUALITY;
            check_range("customQuality", custom, min, max)?;
        }
        Ok(())
    }
}

// ============================================================================
// Extract / remove images
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMode {
    #[default]
    Extract,
    Remove,
}

impl ImageMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageMode::Extract => "extract",
            ImageMode::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractImagesOptions {
    #[serde(default)]
    pub mode: ImageMode,
    #[serde(default)]
    pub pages: Option<Vec<u32>>,
    #[serde(default)]
    pub page_ranges: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractImagesRequest {
    pub file_path: String,
    #[serde(default)]
    pub options: Option<ExtractImagesOptions>,
}

impl ExtractImagesRequest {
    pub fn validate(&self) -> Result<()> {
        require_file(&self.file_path)?;
        if self.options.is_none() {
            return Err(PdfToolError::MissingArgument("options".into()));
        }
        Ok(())
    }
}

// ============================================================================
// PDF to image
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    #[serde(alias = "jpeg")]
    Jpg,
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpg => "jpg",
            ImageFormat::Png => "png",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfToImageRequest {
    pub file_path: String,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default)]
    pub format: ImageFormat,
    #[serde(default = "default_true")]
    pub include_page_numbers: bool,
}

impl PdfToImageRequest {
    pub fn validate(&self) -> Result<()> {
        require_file(&self.file_path)?;
        check_dpi(self.dpi)
    }
}

// ============================================================================
// Redact
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactRequest {
    #[serde(alias = "file")]
    pub file_path: String,
    #[serde(default)]
    pub redactions: Vec<RedactionArea>,
}

impl RedactRequest {
    pub fn validate(&self) -> Result<()> {
        require_file(&self.file_path)?;
        if self.redactions.is_empty() {
            return Err(PdfToolError::MissingArgument("redactions".into()));
        }
        self.redactions
            .iter()
            .enumerate()
            .try_for_each(|(index, area)| check_redaction_area(index, area, None))
    }
}

// ============================================================================
// Watermark
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkKind {
    #[default]
    Text,
    Image,
}

impl WatermarkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WatermarkKind::Text => "text",
            WatermarkKind::Image => "image",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatermarkPosition {
    #[default]
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Tiled,
}

impl WatermarkPosition {
    pub fn as_str(self) -> &'static str {
        match self {
            WatermarkPosition::Center => "Center",
            WatermarkPosition::TopLeft => "TopLeft",
            WatermarkPosition::TopRight => "TopRight",
            WatermarkPosition::BottomLeft => "BottomLeft",
            WatermarkPosition::BottomRight => "BottomRight",
            WatermarkPosition::Tiled => "Tiled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkRequest {
    pub file_path: String,
    #[serde(default, rename = "watermarkType")]
    pub kind: WatermarkKind,
    #[serde(default = "default_watermark_text")]
    pub text: String,
    #[serde(default)]
    pub position: WatermarkPosition,
    #[serde(default = "default_rotation")]
    pub rotation: i32,
    #[serde(default = "default_opacity")]
    pub opacity: u32,
    #[serde(default = "default_watermark_font_size")]
    pub font_size: u32,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default)]
    pub pages_range: PagesRange,
    #[serde(default)]
    pub custom_pages: Option<String>,
    #[serde(default = "default_one")]
    pub start_page: u32,
    #[serde(default)]
    pub end_page: u32,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default = "default_image_scale")]
    pub image_scale: u32,
}

impl WatermarkRequest {
    pub fn validate(&self) -> Result<()> {
        require_file(&self.file_path)?;

        let (min, max) = OPACITY;
        check_range("opacity", self.opacity, min, max)?;

        match self.kind {
            WatermarkKind::Text => {
                require_present("text", Some(self.text.as_str()))?;
                let (min, max) = WATERMARK_FONT_SIZE;
                check_range("fontSize", self.font_size, min, max)?;
                check_hex_color("textColor", &self.text_color)?;
            }
            WatermarkKind::Image => {
                let path = require_present("imagePath", self.image_path.as_deref())?;
                if !Path::new(path).is_file() {
                    return Err(PdfToolError::FileNotFound(path.into()));
                }
                let (min, max) = IMAGE_SCALE;
                check_range("imageScale", self.image_scale, min, max)?;
            }
        }

        if self.pages_range == PagesRange::Custom {
            require_present("customPages", self.custom_pages.as_deref())?;
        }
        Ok(())
    }
}

// ============================================================================
// Image to PDF
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    Fit,
    #[default]
    A4,
    Letter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// One uploaded image.
#[derive(Debug, Clone)]
pub struct ImageFileData {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl ImageFileData {
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }
}

#[derive(Debug, Clone)]
pub struct ImageToPdfRequest {
    pub orientation: Orientation,
    pub page_size: PageSize,
    pub merge_all: bool,
    pub quality: u32,
    pub images: Vec<ImageFileData>,
}

impl Default for ImageToPdfRequest {
    fn default() -> Self {
        Self {
            orientation: Orientation::Portrait,
            page_size: PageSize::A4,
            merge_all: true,
            quality: 95,
            images: Vec::new(),
        }
    }
}

impl ImageToPdfRequest {
    pub fn validate(&self) -> Result<()> {
        if self.images.is_empty() {
            return Err(PdfToolError::MissingArgument("images".into()));
        }
        let (min, max) = QUALITY;
        check_range("quality", self.quality, min, max)?;

        for image in &self.images {
            let supported = image
                .extension()
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));
            if !supported {
                return Err(PdfToolError::InvalidArgument(format!(
                    "unsupported image type: {}",
                    image.file_name
                )));
            }
            if image.content.is_empty() {
                return Err(PdfToolError::InvalidArgument(format!(
                    "image is empty: {}",
                    image.file_name
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Every tool request the toolbox can run.
#[derive(Debug, Clone)]
pub enum OperationRequest {
    AddPageNumbers(AddPageNumbersRequest),
    Crop(CropRequest),
    Metadata(MetadataRequest),
    LockUnlock(LockUnlockRequest),
    Merge(MergeRequest),
    Organize(OrganizeRequest),
    Remove(RemoveRequest),
    Split(SplitRequest),
    Compress(CompressRequest),
    ExtractImages(ExtractImagesRequest),
    PdfToImage(PdfToImageRequest),
    Redact(RedactRequest),
    Watermark(WatermarkRequest),
    ImageToPdf(ImageToPdfRequest),
}

impl OperationRequest {
    pub fn name(&self) -> &'static str {
        match self {
            OperationRequest::AddPageNumbers(_) => "add_page_numbers",
            OperationRequest::Crop(_) => "crop",
            OperationRequest::Metadata(_) => "metadata",
            OperationRequest::LockUnlock(r) => match r.operation {
                LockOperation::Lock => "lock",
                LockOperation::Unlock => "unlock",
            },
            OperationRequest::Merge(_) => "merge",
            OperationRequest::Organize(_) => "organize",
            OperationRequest::Remove(_) => "remove",
            OperationRequest::Split(_) => "split",
            OperationRequest::Compress(_) => "compress",
            OperationRequest::ExtractImages(_) => "extract_images",
            OperationRequest::PdfToImage(_) => "pdf_to_image",
            OperationRequest::Redact(_) => "redact",
            OperationRequest::Watermark(_) => "watermark",
            OperationRequest::ImageToPdf(_) => "image_to_pdf",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            OperationRequest::AddPageNumbers(r) => r.validate(),
            OperationRequest::Crop(r) => r.validate(),
            OperationRequest::Metadata(r) => r.validate(),
            OperationRequest::LockUnlock(r) => r.validate(),
            OperationRequest::Merge(r) => r.validate(),
            OperationRequest::Organize(r) => r.validate(),
            OperationRequest::Remove(r) => r.validate(),
            OperationRequest::Split(r) => r.validate(),
            OperationRequest::Compress(r) => r.validate(),
            OperationRequest::ExtractImages(r) => r.validate(),
            OperationRequest::PdfToImage(r) => r.validate(),
            OperationRequest::Redact(r) => r.validate(),
            OperationRequest::Watermark(r) => r.validate(),
            OperationRequest::ImageToPdf(r) => r.validate(),
        }
    }
}

fn default_one() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_page_number_font_size() -> u32 {
    12
}

fn default_dpi() -> u32 {
    150
}

fn default_watermark_text() -> String {
    "CONFIDENTIAL".to_string()
}

fn default_rotation() -> i32 {
    45
}

fn default_opacity() -> u32 {
    60
}

fn default_watermark_font_size() -> u32 {
    36
}

fn default_text_color() -> String {
    "#3498db".to_string()
}

fn default_image_scale() -> u32 {
    50
}
