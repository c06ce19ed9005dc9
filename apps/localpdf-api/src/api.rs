//! HTTP handlers for the LocalPDF API
//!
//! JSON endpoints deserialize straight into the core request types and hand
//! them to the [`Toolbox`](localpdf_core::Toolbox). The two upload endpoints
//! assemble their request from multipart form fields first.

use axum::{
    extract::{multipart::Field, rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use localpdf_core::bridge::TempFile;
use localpdf_core::requests::*;
use localpdf_core::{GhostscriptStatus, OperationRequest, ToolOutput};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Largest image accepted as a watermark.
pub const MAX_WATERMARK_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub const WATERMARK_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];

/// Watermark form fields that carry numbers.
const NUMERIC_WATERMARK_FIELDS: &[&str] = &["rotation", "opacity", "fontSize", "startPage", "endPage", "imageScale"];

type ApiResult = Result<Response, ApiError>;

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/Ghostscript/check", get(handle_ghostscript_check))
        .route("/api/AddPageNumbers/add", post(handle_add_page_numbers))
        .route("/api/PdfCrop/crop", post(handle_crop))
        .route("/api/PdfMetadata/metadata", post(handle_metadata))
        .route("/api/PdfLockUnlock/lock", post(handle_lock))
        .route("/api/PdfLockUnlock/unlock", post(handle_unlock))
        .route("/api/PdfMerge/merge", post(handle_merge))
        .route("/api/PdfOrganize/organize", post(handle_organize))
        .route("/api/PdfRemove/remove", post(handle_remove))
        .route("/api/PdfSplit/split", post(handle_split))
        .route("/api/PdfCompress/compress", post(handle_compress))
        .route("/api/PdfExtractImages/extract", post(handle_extract_images))
        .route("/api/PdfToImage/convert", post(handle_pdf_to_image))
        .route("/api/PdfRedact/redact", post(handle_redact))
        .route("/api/PdfWatermark/add-text", post(handle_watermark_text))
        .route("/api/PdfWatermark/add-image", post(handle_watermark_image))
        .route("/api/ImageToPdf/convert", post(handle_image_to_pdf))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

// ============================================================================
// Responses
// ============================================================================

/// Keep a file name usable inside a quoted header parameter.
fn header_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect()
}

fn into_http(output: ToolOutput) -> Response {
    match output {
        ToolOutput::Json(value) => Json(value).into_response(),
        ToolOutput::File {
            bytes,
            file_name,
            content_type,
            headers,
        } => {
            let mut response = (StatusCode::OK, bytes).into_response();
            let response_headers = response.headers_mut();
            response_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));

            let disposition = format!("attachment; filename=\"{}\"", header_file_name(&file_name));
            match HeaderValue::from_str(&disposition) {
                Ok(value) => {
                    response_headers.insert(header::CONTENT_DISPOSITION, value);
                }
                Err(e) => warn!("dropping content disposition for {}: {}", file_name, e),
            }

            for (name, value) in headers {
                match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
                    (Ok(name), Ok(value)) => {
                        response_headers.insert(name, value);
                    }
                    _ => warn!("dropping invalid response header {}", name),
                }
            }
            response
        }
    }
}

async fn run(state: &AppState, request: OperationRequest) -> ApiResult {
    let output = state.toolbox.run(request).await?;
    Ok(into_http(output))
}

// ============================================================================
// Service endpoints
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "localpdf-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn handle_ghostscript_check(State(state): State<AppState>) -> Json<GhostscriptStatus> {
    Json(state.toolbox.ghostscript_status().await)
}

// ============================================================================
// JSON tool endpoints
// ============================================================================

pub async fn handle_add_page_numbers(
    State(state): State<AppState>,
    payload: Result<Json<AddPageNumbersRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    run(&state, OperationRequest::AddPageNumbers(request)).await
}

pub async fn handle_crop(State(state): State<AppState>, payload: Result<Json<CropRequest>, JsonRejection>) -> ApiResult {
    let Json(request) = payload?;
    run(&state, OperationRequest::Crop(request)).await
}

pub async fn handle_metadata(
    State(state): State<AppState>,
    payload: Result<Json<MetadataRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    run(&state, OperationRequest::Metadata(request)).await
}

fn expect_operation(request: &LockUnlockRequest, expected: LockOperation) -> Result<(), ApiError> {
    if request.operation == expected {
        return Ok(());
    }
    let name = match expected {
        LockOperation::Lock => "lock",
        LockOperation::Unlock => "unlock",
    };
    Err(ApiError::BadRequest(format!("Operation must be '{}' for this endpoint.", name)))
}

pub async fn handle_lock(
    State(state): State<AppState>,
    payload: Result<Json<LockUnlockRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    expect_operation(&request, LockOperation::Lock)?;
    run(&state, OperationRequest::LockUnlock(request)).await
}

pub async fn handle_unlock(
    State(state): State<AppState>,
    payload: Result<Json<LockUnlockRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    expect_operation(&request, LockOperation::Unlock)?;
    run(&state, OperationRequest::LockUnlock(request)).await
}

pub async fn handle_merge(State(state): State<AppState>, payload: Result<Json<MergeRequest>, JsonRejection>) -> ApiResult {
    let Json(request) = payload?;
    run(&state, OperationRequest::Merge(request)).await
}

pub async fn handle_organize(
    State(state): State<AppState>,
    payload: Result<Json<OrganizeRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    run(&state, OperationRequest::Organize(request)).await
}

pub async fn handle_remove(State(state): State<AppState>, payload: Result<Json<RemoveRequest>, JsonRejection>) -> ApiResult {
    let Json(request) = payload?;
    run(&state, OperationRequest::Remove(request)).await
}

pub async fn handle_split(State(state): State<AppState>, payload: Result<Json<SplitRequest>, JsonRejection>) -> ApiResult {
    let Json(request) = payload?;
    run(&state, OperationRequest::Split(request)).await
}

pub async fn handle_compress(
    State(state): State<AppState>,
    payload: Result<Json<CompressRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    run(&state, OperationRequest::Compress(request)).await
}

pub async fn handle_extract_images(
    State(state): State<AppState>,
    payload: Result<Json<ExtractImagesRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    run(&state, OperationRequest::ExtractImages(request)).await
}

pub async fn handle_pdf_to_image(
    State(state): State<AppState>,
    payload: Result<Json<PdfToImageRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    run(&state, OperationRequest::PdfToImage(request)).await
}

pub async fn handle_redact(State(state): State<AppState>, payload: Result<Json<RedactRequest>, JsonRejection>) -> ApiResult {
    let Json(request) = payload?;
    run(&state, OperationRequest::Redact(request)).await
}

pub async fn handle_watermark_text(
    State(state): State<AppState>,
    payload: Result<Json<WatermarkRequest>, JsonRejection>,
) -> ApiResult {
    let Json(mut request) = payload?;
    request.kind = WatermarkKind::Text;
    request.image_path = None;
    run(&state, OperationRequest::Watermark(request)).await
}

// ============================================================================
// Multipart endpoints
// ============================================================================

/// Parse a form value the way serde would parse the matching JSON string.
fn form_value<T: DeserializeOwned>(field: &str, value: &str) -> Result<T, ApiError> {
    serde_json::from_value(Value::String(value.trim().to_ascii_lowercase()))
        .map_err(|_| ApiError::BadRequest(format!("Invalid value for {}: '{}'", field, value)))
}

fn form_bool(field: &str, value: &str) -> Result<bool, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "1" => Ok(true),
        "false" | "off" | "0" => Ok(false),
        _ => Err(ApiError::BadRequest(format!("Invalid value for {}: '{}'", field, value))),
    }
}

fn form_number(field: &str, value: &str) -> Result<i64, ApiError> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid value for {}: '{}'", field, value)))
}

async fn read_file(field: Field<'_>) -> Result<ImageFileData, ApiError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content = field.bytes().await?.to_vec();
    Ok(ImageFileData { file_name, content })
}

/// Build a watermark request from flat form fields, as the front end sends them.
fn watermark_from_form(fields: Map<String, Value>) -> Result<WatermarkRequest, ApiError> {
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| ApiError::BadRequest(format!("Invalid watermark request: {}", e)))
}

fn check_watermark_image(image: &ImageFileData) -> Result<String, ApiError> {
    if image.content.is_empty() {
        return Err(ApiError::BadRequest("Image file is required for image watermark.".into()));
    }
    let extension = image
        .extension()
        .filter(|ext| WATERMARK_IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Invalid image format. Allowed formats: {}",
                WATERMARK_IMAGE_EXTENSIONS.join(", ")
            ))
        })?;
    if image.content.len() > MAX_WATERMARK_IMAGE_BYTES {
        return Err(ApiError::BadRequest("Image file size must be less than 10MB.".into()));
    }
    Ok(extension)
}

pub async fn handle_watermark_image(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult {
    let mut fields = Map::new();
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "imageFile" {
            image = Some(read_file(field).await?);
            continue;
        }
        let text = field.text().await?;
        if text.is_empty() || text == "null" || text == "undefined" {
            continue;
        }
        let value = if NUMERIC_WATERMARK_FIELDS.contains(&name.as_str()) {
            Value::from(form_number(&name, &text)?)
        } else {
            Value::String(text)
        };
        fields.insert(name, value);
    }

    let image = image.ok_or_else(|| ApiError::BadRequest("Image file is required for image watermark.".into()))?;
    let extension = check_watermark_image(&image)?;

    let mut request = watermark_from_form(fields)?;
    request.kind = WatermarkKind::Image;

    // Lives until the helper has finished with it
    let stored = TempFile::with_contents(
        &state.toolbox.config().temp_dir,
        &format!("_watermark.{}", extension),
        &image.content,
    )
    .await?;
    request.image_path = Some(stored.path().to_string_lossy().into_owned());
    info!(image = %image.file_name, size = image.content.len(), "watermark image received");

    run(&state, OperationRequest::Watermark(request)).await
}

pub async fn handle_image_to_pdf(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult {
    let mut request = ImageToPdfRequest::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "images" => request.images.push(read_file(field).await?),
            "orientation" => request.orientation = form_value(&name, &field.text().await?)?,
            "pageSize" => request.page_size = form_value(&name, &field.text().await?)?,
            "mergeAll" => request.merge_all = form_bool(&name, &field.text().await?)?,
            "quality" => {
                let text = field.text().await?;
                request.quality = u32::try_from(form_number(&name, &text)?)
                    .map_err(|_| ApiError::BadRequest(format!("Invalid value for quality: '{}'", text)))?;
            }
            other => warn!("ignoring unknown form field {}", other),
        }
    }

    if request.images.is_empty() {
        return Err(ApiError::BadRequest("No images provided.".into()));
    }
    info!(images = request.images.len(), merge = request.merge_all, "converting images");
    run(&state, OperationRequest::ImageToPdf(request)).await
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_file_name() {
        assert_eq!(header_file_name("report_split.zip"), "report_split.zip");
        assert_eq!(header_file_name("a\"b\n.pdf"), "a_b_.pdf");
    }

    #[test]
    fn test_form_values() {
        let size: PageSize = form_value("pageSize", "A4").unwrap();
        assert_eq!(size, PageSize::A4);
        let orientation: Orientation = form_value("orientation", "Landscape").unwrap();
        assert_eq!(orientation, Orientation::Landscape);
        assert!(form_bool("mergeAll", "True").unwrap());
        assert!(!form_bool("mergeAll", "false").unwrap());
        assert!(form_bool("mergeAll", "maybe").is_err());
        assert!(form_value::<PageSize>("pageSize", "legal").is_err());
        assert_eq!(form_number("quality", " 80 ").unwrap(), 80);
    }

    #[test]
    fn test_watermark_image_checks() {
        let image = |name: &str, size: usize| ImageFileData {
            file_name: name.into(),
            content: vec![1; size],
        };
        assert_eq!(check_watermark_image(&image("logo.PNG", 10)).unwrap(), "png");
        assert!(check_watermark_image(&image("logo.svg", 10)).is_err());
        assert!(check_watermark_image(&image("logo.png", 0)).is_err());
        assert!(check_watermark_image(&image("logo.png", MAX_WATERMARK_IMAGE_BYTES + 1)).is_err());
    }

    #[test]
    fn test_watermark_from_flat_fields() {
        let mut fields = Map::new();
        fields.insert("filePath".into(), Value::from("/tmp/a.pdf"));
        fields.insert("opacity".into(), Value::from(40));
        fields.insert("pagesRange".into(), Value::from("custom"));
        fields.insert("customPages".into(), Value::from("1-2"));
        let request = watermark_from_form(fields).unwrap();
        assert_eq!(request.opacity, 40);
        assert_eq!(request.pages_range, PagesRange::Custom);
        assert_eq!(request.custom_pages.as_deref(), Some("1-2"));
    }
}
