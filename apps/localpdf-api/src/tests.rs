//! Router tests for the LocalPDF API
//!
//! Requests go through the full router with `tower::ServiceExt::oneshot`;
//! fixtures are small PDFs written to a temporary directory.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use localpdf_core::{ToolConfig, Toolbox};
use lopdf::{dictionary, Document, Object, Stream};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::api;
use crate::state::AppState;

const BODY_LIMIT: usize = 64 * 1024 * 1024;

fn app(dir: &TempDir) -> Router {
    let toolbox = Toolbox::new(ToolConfig {
        scripts_dir: dir.path().join("scripts"),
        temp_dir: dir.path().to_path_buf(),
        ..Default::default()
    });
    api::router(AppState::new(toolbox), BODY_LIMIT)
}

/// Write an N-page blank PDF into `dir` and return its path.
fn write_pdf(dir: &TempDir, name: &str, pages: u32) -> String {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
            .into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => pages as i64,
            "Kids" => kids,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {},
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.path().join(name);
    doc.save(&path).unwrap();
    path.to_string_lossy().into_owned()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart(uri: &str, boundary: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(&dir)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "localpdf-api");
}

#[tokio::test]
async fn test_missing_file_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.pdf");
    let response = app(&dir)
        .oneshot(post_json(
            "/api/PdfRemove/remove",
            json!({ "filePath": missing, "options": { "pages": [1] } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["status"], 404);
    assert!(body["error"].as_str().unwrap().contains("nope.pdf"));
}

#[tokio::test]
async fn test_remove_returns_pdf_attachment() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = write_pdf(&dir, "report.pdf", 6);
    let response = app(&dir)
        .oneshot(post_json(
            "/api/PdfRemove/remove",
            json!({ "filePath": file_path, "options": { "pageRanges": ["2-3"], "removeEvenPages": true } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"report_removed_pages.pdf\""
    );
    let bytes = body_bytes(response).await;
    // 2, 3, 4 and 6 removed
    assert_eq!(localpdf_core::get_page_count(&bytes).unwrap(), 2);
}

#[tokio::test]
async fn test_out_of_range_page_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = write_pdf(&dir, "short.pdf", 3);
    let response = app(&dir)
        .oneshot(post_json(
            "/api/PdfRemove/remove",
            json!({ "filePath": file_path, "options": { "pageRanges": ["2-9"] } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["status"], 400);
}

#[tokio::test]
async fn test_lock_endpoint_rejects_unlock_operation() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = write_pdf(&dir, "a.pdf", 1);
    let response = app(&dir)
        .oneshot(post_json(
            "/api/PdfLockUnlock/lock",
            json!({ "filePath": file_path, "operation": "unlock", "unlockOptions": { "password": "secret" } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Operation must be 'lock' for this endpoint."
    );
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/api/PdfSplit/split")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app(&dir).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metadata_read_returns_json() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = write_pdf(&dir, "a.pdf", 4);
    let response = app(&dir)
        .oneshot(post_json(
            "/api/PdfMetadata/metadata",
            json!({ "filePath": file_path, "operation": "read" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["metadata"]["pageCount"], 4);
}

#[tokio::test]
async fn test_split_returns_zip() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = write_pdf(&dir, "book.pdf", 4);
    let response = app(&dir)
        .oneshot(post_json(
            "/api/PdfSplit/split",
            json!({ "filePath": file_path, "method": "ExtractAllPages" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    assert!(body_bytes(response).await.starts_with(b"PK"));
}

#[tokio::test]
async fn test_split_accepts_numeric_method() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = write_pdf(&dir, "book.pdf", 4);
    let response = app(&dir)
        .oneshot(post_json(
            "/api/PdfSplit/split",
            json!({ "filePath": file_path, "method": 2, "options": { "pageInterval": 2 } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"book_split.zip\""
    );
}

#[tokio::test]
async fn test_image_to_pdf_without_images_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let boundary = "XBOUNDARY";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"pageSize\"\r\n\r\na4\r\n--{b}--\r\n",
        b = boundary
    );
    let response = app(&dir)
        .oneshot(multipart("/api/ImageToPdf/convert", boundary, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No images provided.");
}

#[tokio::test]
async fn test_image_watermark_requires_supported_image() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = write_pdf(&dir, "a.pdf", 1);
    let boundary = "XBOUNDARY";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"filePath\"\r\n\r\n{path}\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"opacity\"\r\n\r\n50\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"imageFile\"; filename=\"logo.svg\"\r\n\
         Content-Type: image/svg+xml\r\n\r\n<svg/>\r\n--{b}--\r\n",
        b = boundary,
        path = file_path
    );
    let response = app(&dir)
        .oneshot(multipart("/api/PdfWatermark/add-image", boundary, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid image format"));
}

#[tokio::test]
async fn test_helper_tools_without_helpers_are_500() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = write_pdf(&dir, "a.pdf", 1);
    let response = app(&dir)
        .oneshot(post_json(
            "/api/PdfToImage/convert",
            json!({ "filePath": file_path, "dpi": 150, "format": "png" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["status"], 500);
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Arbitrary range text is either accepted or rejected as a client error, never a 500
        #[test]
        fn range_text_never_causes_server_error(ranges in "[0-9 ,\\-a-z]{0,12}") {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let dir = tempfile::tempdir().unwrap();
            let file_path = write_pdf(&dir, "doc.pdf", 5);
            let status = runtime.block_on(async {
                app(&dir)
                    .oneshot(post_json(
                        "/api/PdfRemove/remove",
                        json!({ "filePath": file_path, "options": { "pageRanges": [ranges] } }),
                    ))
                    .await
                    .unwrap()
                    .status()
            });
            prop_assert!(
                status == StatusCode::OK || status == StatusCode::BAD_REQUEST,
                "unexpected status {}",
                status
            );
        }
    }
}
