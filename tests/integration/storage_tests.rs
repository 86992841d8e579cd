//! Storage API integration tests.
//!
//! Tests verify:
//! - Multipart uploads land at `{folder}/{file}` or `{app}/{folder}/{file}`
//! - Uploaded objects resolve through get-url and get-blob
//! - Blob responses carry extension-based content types
//! - Upload form validation

use axum::http::{header, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::test_utils::{
    body_bytes, body_json, json_request, test_router, upload_request, MockSdk, Part, TEST_TOKEN,
};

fn text_file<'a>(file_name: &'a str, data: &'a [u8]) -> Part<'a> {
    Part::File {
        name: "files",
        file_name,
        content_type: "text/plain",
        data,
    }
}

#[tokio::test]
async fn test_upload_two_files_then_resolve_urls() {
    let sdk = MockSdk::new();
    let (router, _) = test_router(sdk.clone());

    let response = router
        .clone()
        .oneshot(upload_request(
            Some(TEST_TOKEN),
            &[
                Part::Text("folder", "uploads"),
                text_file("a.txt", b"first"),
                text_file("b.txt", b"second"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["folder"], "uploads");
    assert_eq!(json["app_name"], serde_json::Value::Null);
    assert_eq!(json["files_uploaded"], json!(["a.txt", "b.txt"]));
    assert_eq!(json["result"][0]["path"], "uploads/a.txt");
    assert_eq!(json["result"][1]["path"], "uploads/b.txt");
    assert_eq!(json["result"][1]["size"], 6);

    assert_eq!(
        sdk.object_paths().await,
        vec!["uploads/a.txt".to_string(), "uploads/b.txt".to_string()]
    );

    for file_name in ["a.txt", "b.txt"] {
        let response = router
            .clone()
            .oneshot(json_request(
                "/api/test/storage/get-url",
                Some(TEST_TOKEN),
                json!({"folder_name": "uploads", "file_name": file_name}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{}", file_name);
        let json = body_json(response).await;
        assert_eq!(json["file_name"], file_name);
        assert!(json["url"]
            .as_str()
            .unwrap()
            .contains(&format!("uploads%2F{}", file_name)));
    }
}

#[tokio::test]
async fn test_upload_with_app_name_namespaces_path() {
    let sdk = MockSdk::new();
    let (router, _) = test_router(sdk.clone());

    let response = router
        .clone()
        .oneshot(upload_request(
            Some(TEST_TOKEN),
            &[
                Part::Text("folder", "docs"),
                Part::Text("app_name", "crm"),
                Part::File {
                    name: "files",
                    file_name: "report.pdf",
                    content_type: "application/pdf",
                    data: b"%PDF-1.4",
                },
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["app_name"], "crm");
    assert_eq!(json["files_uploaded"], json!(["report.pdf"]));
    assert_eq!(json["result"][0]["path"], "crm/docs/report.pdf");

    // Without the app name the object is elsewhere
    let response = router
        .oneshot(json_request(
            "/api/test/storage/get-url",
            Some(TEST_TOKEN),
            json!({"folder_name": "docs", "file_name": "report.pdf"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_blob_returns_bytes_with_headers() {
    let sdk = MockSdk::new();
    let (router, _) = test_router(sdk);

    let response = router
        .clone()
        .oneshot(upload_request(
            Some(TEST_TOKEN),
            &[
                Part::Text("folder", "images"),
                Part::File {
                    name: "files",
                    file_name: "logo.png",
                    content_type: "image/png",
                    data: b"\x89PNG\r\n\x1a\n",
                },
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(json_request(
            "/api/test/storage/get-blob",
            Some(TEST_TOKEN),
            json!({"folder_name": "images", "file_name": "logo.png"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "inline; filename=\"logo.png\""
    );
    assert_eq!(&body_bytes(response).await[..], b"\x89PNG\r\n\x1a\n");
}

#[tokio::test]
async fn test_get_blob_missing_object_is_404() {
    let (router, _) = test_router(MockSdk::new());

    let response = router
        .oneshot(json_request(
            "/api/test/storage/get-blob",
            Some(TEST_TOKEN),
            json!({"folder_name": "uploads", "file_name": "nope.txt"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Not Found");
}

#[tokio::test]
async fn test_upload_to_denied_folder_is_403() {
    let sdk = MockSdk::new().deny("private").await;
    let (router, _) = test_router(sdk.clone());

    let response = router
        .oneshot(upload_request(
            Some(TEST_TOKEN),
            &[Part::Text("folder", "private"), text_file("a.txt", b"x")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(sdk.object_paths().await.is_empty());
}

#[tokio::test]
async fn test_upload_form_validation() {
    let sdk = MockSdk::new();
    let (router, _) = test_router(sdk.clone());

    // No files
    let response = router
        .clone()
        .oneshot(upload_request(
            Some(TEST_TOKEN),
            &[Part::Text("folder", "uploads")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // No folder
    let response = router
        .clone()
        .oneshot(upload_request(Some(TEST_TOKEN), &[text_file("a.txt", b"x")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Not multipart at all
    let response = router
        .oneshot(json_request(
            "/api/test/storage/upload",
            Some(TEST_TOKEN),
            json!({"folder": "uploads"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"], "Validation Error");

    assert_eq!(sdk.call_count(), 0);
}
