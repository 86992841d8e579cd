//! HTTP request handlers for the gateway API.
//!
//! Every protected handler follows the same protocol: validate the body,
//! extract the caller's token, make exactly one SDK call, and wrap the result.
//!
//! # Endpoints
//!
//! - `POST /api/test/{get,create,update,delete,search}` - Firestore documents
//! - `POST /api/test/storage/{upload,get-url,get-blob}` - Storage objects
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::SdkError;
use crate::sdk::{FirebaseSdk, SdkFactory, SdkHolder, SearchQuery, UploadFile};

use super::auth::{extract_token, AuthError};
use super::schemas::{
    normalize_app_name, CreateDocumentRequest, DeleteDocumentResponse, DocumentRequest,
    DownloadUrlResponse, GetDocumentResponse, HealthResponse, SearchRequest, SearchResponse,
    StorageObjectRequest, UpdateDocumentRequest, UploadResponse, ValidatedJson,
    WriteDocumentResponse,
};

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "fn7-gateway";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the SDK holder.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<F: SdkFactory> {
    pub holder: Arc<SdkHolder<F>>,
}

impl<F: SdkFactory> AppState<F> {
    pub fn new(holder: Arc<SdkHolder<F>>) -> Self {
        Self { holder }
    }
}

impl<F: SdkFactory> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            holder: Arc::clone(&self.holder),
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Short error category (e.g. "Unauthorized", "Not Found")
    pub error: String,

    /// Diagnostic detail
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: detail.into(),
        }
    }
}

/// Any failure a handler can return.
#[derive(Debug)]
pub enum ApiError {
    /// No usable caller token
    Unauthorized(AuthError),

    /// The request body was malformed or failed validation
    Validation(String),

    /// The SDK call failed
    Sdk {
        operation: &'static str,
        target: String,
        source: SdkError,
    },
}

impl ApiError {
    fn sdk(operation: &'static str, target: impl Into<String>) -> impl FnOnce(SdkError) -> Self {
        let target = target.into();
        move |source| ApiError::Sdk {
            operation,
            target,
            source,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err)
    }
}

/// Convert ApiError to HTTP response.
///
/// SDK failures are logged by severity:
/// - 5xx errors at ERROR level
/// - 404 at DEBUG level (common and expected)
/// - other 4xx at WARN level
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (operation, target, source) = match self {
            ApiError::Unauthorized(err) => return err.into_response(),
            ApiError::Validation(detail) => {
                debug!("Validation failed: {}", detail);
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(ErrorResponse::new("Validation Error", detail)),
                )
                    .into_response();
            }
            ApiError::Sdk {
                operation,
                target,
                source,
            } => (operation, target, source),
        };

        let (status, error_type) = match &source {
            SdkError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            SdkError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            SdkError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            SdkError::Backend { .. } | SdkError::Transport(_) | SdkError::Decode(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };
        let detail = source.to_string();

        if status.is_server_error() {
            error!(
                operation = operation,
                target = %target,
                status = status.as_u16(),
                "SDK call failed: {}",
                detail
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                operation = operation,
                target = %target,
                status = status.as_u16(),
                "Resource not found: {}",
                detail
            );
        } else {
            warn!(
                operation = operation,
                target = %target,
                status = status.as_u16(),
                "SDK call rejected: {}",
                detail
            );
        }

        (status, Json(ErrorResponse::new(error_type, detail))).into_response()
    }
}

// =============================================================================
// Document Handlers
// =============================================================================

/// Fetch one document.
///
/// # Endpoint
///
/// `POST /api/test/get` with `{"doc_type": "Users", "doc_id": "u1"}`
///
/// # Response
///
/// `200 OK` with `{"success": true, "doc_type", "doc_id", "data": {...}}`
pub async fn get_document_handler<F: SdkFactory>(
    State(state): State<AppState<F>>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<DocumentRequest>,
) -> Result<Json<GetDocumentResponse>, ApiError> {
    let token = extract_token(&headers)?;
    let target = format!("{}/{}", req.doc_type, req.doc_id);

    let sdk = state
        .holder
        .get_client()
        .await
        .map_err(ApiError::sdk("get", &target))?;
    let document = sdk
        .get_document(&token, &req.doc_type, &req.doc_id)
        .await
        .map_err(ApiError::sdk("get", &target))?;

    Ok(Json(GetDocumentResponse {
        success: true,
        doc_type: req.doc_type,
        doc_id: req.doc_id,
        data: document.data,
    }))
}

/// Create a document with a caller-chosen id.
///
/// # Endpoint
///
/// `POST /api/test/create` with `{"doc_type", "doc_id", "data": {...}}`
///
/// # Response
///
/// `200 OK` with `{"success": true, "doc_type", "doc_id", "result": Document}`
pub async fn create_document_handler<F: SdkFactory>(
    State(state): State<AppState<F>>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<CreateDocumentRequest>,
) -> Result<Json<WriteDocumentResponse>, ApiError> {
    let token = extract_token(&headers)?;
    let target = format!("{}/{}", req.doc_type, req.doc_id);

    let sdk = state
        .holder
        .get_client()
        .await
        .map_err(ApiError::sdk("create", &target))?;
    let document = sdk
        .create_document(&token, &req.doc_type, &req.doc_id, &req.data)
        .await
        .map_err(ApiError::sdk("create", &target))?;

    info!(target = %target, "Document created");

    Ok(Json(WriteDocumentResponse {
        success: true,
        doc_type: req.doc_type,
        doc_id: req.doc_id,
        result: document,
    }))
}

/// Merge fields into an existing document.
///
/// # Endpoint
///
/// `POST /api/test/update` with `{"doc_type", "doc_id", "data": {...}}`
///
/// # Response
///
/// `200 OK` with `{"success": true, "doc_type", "doc_id", "result": Document}`,
/// `404` when the document does not exist.
pub async fn update_document_handler<F: SdkFactory>(
    State(state): State<AppState<F>>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<UpdateDocumentRequest>,
) -> Result<Json<WriteDocumentResponse>, ApiError> {
    let token = extract_token(&headers)?;
    let target = format!("{}/{}", req.doc_type, req.doc_id);

    let sdk = state
        .holder
        .get_client()
        .await
        .map_err(ApiError::sdk("update", &target))?;
    let document = sdk
        .update_document(&token, &req.doc_type, &req.doc_id, &req.data)
        .await
        .map_err(ApiError::sdk("update", &target))?;

    info!(target = %target, fields = req.data.len(), "Document updated");

    Ok(Json(WriteDocumentResponse {
        success: true,
        doc_type: req.doc_type,
        doc_id: req.doc_id,
        result: document,
    }))
}

/// Delete a document.
///
/// # Endpoint
///
/// `POST /api/test/delete` with `{"doc_type", "doc_id"}`
///
/// # Response
///
/// `200 OK` with `{"success": true, "doc_type", "doc_id", "message"}`
pub async fn delete_document_handler<F: SdkFactory>(
    State(state): State<AppState<F>>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<DocumentRequest>,
) -> Result<Json<DeleteDocumentResponse>, ApiError> {
    let token = extract_token(&headers)?;
    let target = format!("{}/{}", req.doc_type, req.doc_id);

    let sdk = state
        .holder
        .get_client()
        .await
        .map_err(ApiError::sdk("delete", &target))?;
    sdk.delete_document(&token, &req.doc_type, &req.doc_id)
        .await
        .map_err(ApiError::sdk("delete", &target))?;

    info!(target = %target, "Document deleted");

    Ok(Json(DeleteDocumentResponse {
        success: true,
        message: format!("Document {} deleted", target),
        doc_type: req.doc_type,
        doc_id: req.doc_id,
    }))
}

/// Search one collection.
///
/// # Endpoint
///
/// `POST /api/test/search`
///
/// ```json
/// {
///   "doc_type": "Chats",
///   "query_constraints": {"owner": "u1", "age": {"op": ">=", "value": 18}},
///   "limit": 10,
///   "order_by": "-created_at"
/// }
/// ```
///
/// # Response
///
/// `200 OK` with `{"success": true, "doc_type", "count", "results": [...]}`
pub async fn search_documents_handler<F: SdkFactory>(
    State(state): State<AppState<F>>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = SearchQuery::new(
        req.doc_type.clone(),
        &req.query_constraints,
        req.limit,
        req.order_by.as_deref(),
    )
    .map_err(ApiError::Validation)?;

    let token = extract_token(&headers)?;

    let sdk = state
        .holder
        .get_client()
        .await
        .map_err(ApiError::sdk("search", &req.doc_type))?;
    let results = sdk
        .search_documents(&token, &query)
        .await
        .map_err(ApiError::sdk("search", &req.doc_type))?;

    debug!(doc_type = %req.doc_type, count = results.len(), "Search complete");

    Ok(Json(SearchResponse {
        success: true,
        doc_type: req.doc_type,
        count: results.len(),
        results,
    }))
}

// =============================================================================
// Storage Handlers
// =============================================================================

/// Upload one or more files.
///
/// # Endpoint
///
/// `POST /api/test/storage/upload` as `multipart/form-data` with one or more
/// `files` parts, a `folder` field and an optional `app_name` field.
///
/// # Response
///
/// `200 OK` with
/// `{"success": true, "folder", "app_name", "files_uploaded": [names], "result": [...]}`
pub async fn upload_handler<F: SdkFactory>(
    State(state): State<AppState<F>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let multipart = multipart.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    let form = read_upload_form(multipart).await?;

    let token = extract_token(&headers)?;

    let sdk = state
        .holder
        .get_client()
        .await
        .map_err(ApiError::sdk("upload", &form.folder))?;
    let stored = sdk
        .upload_files(&token, &form.folder, form.app_name.as_deref(), form.files)
        .await
        .map_err(ApiError::sdk("upload", &form.folder))?;

    info!(folder = %form.folder, files = stored.len(), "Files uploaded");

    Ok(Json(UploadResponse {
        success: true,
        folder: form.folder,
        app_name: form.app_name,
        files_uploaded: stored.iter().map(|o| o.file_name.clone()).collect(),
        result: stored,
    }))
}

/// Validated contents of an upload form.
struct UploadForm {
    folder: String,
    app_name: Option<String>,
    files: Vec<UploadFile>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut folder = None;
    let mut app_name = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" | "file" => {
                let file_name = field
                    .file_name()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        ApiError::Validation("Every file must have a filename".to_string())
                    })?;
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Failed to read file: {}", e)))?;

                files.push(UploadFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            "folder" => {
                folder = Some(field.text().await.map_err(|e| {
                    ApiError::Validation(format!("Failed to read folder: {}", e))
                })?);
            }
            "app_name" => {
                app_name = Some(field.text().await.map_err(|e| {
                    ApiError::Validation(format!("Failed to read app_name: {}", e))
                })?);
            }
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let folder = folder
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::Validation("folder is required".to_string()))?;

    if files.is_empty() {
        return Err(ApiError::Validation(
            "At least one file is required".to_string(),
        ));
    }

    Ok(UploadForm {
        folder,
        app_name: normalize_app_name(app_name),
        files,
    })
}

/// Resolve a download URL for a stored object.
///
/// # Endpoint
///
/// `POST /api/test/storage/get-url` with `{"folder_name", "file_name", "app_name"?}`
///
/// # Response
///
/// `200 OK` with `{"success": true, "folder_name", "file_name", "app_name", "url"}`
pub async fn download_url_handler<F: SdkFactory>(
    State(state): State<AppState<F>>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<StorageObjectRequest>,
) -> Result<Json<DownloadUrlResponse>, ApiError> {
    let token = extract_token(&headers)?;
    let locator = req.into_locator();
    let target = locator.object_path();

    let sdk = state
        .holder
        .get_client()
        .await
        .map_err(ApiError::sdk("get-url", &target))?;
    let url = sdk
        .get_download_url(&token, &locator)
        .await
        .map_err(ApiError::sdk("get-url", &target))?;

    Ok(Json(DownloadUrlResponse {
        success: true,
        folder_name: locator.folder_name,
        file_name: locator.file_name,
        app_name: locator.app_name,
        url,
    }))
}

/// Download the raw bytes of a stored object.
///
/// # Endpoint
///
/// `POST /api/test/storage/get-blob` with `{"folder_name", "file_name", "app_name"?}`
///
/// # Response
///
/// `200 OK` with the object bytes, `Content-Type` guessed from the file
/// extension and `Content-Disposition: inline`.
pub async fn blob_handler<F: SdkFactory>(
    State(state): State<AppState<F>>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<StorageObjectRequest>,
) -> Result<Response, ApiError> {
    let token = extract_token(&headers)?;
    let locator = req.into_locator();
    let target = locator.object_path();

    let sdk = state
        .holder
        .get_client()
        .await
        .map_err(ApiError::sdk("get-blob", &target))?;
    let blob: Bytes = sdk
        .get_blob(&token, &locator)
        .await
        .map_err(ApiError::sdk("get-blob", &target))?;

    let disposition = HeaderValue::from_str(&format!(
        "inline; filename=\"{}\"",
        locator.file_name.replace('"', "")
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(content_type_for(&locator.file_name)),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        blob,
    )
        .into_response())
}

/// Guess a MIME type from a file extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

// =============================================================================
// Health
// =============================================================================

/// Health check.
///
/// # Endpoint
///
/// `GET /health`
///
/// Never touches the SDK.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
