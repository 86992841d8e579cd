//! Request and response bodies of the HTTP API.
//!
//! Request types derive [`Validate`] and are extracted through
//! [`ValidatedJson`], so a handler only ever sees a well-formed body.

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use crate::sdk::{Document, Fields, StorageLocator, StoredObject};

use super::handlers::ApiError;

/// Default number of search results.
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// Largest accepted search limit.
pub const MAX_SEARCH_LIMIT: u32 = 100;

// =============================================================================
// Extractor
// =============================================================================

/// JSON body that has been deserialized and validated.
///
/// Malformed JSON, a wrong content type, missing fields and failed validation
/// rules are all rejected with `422 Unprocessable Entity`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;

        value
            .validate()
            .map_err(|errors| ApiError::Validation(errors.to_string()))?;

        Ok(ValidatedJson(value))
    }
}

// =============================================================================
// Document Requests
// =============================================================================

/// Body of `get` and `delete`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DocumentRequest {
    #[validate(length(min = 1, message = "doc_type cannot be empty"))]
    pub doc_type: String,

    #[validate(length(min = 1, message = "doc_id cannot be empty"))]
    pub doc_id: String,
}

/// Body of `create`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDocumentRequest {
    #[validate(length(min = 1, message = "doc_type cannot be empty"))]
    pub doc_type: String,

    #[validate(length(min = 1, message = "doc_id cannot be empty"))]
    pub doc_id: String,

    pub data: Fields,
}

/// Body of `update`. Only the fields present in `data` are changed.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateDocumentRequest {
    #[validate(length(min = 1, message = "doc_type cannot be empty"))]
    pub doc_type: String,

    #[validate(length(min = 1, message = "doc_id cannot be empty"))]
    pub doc_id: String,

    #[validate(custom(function = "non_empty_fields"))]
    pub data: Fields,
}

/// Body of `search`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(min = 1, message = "doc_type cannot be empty"))]
    pub doc_type: String,

    /// Field name to literal value (equality) or `{"op", "value"}` predicate
    #[serde(default, deserialize_with = "null_as_default")]
    pub query_constraints: Fields,

    #[serde(default = "default_search_limit", deserialize_with = "null_as_search_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: u32,

    /// Sort field; a leading `-` sorts descending
    #[serde(default)]
    pub order_by: Option<String>,
}

fn default_search_limit() -> u32 {
    DEFAULT_SEARCH_LIMIT
}

/// Explicit `null` behaves like an omitted key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_search_limit<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(DEFAULT_SEARCH_LIMIT))
}

fn non_empty_fields(fields: &Fields) -> Result<(), ValidationError> {
    if fields.is_empty() {
        let mut err = ValidationError::new("empty");
        err.message = Some("data must contain at least one field".into());
        return Err(err);
    }
    Ok(())
}

// =============================================================================
// Storage Requests
// =============================================================================

/// Body of `get-url` and `get-blob`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StorageObjectRequest {
    #[validate(length(min = 1, message = "folder_name cannot be empty"))]
    pub folder_name: String,

    #[validate(length(min = 1, message = "file_name cannot be empty"))]
    pub file_name: String,

    #[serde(default)]
    pub app_name: Option<String>,
}

impl StorageObjectRequest {
    /// Convert to a locator; a blank `app_name` counts as absent.
    pub fn into_locator(self) -> StorageLocator {
        StorageLocator {
            folder_name: self.folder_name,
            file_name: self.file_name,
            app_name: normalize_app_name(self.app_name),
        }
    }
}

pub(crate) fn normalize_app_name(app_name: Option<String>) -> Option<String> {
    app_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Serialize)]
pub struct GetDocumentResponse {
    pub success: bool,
    pub doc_type: String,
    pub doc_id: String,
    pub data: Fields,
}

/// Response of `create` and `update`.
#[derive(Debug, Serialize)]
pub struct WriteDocumentResponse {
    pub success: bool,
    pub doc_type: String,
    pub doc_id: String,
    pub result: Document,
}

#[derive(Debug, Serialize)]
pub struct DeleteDocumentResponse {
    pub success: bool,
    pub doc_type: String,
    pub doc_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub doc_type: String,
    pub count: usize,
    pub results: Vec<Document>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub folder: String,
    pub app_name: Option<String>,
    /// Names of the uploaded files, in upload order
    pub files_uploaded: Vec<String>,
    pub result: Vec<StoredObject>,
}

#[derive(Debug, Serialize)]
pub struct DownloadUrlResponse {
    pub success: bool,
    pub folder_name: String,
    pub file_name: String,
    pub app_name: Option<String>,
    pub url: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`
    pub status: String,

    /// Service name
    pub service: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Tests
// =============================================================================
