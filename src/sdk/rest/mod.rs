//! REST-backed [`FirebaseSdk`] implementation.
//!
//! Talks to the Firestore v1 and Firebase Storage v0 REST APIs directly,
//! using the caller's token as the credential on every request so that
//! security rules are evaluated against the caller.

mod firestore;
mod storage;
mod value;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::SdkError;

use super::{
    AuthToken, Document, Fields, FirebaseSdk, SdkFactory, SearchQuery, StorageLocator,
    StoredObject, UploadFile,
};

const USER_AGENT: &str = concat!("fn7-gateway/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// Client
// =============================================================================

/// Firebase client speaking the public REST APIs.
#[derive(Clone)]
pub struct RestSdk {
    http: Client,
    project_id: String,
    bucket: String,
    firestore_base_url: String,
    storage_base_url: String,
}

impl RestSdk {
    /// Create a client. Base URLs must not end with `/`.
    pub fn new(
        http: Client,
        project_id: impl Into<String>,
        bucket: impl Into<String>,
        firestore_base_url: impl Into<String>,
        storage_base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            project_id: project_id.into(),
            bucket: bucket.into(),
            firestore_base_url: firestore_base_url.into(),
            storage_base_url: storage_base_url.into(),
        }
    }
}

#[async_trait]
impl FirebaseSdk for RestSdk {
    async fn get_document(
        &self,
        token: &AuthToken,
        doc_type: &str,
        doc_id: &str,
    ) -> Result<Document, SdkError> {
        self.firestore_get(token, doc_type, doc_id).await
    }

    async fn create_document(
        &self,
        token: &AuthToken,
        doc_type: &str,
        doc_id: &str,
        data: &Fields,
    ) -> Result<Document, SdkError> {
        self.firestore_create(token, doc_type, doc_id, data).await
    }

    async fn update_document(
        &self,
        token: &AuthToken,
        doc_type: &str,
        doc_id: &str,
        data: &Fields,
    ) -> Result<Document, SdkError> {
        self.firestore_update(token, doc_type, doc_id, data).await
    }

    async fn delete_document(
        &self,
        token: &AuthToken,
        doc_type: &str,
        doc_id: &str,
    ) -> Result<(), SdkError> {
        self.firestore_delete(token, doc_type, doc_id).await
    }

    async fn search_documents(
        &self,
        token: &AuthToken,
        query: &SearchQuery,
    ) -> Result<Vec<Document>, SdkError> {
        self.firestore_search(token, query).await
    }

    async fn upload_files(
        &self,
        token: &AuthToken,
        folder: &str,
        app_name: Option<&str>,
        files: Vec<UploadFile>,
    ) -> Result<Vec<StoredObject>, SdkError> {
        self.storage_upload(token, folder, app_name, files).await
    }

    async fn get_download_url(
        &self,
        token: &AuthToken,
        locator: &StorageLocator,
    ) -> Result<String, SdkError> {
        self.storage_download_url(token, locator).await
    }

    async fn get_blob(&self, token: &AuthToken, locator: &StorageLocator) -> Result<Bytes, SdkError> {
        self.storage_blob(token, locator).await
    }

    async fn shutdown(&self) {
        // reqwest pools close when the last handle drops
        debug!(project_id = %self.project_id, "REST SDK client released");
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Builds [`RestSdk`] from validated settings.
#[derive(Debug, Clone)]
pub struct RestSdkFactory {
    project_id: String,
    bucket: String,
    firestore_base_url: String,
    storage_base_url: String,
}

impl RestSdkFactory {
    pub fn new(settings: &Settings) -> Self {
        Self {
            project_id: settings.project_id().to_string(),
            bucket: settings.storage_bucket.clone(),
            firestore_base_url: settings.firestore_base_url.clone(),
            storage_base_url: settings.storage_base_url.clone(),
        }
    }
}

#[async_trait]
impl SdkFactory for RestSdkFactory {
    type Sdk = RestSdk;

    async fn connect(&self) -> Result<RestSdk, SdkError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SdkError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            project_id = %self.project_id,
            bucket = %self.bucket,
            "Firebase REST client ready"
        );

        Ok(RestSdk::new(
            http,
            self.project_id.clone(),
            self.bucket.clone(),
            self.firestore_base_url.clone(),
            self.storage_base_url.clone(),
        ))
    }
}

// =============================================================================
// Error Classification
// =============================================================================

/// Google API error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Pass successful responses through; turn everything else into an [`SdkError`].
async fn check_status(response: Response) -> Result<Response, SdkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify(status.as_u16(), &body))
}

fn classify(status: u16, body: &str) -> SdkError {
    let message = error_message(body).unwrap_or_else(|| {
        let body = body.trim();
        if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            body.to_string()
        }
    });

    match status {
        404 => SdkError::NotFound(message),
        403 => SdkError::PermissionDenied(message),
        401 => SdkError::Unauthenticated(message),
        _ => SdkError::Backend { status, message },
    }
}

fn error_message(body: &str) -> Option<String> {
    // runQuery streams its errors as a one-element array. Derived struct
    // deserialization also accepts arrays, so the list form is tried first.
    let envelope = serde_json::from_str::<Vec<ErrorEnvelope>>(body)
        .ok()
        .and_then(|list| list.into_iter().find(|e| !e.error.message.is_empty()))
        .or_else(|| serde_json::from_str::<ErrorEnvelope>(body).ok())?;

    Some(envelope.error.message).filter(|m| !m.is_empty())
}

// =============================================================================
// Tests
// =============================================================================
