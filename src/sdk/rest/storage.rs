//! Firebase Storage v0 object operations.
//!
//! Objects are addressed by their full path, percent-encoded as a single
//! segment (`uploads/a.txt` becomes `uploads%2Fa.txt`).

use bytes::Bytes;
use serde::Deserialize;
use tracing::debug;

use crate::error::SdkError;
use crate::sdk::{object_path, AuthToken, StorageLocator, StoredObject, UploadFile};

use super::{check_status, RestSdk};

/// Object metadata as the Storage API returns it.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub name: String,
    #[serde(default)]
    pub bucket: String,
    pub content_type: Option<String>,
    /// Decimal string
    pub size: Option<String>,
    /// Comma-separated download tokens
    pub download_tokens: Option<String>,
}

impl ObjectMetadata {
    fn first_download_token(&self) -> Option<&str> {
        self.download_tokens
            .as_deref()?
            .split(',')
            .map(str::trim)
            .find(|t| !t.is_empty())
    }

    fn size(&self) -> u64 {
        self.size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl RestSdk {
    fn objects_url(&self) -> String {
        format!("{}/b/{}/o", self.storage_base_url, self.bucket)
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/{}", self.objects_url(), urlencoding::encode(path))
    }

    /// Public download URL for an object.
    fn download_url(&self, metadata: &ObjectMetadata) -> String {
        let base = format!("{}?alt=media", self.object_url(&metadata.name));
        match metadata.first_download_token() {
            Some(token) => format!("{}&token={}", base, urlencoding::encode(token)),
            None => base,
        }
    }

    async fn object_metadata(
        &self,
        token: &AuthToken,
        path: &str,
    ) -> Result<ObjectMetadata, SdkError> {
        let response = self
            .http
            .get(self.object_url(path))
            .header(reqwest::header::AUTHORIZATION, firebase_auth(token))
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    async fn upload_one(
        &self,
        token: &AuthToken,
        path: &str,
        file: UploadFile,
    ) -> Result<ObjectMetadata, SdkError> {
        let content_type = file
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());

        debug!(path = %path, size = file.data.len(), "Uploading object");

        let response = self
            .http
            .post(self.objects_url())
            .query(&[("uploadType", "media"), ("name", path)])
            .header(reqwest::header::AUTHORIZATION, firebase_auth(token))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(file.data)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    /// Files are uploaded in order; the first failure aborts the batch.
    pub(super) async fn storage_upload(
        &self,
        token: &AuthToken,
        folder: &str,
        app_name: Option<&str>,
        files: Vec<UploadFile>,
    ) -> Result<Vec<StoredObject>, SdkError> {
        let mut stored = Vec::with_capacity(files.len());

        for file in files {
            let path = object_path(app_name, folder, &file.file_name);
            let file_name = file.file_name.clone();
            let requested_type = file.content_type.clone();
            let metadata = self.upload_one(token, &path, file).await?;

            stored.push(StoredObject {
                download_url: Some(self.download_url(&metadata)),
                size: metadata.size(),
                content_type: metadata.content_type.or(requested_type),
                bucket: if metadata.bucket.is_empty() {
                    self.bucket.clone()
                } else {
                    metadata.bucket
                },
                path: metadata.name,
                folder: folder.to_string(),
                file_name,
                app_name: app_name.map(str::to_string),
            });
        }

        Ok(stored)
    }

    pub(super) async fn storage_download_url(
        &self,
        token: &AuthToken,
        locator: &StorageLocator,
    ) -> Result<String, SdkError> {
        let metadata = self.object_metadata(token, &locator.object_path()).await?;
        Ok(self.download_url(&metadata))
    }

    pub(super) async fn storage_blob(
        &self,
        token: &AuthToken,
        locator: &StorageLocator,
    ) -> Result<Bytes, SdkError> {
        let response = self
            .http
            .get(self.object_url(&locator.object_path()))
            .query(&[("alt", "media")])
            .header(reqwest::header::AUTHORIZATION, firebase_auth(token))
            .send()
            .await?;

        Ok(check_status(response).await?.bytes().await?)
    }
}

fn firebase_auth(token: &AuthToken) -> String {
    format!("Firebase {}", token.as_str())
}
