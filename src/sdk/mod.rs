//! SDK seam between the HTTP layer and Firebase.
//!
//! Handlers never talk to Firebase directly. Every operation goes through the
//! [`FirebaseSdk`] trait, whose implementations own validation of content,
//! security-rule enforcement and the wire protocol.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             Route Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │ get_client()
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │               SdkHolder                 │
//! │   (lazy, single-flight construction)    │
//! └────────────────────┬────────────────────┘
//!                      │ SdkFactory::connect()
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           FirebaseSdk Trait             │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │                RestSdk                  │
//! │ (Firestore v1 + Storage v0 REST APIs)   │
//! └─────────────────────────────────────────┘
//! ```

mod holder;
pub mod rest;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::error::SdkError;

pub use holder::SdkHolder;
pub use rest::{RestSdk, RestSdkFactory};

/// Ordered, free-form document fields.
pub type Fields = serde_json::Map<String, Value>;

// =============================================================================
// Auth Token
// =============================================================================

/// Opaque caller credential forwarded to every SDK call.
///
/// The gateway never inspects the token; Firebase decides what it grants.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthToken(<{} bytes>)", self.0.len())
    }
}

// =============================================================================
// Documents
// =============================================================================

/// A document as returned by the SDK.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Document identifier within its collection
    pub id: String,

    /// Document fields
    pub data: Fields,

    /// Backend creation timestamp (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,

    /// Backend last-update timestamp (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

// =============================================================================
// Search Queries
// =============================================================================

/// Comparison operator of a search predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    ArrayContains,
    ArrayContainsAny,
    In,
    NotIn,
}

impl FilterOp {
    /// Parse the operator spelling used in request bodies.
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "==" => FilterOp::Equal,
            "!=" => FilterOp::NotEqual,
            "<" => FilterOp::LessThan,
            "<=" => FilterOp::LessThanOrEqual,
            ">" => FilterOp::GreaterThan,
            ">=" => FilterOp::GreaterThanOrEqual,
            "array-contains" => FilterOp::ArrayContains,
            "array-contains-any" => FilterOp::ArrayContainsAny,
            "in" => FilterOp::In,
            "not-in" => FilterOp::NotIn,
            _ => return None,
        })
    }

    /// Whether the operator compares against a list of candidates.
    pub fn takes_list(&self) -> bool {
        matches!(
            self,
            FilterOp::In | FilterOp::NotIn | FilterOp::ArrayContainsAny
        )
    }
}

/// One `field <op> value` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConstraint {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldConstraint {
    /// Build a predicate from one `query_constraints` entry.
    ///
    /// An object with exactly the keys `op` and `value` is an explicit
    /// predicate; any other value is matched by equality.
    pub fn parse(field: &str, predicate: &Value) -> Result<Self, String> {
        if field.trim().is_empty() {
            return Err("query_constraints: field names must not be empty".to_string());
        }

        let (op, value) = match predicate {
            Value::Object(map)
                if map.len() == 2 && map.contains_key("op") && map.contains_key("value") =>
            {
                let raw_op = map["op"]
                    .as_str()
                    .ok_or_else(|| format!("query_constraints.{}: op must be a string", field))?;
                let op = FilterOp::parse(raw_op).ok_or_else(|| {
                    format!("query_constraints.{}: unsupported op '{}'", field, raw_op)
                })?;
                (op, map["value"].clone())
            }
            other => (FilterOp::Equal, other.clone()),
        };

        if op.takes_list() && !value.is_array() {
            return Err(format!(
                "query_constraints.{}: value must be a list for this op",
                field
            ));
        }

        Ok(Self {
            field: field.to_string(),
            op,
            value,
        })
    }
}

/// Sort direction of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Sort order of a search; `-field` sorts descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        let (field, direction) = match raw.strip_prefix('-') {
            Some(field) => (field, SortDirection::Descending),
            None => (raw, SortDirection::Ascending),
        };
        if field.is_empty() {
            return Err("order_by must name a field".to_string());
        }
        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }
}

/// A validated search over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub doc_type: String,
    pub constraints: Vec<FieldConstraint>,
    pub limit: u32,
    pub order_by: Option<OrderBy>,
}

impl SearchQuery {
    /// Build a query from the free-form request fields.
    pub fn new(
        doc_type: impl Into<String>,
        query_constraints: &Fields,
        limit: u32,
        order_by: Option<&str>,
    ) -> Result<Self, String> {
        let constraints = query_constraints
            .iter()
            .map(|(field, predicate)| FieldConstraint::parse(field, predicate))
            .collect::<Result<Vec<_>, _>>()?;

        let order_by = order_by
            .filter(|s| !s.trim().is_empty())
            .map(OrderBy::parse)
            .transpose()?;

        Ok(Self {
            doc_type: doc_type.into(),
            constraints,
            limit,
            order_by,
        })
    }
}

// =============================================================================
// Storage
// =============================================================================

/// A file received for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Identifies one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocator {
    pub folder_name: String,
    pub file_name: String,
    pub app_name: Option<String>,
}

impl StorageLocator {
    /// Full object path inside the bucket.
    pub fn object_path(&self) -> String {
        object_path(
            self.app_name.as_deref(),
            &self.folder_name,
            &self.file_name,
        )
    }
}

/// Build `{app_name}/{folder}/{file}`, or `{folder}/{file}` without an app.
pub fn object_path(app_name: Option<&str>, folder: &str, file_name: &str) -> String {
    app_name
        .into_iter()
        .chain([folder, file_name])
        .map(|segment| segment.trim_matches('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Where an uploaded file ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    /// Full object path inside the bucket
    pub path: String,

    pub bucket: String,

    pub folder: String,

    pub file_name: String,

    pub app_name: Option<String>,

    pub content_type: Option<String>,

    /// Object size in bytes
    pub size: u64,

    /// Tokenized download URL, when the backend issued one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

// =============================================================================
// SDK Traits
// =============================================================================

/// Firestore and Storage operations performed on behalf of a caller.
///
/// Every method receives the caller's token; implementations must use it as
/// the credential for the backend call so that security rules apply to the
/// caller rather than to the gateway.
#[async_trait]
pub trait FirebaseSdk: Send + Sync {
    /// Fetch one document.
    async fn get_document(
        &self,
        token: &AuthToken,
        doc_type: &str,
        doc_id: &str,
    ) -> Result<Document, SdkError>;

    /// Create a document with a caller-chosen id.
    async fn create_document(
        &self,
        token: &AuthToken,
        doc_type: &str,
        doc_id: &str,
        data: &Fields,
    ) -> Result<Document, SdkError>;

    /// Merge `data` into an existing document.
    async fn update_document(
        &self,
        token: &AuthToken,
        doc_type: &str,
        doc_id: &str,
        data: &Fields,
    ) -> Result<Document, SdkError>;

    /// Delete an existing document.
    async fn delete_document(
        &self,
        token: &AuthToken,
        doc_type: &str,
        doc_id: &str,
    ) -> Result<(), SdkError>;

    /// Run a search over one collection.
    async fn search_documents(
        &self,
        token: &AuthToken,
        query: &SearchQuery,
    ) -> Result<Vec<Document>, SdkError>;

    /// Upload files into `folder` (namespaced by `app_name` when given).
    async fn upload_files(
        &self,
        token: &AuthToken,
        folder: &str,
        app_name: Option<&str>,
        files: Vec<UploadFile>,
    ) -> Result<Vec<StoredObject>, SdkError>;

    /// Resolve a download URL for a stored object.
    async fn get_download_url(
        &self,
        token: &AuthToken,
        locator: &StorageLocator,
    ) -> Result<String, SdkError>;

    /// Download the raw bytes of a stored object.
    async fn get_blob(&self, token: &AuthToken, locator: &StorageLocator)
        -> Result<Bytes, SdkError>;

    /// Release backend resources. Called once at process shutdown.
    async fn shutdown(&self) {}
}

/// Constructs the SDK client. Invoked at most once per successful init.
#[async_trait]
pub trait SdkFactory: Send + Sync + 'static {
    /// The client type this factory produces.
    type Sdk: FirebaseSdk + 'static;

    async fn connect(&self) -> Result<Self::Sdk, SdkError>;
}

// =============================================================================
// Tests
// =============================================================================
