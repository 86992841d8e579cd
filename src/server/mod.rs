//! HTTP server layer for the gateway.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │              POST /api/test/...   GET /health                   │
//! │                                                                 │
//! │  ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌─────────────┐   │
//! │  │ handlers  │  │   auth    │  │  schemas  │  │   routes    │   │
//! │  │(requests) │  │ (token)   │  │(validate) │  │  (router)   │   │
//! │  └───────────┘  └───────────┘  └───────────┘  └─────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;
pub mod schemas;

pub use auth::{extract_token, AuthError};
pub use handlers::{
    blob_handler, content_type_for, create_document_handler, delete_document_handler,
    download_url_handler, get_document_handler, health_handler, search_documents_handler,
    update_document_handler, upload_handler, ApiError, AppState, ErrorResponse, SERVICE_NAME,
};
pub use routes::{create_router, RouterConfig};
pub use schemas::{
    CreateDocumentRequest, DocumentRequest, HealthResponse, SearchRequest, StorageObjectRequest,
    UpdateDocumentRequest, ValidatedJson, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT,
};
