//! Router configuration for the gateway.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Health check (public)
//! POST /api/test/get               - Fetch a document
//! POST /api/test/create            - Create a document
//! POST /api/test/update            - Update a document
//! POST /api/test/delete            - Delete a document
//! POST /api/test/search            - Search a collection
//! POST /api/test/storage/upload    - Upload files (multipart)
//! POST /api/test/storage/get-url   - Resolve a download URL
//! POST /api/test/storage/get-blob  - Download object bytes
//! ```
//!
//! Every `/api` route needs the caller's token in the `Authorization` header.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fn7_gateway::sdk::{RestSdkFactory, SdkHolder};
//! use fn7_gateway::server::{create_router, RouterConfig};
//!
//! let holder = Arc::new(SdkHolder::new(RestSdkFactory::new(&settings)));
//! let router = create_router(holder, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    blob_handler, create_document_handler, delete_document_handler, download_url_handler,
    get_document_handler, health_handler, search_documents_handler, update_document_handler,
    upload_handler, AppState,
};
use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::sdk::{SdkFactory, SdkHolder};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Request body limit in bytes
    pub max_body_bytes: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Tracing is enabled
    /// - Bodies are limited to 32 MiB
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
            max_body_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Set the request body limit.
    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// The holder is shared, not consumed, so the caller can still tear the
/// client down after the server stops.
pub fn create_router<F>(holder: Arc<SdkHolder<F>>, config: RouterConfig) -> Router
where
    F: SdkFactory,
{
    let app_state = AppState::new(holder);

    let api_routes = Router::new()
        .route("/get", post(get_document_handler::<F>))
        .route("/create", post(create_document_handler::<F>))
        .route("/update", post(update_document_handler::<F>))
        .route("/delete", post(delete_document_handler::<F>))
        .route("/search", post(search_documents_handler::<F>))
        .route("/storage/upload", post(upload_handler::<F>))
        .route("/storage/get-url", post(download_url_handler::<F>))
        .route("/storage/get-blob", post(blob_handler::<F>))
        .with_state(app_state);

    let router = Router::new()
        .route("/health", get(health_handler))
        .nest("/api/test", api_routes)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(build_cors_layer(&config));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
