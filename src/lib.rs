//! # FN7 Gateway
//!
//! A thin HTTP façade over Firestore and Firebase Storage.
//!
//! Clients call a small set of JSON endpoints with their own Firebase ID
//! token in the `Authorization` header. The gateway forwards each call to
//! Firebase using that token, so Firebase security rules decide what every
//! caller may read or write. The gateway itself holds no authorization logic.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - CLI/environment parsing and validated [`Settings`]
//! - [`sdk`] - The [`FirebaseSdk`] seam, its REST implementation and the
//!   lazily constructed [`SdkHolder`]
//! - [`server`] - Axum handlers, token extraction, request schemas and routes
//! - [`error`] - Configuration and SDK error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clap::Parser;
//! use fn7_gateway::{create_router, Config, RestSdkFactory, RouterConfig, SdkHolder, Settings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_config(&Config::parse())?;
//!     let holder = Arc::new(SdkHolder::new(RestSdkFactory::new(&settings)));
//!
//!     let router = create_router(holder.clone(), RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind(settings.bind_address()).await?;
//!     axum::serve(listener, router).await?;
//!
//!     holder.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod sdk;
pub mod server;

// Re-export commonly used types
pub use config::{Config, CredentialSource, LogLevel, ServiceAccount, Settings};
pub use error::{ConfigError, SdkError};
pub use sdk::{
    AuthToken, Document, Fields, FirebaseSdk, RestSdk, RestSdkFactory, SdkFactory, SdkHolder,
    SearchQuery, StorageLocator, StoredObject, UploadFile,
};
pub use server::{
    create_router, extract_token, health_handler, ApiError, AppState, AuthError, ErrorResponse,
    HealthResponse, RouterConfig,
};
