//! Lazily constructed, process-wide SDK client handle.
//!
//! The holder provides:
//! - Lazy construction of the client on first use
//! - Singleflight construction: concurrent first callers wait for one connect
//! - Explicit init at startup and teardown at shutdown
//!
//! It is owned by the composition root and handed to handlers through axum
//! state, so there is no global mutable state.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::SdkError;

use super::{FirebaseSdk, SdkFactory};

/// Shared owner of the SDK client.
pub struct SdkHolder<F: SdkFactory> {
    factory: F,
    client: OnceCell<Arc<F::Sdk>>,
}

impl<F: SdkFactory> SdkHolder<F> {
    /// Create a holder; nothing is constructed until first use.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            client: OnceCell::new(),
        }
    }

    /// Return the shared client, constructing it on first call.
    ///
    /// Only one construction runs at a time; callers arriving while it is in
    /// progress wait for its result. A failed construction is not cached.
    pub async fn get_client(&self) -> Result<Arc<F::Sdk>, SdkError> {
        let client = self
            .client
            .get_or_try_init(|| async {
                info!("Initializing SDK client");
                let sdk = self.factory.connect().await.map_err(|e| {
                    warn!("SDK client initialization failed: {}", e);
                    e
                })?;
                info!("SDK client created successfully");
                Ok::<_, SdkError>(Arc::new(sdk))
            })
            .await?;

        Ok(Arc::clone(client))
    }

    /// Eagerly construct the client (startup).
    pub async fn init(&self) -> Result<(), SdkError> {
        self.get_client().await.map(|_| ())
    }

    /// Whether the client has been constructed.
    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }

    /// Tear down the client if it was ever constructed (shutdown).
    pub async fn shutdown(&self) {
        match self.client.get() {
            Some(client) => {
                info!("Shutting down SDK client");
                client.shutdown().await;
            }
            None => debug!("SDK client was never initialized; nothing to shut down"),
        }
    }

    /// Access the factory.
    pub fn factory(&self) -> &F {
        &self.factory
    }
}

// =============================================================================
// Tests
// =============================================================================
