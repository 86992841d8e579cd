//! FN7 Gateway - HTTP façade over Firestore and Firebase Storage.
//!
//! This binary loads settings, constructs the SDK client and serves the API.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fn7_gateway::{
    config::{Config, CredentialSource, LogLevel, Settings},
    sdk::{RestSdkFactory, SdkHolder},
    server::{create_router, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    let settings = Settings::from_config(&config);

    // Config errors still need a subscriber to be reported
    let log_level = match &settings {
        Ok(settings) => settings.log_level,
        Err(_) => LogLevel::parse(&config.log_level).unwrap_or(LogLevel::Info),
    };
    init_logging(log_level);

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting fn7-gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Project: {}", settings.project_id());
    info!("  Storage bucket: {}", settings.storage_bucket);
    match &settings.credential_source {
        CredentialSource::File(path) => info!("  Credentials: {}", path.display()),
        CredentialSource::Inline => info!("  Credentials: inline JSON"),
    }
    if let Some(ref email) = settings.service_account.client_email {
        info!("  Service account: {}", email);
    }
    info!("  Firestore: {}", settings.firestore_base_url);
    info!("  Storage: {}", settings.storage_base_url);

    let holder = Arc::new(SdkHolder::new(RestSdkFactory::new(&settings)));
    if let Err(e) = holder.init().await {
        error!("Failed to initialize Firebase SDK: {}", e);
        return ExitCode::FAILURE;
    }

    let router = create_router(holder.clone(), build_router_config(&config, &settings));

    let addr = settings.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    holder.shutdown().await;

    if let Err(e) = served {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
///
/// `RUST_LOG` takes precedence over `LOG_LEVEL`.
fn init_logging(level: LogLevel) {
    let env_filter = level.filter_directive();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the parsed CLI and validated settings.
fn build_router_config(config: &Config, settings: &Settings) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_tracing(!config.no_tracing)
        .with_max_body_bytes(settings.max_upload_bytes);

    match config.cors_origins {
        Some(ref origins) => {
            router_config = router_config.with_cors_origins(origins.clone());
        }
        None => warn!("CORS: any origin allowed (set CORS_ORIGINS to restrict)"),
    }

    router_config
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
