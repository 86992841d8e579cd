//! Configuration management for the gateway.
//!
//! Configuration is read once at process start:
//! - Command-line arguments via clap
//! - Environment variables (the same names the service has always used)
//! - Sensible defaults for all optional settings
//!
//! [`Config`] is the raw, parsed input. [`Settings`] is the validated,
//! immutable product that the rest of the process consumes; building it
//! fails fast with a [`ConfigError`] on any misconfiguration.
//!
//! # Environment Variables
//!
//! - `FIREBASE_SERVICE_ACCOUNT_PATH` - Path to a service account JSON file
//! - `FIREBASE_SERVICE_ACCOUNT_JSON` - Inline service account JSON
//! - `FIREBASE_STORAGE_BUCKET` - Storage bucket (default: `{project_id}.appspot.com`)
//! - `HOST` - Server bind address (default: 0.0.0.0)
//! - `PORT` - Server port (default: 8000)
//! - `LOG_LEVEL` - DEBUG, INFO, WARNING, ERROR or CRITICAL (default: INFO)
//! - `CORS_ORIGINS` - Allowed CORS origins, comma-separated (default: any)
//! - `MAX_UPLOAD_BYTES` - Request body limit for uploads (default: 32 MiB)
//! - `FIRESTORE_BASE_URL` - Firestore REST root, for the emulator
//! - `FIREBASE_STORAGE_BASE_URL` - Storage REST root, for the emulator
//!
//! Exactly one of the two credential variables must be set.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::error::ConfigError;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

/// Default upload body limit (32 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Production Firestore REST root.
pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Production Firebase Storage REST root.
pub const DEFAULT_STORAGE_BASE_URL: &str = "https://firebasestorage.googleapis.com/v0";

// =============================================================================
// CLI Arguments
// =============================================================================

/// FN7 Gateway - forwards Firestore and Storage calls on behalf of the caller.
#[derive(Parser, Debug, Clone)]
#[command(name = "fn7-gateway")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    /// Maximum accepted request body size for uploads, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    // =========================================================================
    // Firebase Configuration
    // =========================================================================
    /// Path to the service account JSON file.
    #[arg(long, env = "FIREBASE_SERVICE_ACCOUNT_PATH")]
    pub service_account_path: Option<PathBuf>,

    /// Inline service account JSON.
    #[arg(long, env = "FIREBASE_SERVICE_ACCOUNT_JSON", hide_env_values = true)]
    pub service_account_json: Option<String>,

    /// Storage bucket name.
    ///
    /// Defaults to `{project_id}.appspot.com`.
    #[arg(long, env = "FIREBASE_STORAGE_BUCKET")]
    pub storage_bucket: Option<String>,

    /// Firestore REST root URL (point at the emulator for local development).
    #[arg(long, default_value = DEFAULT_FIRESTORE_BASE_URL, env = "FIRESTORE_BASE_URL")]
    pub firestore_base_url: String,

    /// Firebase Storage REST root URL (point at the emulator for local development).
    #[arg(long, default_value = DEFAULT_STORAGE_BASE_URL, env = "FIREBASE_STORAGE_BASE_URL")]
    pub storage_base_url: String,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Log level: DEBUG, INFO, WARNING, ERROR or CRITICAL.
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "LOG_LEVEL")]
    pub log_level: String,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

// =============================================================================
// Log Level
// =============================================================================

/// Log levels accepted in `LOG_LEVEL`.
///
/// Python-style names are accepted so existing deployments keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name, case-insensitively.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "TRACE" | "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" | "CRITICAL" | "FATAL" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(raw.to_string())),
        }
    }

    /// The tracing level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub fn filter_directive(&self) -> String {
        format!("fn7_gateway={0},tower_http={0}", self.as_str())
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Where the service account credentials came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Read from a file (stored as an absolute path)
    File(PathBuf),

    /// Passed inline through the environment
    Inline,
}

/// The parts of a Google service account key the gateway relies on.
///
/// Private key material is never deserialized.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    /// Key type; `service_account` for well-formed keys
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,

    /// Firebase / GCP project identifier
    pub project_id: String,

    /// Service account email, logged at startup
    #[serde(default)]
    pub client_email: Option<String>,
}

impl ServiceAccount {
    /// Parse and check a service account JSON document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let account: ServiceAccount = serde_json::from_str(raw)
            .map_err(|e| ConfigError::InvalidCredentials(e.to_string()))?;

        if account.project_id.trim().is_empty() {
            return Err(ConfigError::InvalidCredentials(
                "project_id is empty".to_string(),
            ));
        }

        if let Some(ref key_type) = account.key_type {
            if key_type != "service_account" {
                return Err(ConfigError::InvalidCredentials(format!(
                    "expected type \"service_account\", got \"{}\"",
                    key_type
                )));
            }
        }

        Ok(account)
    }

    /// Read and parse a service account file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::CredentialsFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Validated, immutable process settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub credential_source: CredentialSource,
    pub service_account: ServiceAccount,
    pub storage_bucket: String,
    pub host: String,
    pub port: u16,
    pub log_level: LogLevel,
    pub max_upload_bytes: usize,
    pub firestore_base_url: String,
    pub storage_base_url: String,
}

impl Settings {
    /// Validate a parsed [`Config`] and load the credentials it points at.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let log_level = LogLevel::parse(&config.log_level)?;

        let path = config
            .service_account_path
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty());
        let inline = config
            .service_account_json
            .as_deref()
            .filter(|s| !s.trim().is_empty());

        let (credential_source, service_account) = match (path, inline) {
            (None, None) => return Err(ConfigError::MissingCredentials),
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingCredentials),
            (Some(path), None) => {
                let path = absolute_path(path);
                let account = ServiceAccount::from_file(&path)?;
                (CredentialSource::File(path), account)
            }
            (None, Some(json)) => (CredentialSource::Inline, ServiceAccount::from_json(json)?),
        };

        let storage_bucket = config
            .storage_bucket
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.appspot.com", service_account.project_id));

        if config.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "MAX_UPLOAD_BYTES",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            credential_source,
            service_account,
            storage_bucket,
            host: config.host.clone(),
            port: config.port,
            log_level,
            max_upload_bytes: config.max_upload_bytes,
            firestore_base_url: parse_base_url("FIRESTORE_BASE_URL", &config.firestore_base_url)?,
            storage_base_url: parse_base_url(
                "FIREBASE_STORAGE_BASE_URL",
                &config.storage_base_url,
            )?,
        })
    }

    /// Firebase project identifier.
    pub fn project_id(&self) -> &str {
        &self.service_account.project_id
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Check that a backend root is an http(s) URL and strip any trailing slash.
fn parse_base_url(name: &'static str, raw: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidSetting {
        name,
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidSetting {
            name,
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(raw.trim_end_matches('/').to_string())
}

// =============================================================================
// Tests
// =============================================================================
