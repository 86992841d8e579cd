use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning CLI/environment input into [`Settings`].
///
/// Every variant is fatal at startup.
///
/// [`Settings`]: crate::config::Settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither credential source was provided
    #[error(
        "Either FIREBASE_SERVICE_ACCOUNT_PATH or FIREBASE_SERVICE_ACCOUNT_JSON must be set"
    )]
    MissingCredentials,

    /// Both credential sources were provided
    #[error(
        "FIREBASE_SERVICE_ACCOUNT_PATH and FIREBASE_SERVICE_ACCOUNT_JSON are mutually exclusive"
    )]
    ConflictingCredentials,

    /// The service account file could not be read
    #[error("Cannot read service account file {path}: {source}")]
    CredentialsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The service account JSON is malformed or incomplete
    #[error("Invalid service account credentials: {0}")]
    InvalidCredentials(String),

    /// LOG_LEVEL does not name a known level
    #[error("Invalid log level '{0}' (expected DEBUG, INFO, WARNING, ERROR or CRITICAL)")]
    InvalidLogLevel(String),

    /// Any other invalid setting
    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

/// Errors returned from the SDK call boundary.
///
/// Handlers switch on the variant to pick the HTTP status; see
/// `server::handlers::ApiError`.
#[derive(Debug, Clone, Error)]
pub enum SdkError {
    /// The requested document or object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend's security rules denied the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The backend rejected the caller's token
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// The backend answered with an unexpected status
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// The request never produced a backend answer
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answer could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SdkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SdkError::Decode(err.to_string())
        } else {
            SdkError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(err: serde_json::Error) -> Self {
        SdkError::Decode(err.to_string())
    }
}
