//! Caller token extraction.
//!
//! The gateway does not authenticate anyone. It lifts the raw `Authorization`
//! header value off the request and forwards it to the SDK, which decides
//! what the caller may do.
//!
//! ```text
//! Authorization: eyJhbGciOiJSUzI1NiIs...
//! ```
//!
//! The header carries the token itself, with no `Bearer` scheme. Surrounding
//! whitespace is trimmed; nothing else is touched.

use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use crate::sdk::AuthToken;

use super::handlers::ErrorResponse;

// =============================================================================
// Types
// =============================================================================

/// Why a request carried no usable token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header at all
    MissingHeader,

    /// The header is present but blank
    EmptyToken,

    /// The header value is not visible ASCII
    InvalidHeader,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingHeader => write!(f, "Authorization header is required"),
            AuthError::EmptyToken => write!(f, "Authorization header must not be empty"),
            AuthError::InvalidHeader => {
                write!(f, "Authorization header contains invalid characters")
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = StatusCode::UNAUTHORIZED;
        let detail = self.to_string();

        // Missing tokens are routine for unauthenticated probes
        debug!(status = status.as_u16(), "Rejected request: {}", detail);

        (status, Json(ErrorResponse::new("Unauthorized", detail))).into_response()
    }
}

// =============================================================================
// Extraction
// =============================================================================

/// Pull the caller's token out of the request headers.
pub fn extract_token(headers: &HeaderMap) -> Result<AuthToken, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;
    let raw = value.to_str().map_err(|_| AuthError::InvalidHeader)?;

    let token = raw.trim();
    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }

    Ok(AuthToken::new(token))
}

// =============================================================================
// Tests
// =============================================================================
