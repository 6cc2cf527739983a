//! Admin authentication
//!
//! HTTP Basic credential whose password equals the configured API key. The
//! username is ignored. Missing or wrong credentials are rejected with a
//! bare 403. An empty configured key rejects every admin call.
//!
//! Used as the first extractor of every admin handler, so authentication
//! runs before list resolution.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::warn;

use crate::{ApiError, AppState};

/// Proof that the request carried a valid admin credential
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        if is_authorized(header, &state.api_key) {
            Ok(AdminAuth)
        } else {
            warn!(path = %parts.uri.path(), "Rejected admin request");
            Err(ApiError::Forbidden)
        }
    }
}

/// Check an `Authorization` header value against the API key
pub fn is_authorized(header: Option<&str>, api_key: &str) -> bool {
    if api_key.is_empty() {
        return false;
    }

    match header.and_then(basic_password) {
        Some(password) => constant_time_eq(password.as_bytes(), api_key.as_bytes()),
        None => false,
    }
}

/// Extract the password from a `Basic` credential
pub fn basic_password(header: &str) -> Option<String> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (_username, password) = credentials.split_once(':')?;
    Some(password.to_string())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
