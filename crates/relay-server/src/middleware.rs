//! Shared-secret authentication for the relay.

use crate::api_call::ApiError;
use crate::AppState;
use axum::{body::Body, http::Request, middleware::Next, response::Response};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Header carrying the shared secret.
pub const TOKEN_HEADER: &str = "X-Relay-Token";

/// Hashes a token value for comparison.
///
/// The configured secret is stored and compared as a SHA-256 digest: the
/// comparison then touches every byte of a fixed-width value regardless of
/// where the supplied token diverges, so response timing reveals nothing
/// about the secret's prefix.
pub fn token_digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

/// Middleware enforcing the `X-Relay-Token` check before any handler runs.
///
/// A missing or wrong token gets the same generic unauthorized response, and
/// no synthesis, transcoding, or filesystem work happens for the request —
/// an unauthenticated caller must not be able to use the relay as a TTS
/// oracle or probe its surface.
pub async fn auth_middleware(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or_else(|| ApiError::Internal("app state missing from request".to_string()))?;

    let provided = req
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    if token_digest(provided) != state.token_digest {
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(req).await)
}
