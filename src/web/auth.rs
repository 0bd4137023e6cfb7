//! Shared-secret authorization.
//!
//! Every protected route goes through [`authorize`]. The two middleware
//! functions only differ in where they are willing to read the key from.

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::{HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::web::error::WebError;
use crate::web::state::AppState;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The server-held shared secret.
#[derive(Clone)]
pub struct ApiKey {
    digest: Arc<[u8; 32]>,
}

impl ApiKey {
    pub fn new(key: &str) -> Self {
        Self {
            digest: Arc::new(Sha256::digest(key.as_bytes()).into()),
        }
    }

    /// Compare a presented key without short-circuiting on the first
    /// mismatching byte.
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate: [u8; 32] = Sha256::digest(candidate.as_bytes()).into();
        self.digest
            .iter()
            .zip(candidate.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// `?key=` query parameter accepted by the file routes.
#[derive(Debug, Default, Deserialize)]
pub struct KeyQuery {
    pub key: Option<String>,
}

/// The `?key=` value of a request, if it parses.
///
/// A malformed query (e.g. a repeated `key`) counts as no key rather than an
/// error so a valid header key still authorizes the request.
pub fn query_key(uri: &Uri) -> Option<String> {
    Query::<KeyQuery>::try_from_uri(uri)
        .map(|Query(query)| query.key)
        .unwrap_or_default()
}

/// Check the presented secret against the configured one.
///
/// A missing server secret fails every request, whatever was presented.
pub fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    query_key: Option<&str>,
) -> Result<(), WebError> {
    let expected = state.api_key().ok_or(WebError::ApiKeyNotSet)?;

    let header_key = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    let accepted = [header_key, query_key]
        .into_iter()
        .flatten()
        .any(|candidate| expected.matches(candidate));

    if accepted {
        Ok(())
    } else {
        Err(WebError::Unauthorized)
    }
}

/// Middleware for write routes: header only.
pub async fn require_header_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, WebError> {
    if let Err(err) = authorize(&state, request.headers(), None) {
        tracing::warn!(path = %request.uri().path(), "Rejected unauthorized request");
        return Err(err);
    }
    Ok(next.run(request).await)
}

/// Middleware for read routes: header or `?key=` so links work in a browser.
pub async fn require_header_or_query_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let key = query_key(request.uri());

    if let Err(err) = authorize(&state, request.headers(), key.as_deref()) {
        tracing::warn!(path = %request.uri().path(), "Rejected unauthorized request");
        return Err(err);
    }
    Ok(next.run(request).await)
}
