//! ETag computation stage.
//!
//! The stage marks the request with [`EtagPolicy`] on the way in. Route
//! endpoints tag their rendered bodies directly (before HEAD bodies are
//! stripped); anything else still untagged is hashed here on the way out.

use axum::{
    body::{Body, HttpBody},
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};

use crate::errors::ApiError;

/// Largest body buffered to compute a tag.
pub const MAX_TAGGED_BODY: u64 = 1024 * 1024;

/// Marker inserted by the etag stage; its presence enables tagging.
#[derive(Debug, Clone, Copy, Default)]
pub struct EtagPolicy;

/// Strong entity tag for a body.
pub fn compute(body: &[u8]) -> HeaderValue {
    let digest = Sha256::digest(body);
    let tag = format!("\"{}\"", URL_SAFE_NO_PAD.encode(digest));
    // base64url plus quotes is always a valid header value
    HeaderValue::from_str(&tag).unwrap_or_else(|_| HeaderValue::from_static("\"\""))
}

/// Only successful reads are tagged.
pub fn is_taggable(method: &Method, status: StatusCode) -> bool {
    (method == Method::GET || method == Method::HEAD) && status.is_success()
}

/// Buffer a response body of known, bounded size and tag it.
///
/// Responses that already carry an ETag, or whose size is unknown or too
/// large, are returned untouched.
pub async fn attach(response: Response) -> Response {
    if response.headers().contains_key(header::ETAG) {
        return response;
    }
    match response.body().size_hint().exact() {
        Some(len) if len <= MAX_TAGGED_BODY => {}
        _ => return response,
    }

    let (mut parts, body) = response.into_parts();
    match axum::body::to_bytes(body, MAX_TAGGED_BODY as usize).await {
        Ok(bytes) => {
            parts.headers.insert(header::ETAG, compute(&bytes));
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to buffer response body for etag");
            ApiError::internal("Failed to read response body").into_response()
        }
    }
}

pub async fn etag(mut req: Request, next: Next) -> Response {
    req.extensions_mut().insert(EtagPolicy);
    let method = req.method().clone();

    let response = next.run(req).await;
    if method == Method::GET && is_taggable(&method, response.status()) {
        attach(response).await
    } else {
        response
    }
}
