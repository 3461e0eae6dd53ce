//! Conditional request handling.
//!
//! Runs inside the etag stage and relies on its output: when the response is
//! not tagged yet and the etag stage is active, the tag is computed here first.
//! Only safe reads are answered with 304; `If-Modified-Since` is compared by
//! exact value against `Last-Modified`.

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::Response,
};

use super::etag::{self, EtagPolicy};

/// Headers dropped from a 304 since it carries no body.
const ENTITY_HEADERS: [header::HeaderName; 3] = [
    header::CONTENT_LENGTH,
    header::CONTENT_TYPE,
    header::CONTENT_ENCODING,
];

/// Weak comparison of an `If-None-Match` list against a tag.
pub fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    let strip = |tag: &str| tag.trim().trim_start_matches("W/").to_string();
    let target = strip(etag);
    if_none_match
        .split(',')
        .any(|candidate| candidate.trim() == "*" || strip(candidate) == target)
}

#[derive(Debug, Clone, Default)]
struct Conditions {
    if_none_match: Option<String>,
    if_modified_since: Option<String>,
}

impl Conditions {
    fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            if_none_match: get(header::IF_NONE_MATCH),
            if_modified_since: get(header::IF_MODIFIED_SINCE),
        }
    }

    fn is_empty(&self) -> bool {
        self.if_none_match.is_none() && self.if_modified_since.is_none()
    }

    fn not_modified(&self, response: &HeaderMap) -> bool {
        let header_str = |name: header::HeaderName| response.get(name).and_then(|v| v.to_str().ok());

        // If-None-Match takes precedence over If-Modified-Since.
        if let Some(candidates) = &self.if_none_match {
            return header_str(header::ETAG)
                .map(|tag| etag_matches(candidates, tag))
                .unwrap_or(false);
        }
        match (&self.if_modified_since, header_str(header::LAST_MODIFIED)) {
            (Some(since), Some(modified)) => since.trim() == modified.trim(),
            _ => false,
        }
    }
}

fn not_modified_response(response: Response) -> Response {
    let (mut parts, _) = response.into_parts();
    parts.status = StatusCode::NOT_MODIFIED;
    for name in ENTITY_HEADERS {
        parts.headers.remove(name);
    }
    Response::from_parts(parts, Body::empty())
}

pub async fn conditional_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    if method != Method::GET && method != Method::HEAD {
        return next.run(req).await;
    }

    let conditions = Conditions::from_headers(req.headers());
    let tagging = req.extensions().get::<EtagPolicy>().is_some();

    let mut response = next.run(req).await;
    if conditions.is_empty() || !response.status().is_success() {
        return response;
    }

    if tagging && method == Method::GET {
        response = etag::attach(response).await;
    }

    if conditions.not_modified(response.headers()) {
        tracing::trace!("Conditional request satisfied, returning 304");
        not_modified_response(response)
    } else {
        response
    }
}
